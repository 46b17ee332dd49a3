// src/session.rs
use crate::types::{FinderError, SessionConfig};
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, CONTENT_TYPE, COOKIE};
use reqwest::{Client, RequestBuilder, Response};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

/// HTTP facade shared by every source.
///
/// Cloning is cheap: the connection pool lives behind the `reqwest::Client`.
/// Every send races the session's cancellation token so a cancelled
/// enumeration abandons its pending I/O.
#[derive(Clone)]
pub struct Session {
    pub client: Client,
    cancel: CancellationToken,
}

impl Session {
    pub fn new(config: &SessionConfig) -> Result<Self, FinderError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        headers.insert(CONNECTION, HeaderValue::from_static("close"));

        let mut client_builder = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(proxy_url) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy_url)
                .map_err(|e| FinderError::ConfigError(format!("Invalid proxy URL: {}", e)))?;
            client_builder = client_builder.proxy(proxy);
        }

        let client = client_builder.build()
            .map_err(|e| FinderError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Session {
            client,
            cancel: CancellationToken::new(),
        })
    }

    /// Same connection pool, with a cancellation scope nested in this one.
    pub fn child(&self) -> Session {
        Session {
            client: self.client.clone(),
            cancel: self.cancel.child_token(),
        }
    }

    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Sends a prepared request. Non-2xx responses are returned, only
    /// transport failures and cancellation are errors.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response, FinderError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FinderError::Cancelled),
            response = request.send() => response.map_err(|e| FinderError::NetworkError(e.to_string())),
        }
    }

    pub async fn get(
        &self,
        url: &str,
        cookies: &str,
        headers: &[(&str, &str)],
    ) -> Result<Response, FinderError> {
        let request = with_headers(self.client.get(url), cookies, headers);
        self.send(request).await
    }

    pub async fn simple_get(&self, url: &str) -> Result<Response, FinderError> {
        self.get(url, "", &[]).await
    }

    pub async fn post(
        &self,
        url: &str,
        cookies: &str,
        headers: &[(&str, &str)],
        body: impl Into<reqwest::Body>,
    ) -> Result<Response, FinderError> {
        let request = with_headers(self.client.post(url), cookies, headers).body(body);
        self.send(request).await
    }

    pub async fn simple_post(
        &self,
        url: &str,
        content_type: &str,
        body: impl Into<reqwest::Body>,
    ) -> Result<Response, FinderError> {
        self.post(url, "", &[(CONTENT_TYPE.as_str(), content_type)], body).await
    }

    /// Reads the whole body, abandoning it on cancellation.
    pub async fn text(&self, response: Response) -> Result<String, FinderError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FinderError::Cancelled),
            text = response.text() => text.map_err(|e| FinderError::NetworkError(e.to_string())),
        }
    }

    /// Reads the body line by line as it arrives instead of buffering it.
    pub fn lines(&self, response: Response) -> BodyLines {
        let stream = Box::pin(
            response
                .bytes_stream()
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e)),
        );
        let reader: Box<dyn AsyncBufRead + Send + Unpin> = Box::new(StreamReader::new(stream));

        BodyLines {
            lines: reader.lines(),
            cancel: self.cancel.clone(),
        }
    }

    pub async fn sleep(&self, duration: Duration) -> Result<(), FinderError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FinderError::Cancelled),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

/// Line reader over a streamed response body.
pub struct BodyLines {
    lines: Lines<Box<dyn AsyncBufRead + Send + Unpin>>,
    cancel: CancellationToken,
}

impl BodyLines {
    /// `None` at the end of the body.
    pub async fn next_line(&mut self) -> Result<Option<String>, FinderError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(FinderError::Cancelled),
            line = self.lines.next_line() => line.map_err(|e| FinderError::NetworkError(e.to_string())),
        }
    }
}

fn with_headers(mut request: RequestBuilder, cookies: &str, headers: &[(&str, &str)]) -> RequestBuilder {
    if !cookies.is_empty() {
        request = request.header(COOKIE, cookies);
    }
    for (name, value) in headers {
        request = request.header(*name, *value);
    }
    request
}
