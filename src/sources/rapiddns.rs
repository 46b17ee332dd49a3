// src/sources/rapiddns.rs
use crate::sources::{fetch_lines, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

/// RapidDNS HTML listing
#[derive(Debug, Clone)]
pub struct RapidDnsSource {
    name: String,
    base_url: String,
}

impl Default for RapidDnsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RapidDnsSource {
    pub fn new() -> Self {
        Self {
            name: "rapiddns".to_string(),
            base_url: "https://rapiddns.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for RapidDnsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/subdomain/{}?full=1", self.base_url, domain);
        let mut lines = fetch_lines(&self.name, &ctx.session, &url).await?;

        while let Some(line) = lines.next_line().await? {
            results.matches(&ctx.extractor, &line).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, values};
    use mockito::Matcher;

    #[tokio::test]
    async fn test_scrapes_table_cells() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/subdomain/example.com")
            .match_query(Matcher::UrlEncoded("full".into(), "1".into()))
            .with_body("<tr><td>www.example.com</td><td>1.2.3.4</td></tr>\n<tr><td><a href=\"//Mail.Example.com\">x</a></td></tr>")
            .create_async()
            .await;

        let source = RapidDnsSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "Mail.Example.com"]);
    }
}
