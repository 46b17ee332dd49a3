// src/sources/anubis.rs
use crate::sources::{ensure_success, decode, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

/// Anubis subdomain database at jldc.me
#[derive(Debug, Clone)]
pub struct AnubisSource {
    name: String,
    base_url: String,
}

impl Default for AnubisSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AnubisSource {
    pub fn new() -> Self {
        Self {
            name: "anubis".to_string(),
            base_url: "https://jldc.me".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for AnubisSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/anubis/subdomains/{}", self.base_url, domain);
        let response = ctx.session.simple_get(&url).await?;

        // unknown domains come back as 300 with an empty body
        if response.status().as_u16() == 300 {
            return Ok(());
        }

        let response = ensure_success(&self.name, &ctx.session, response).await?;
        let text = ctx.session.text(response).await?;
        let subdomains: Vec<String> = decode(&text)?;

        for subdomain in subdomains {
            results.subdomain(subdomain).await?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::testing::{collect, context, values};

    #[tokio::test]
    async fn test_plain_list() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/anubis/subdomains/example.com")
            .with_body(r#"["www.example.com","mx.example.com"]"#)
            .create_async()
            .await;

        let source = AnubisSource::new().with_base_url(&server.url());
        let events = collect(&source, context("example.com", &[])).await;

        assert_eq!(values(&events), vec!["www.example.com", "mx.example.com"]);
    }
}
