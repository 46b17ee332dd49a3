// src/sources/riddler.rs
use crate::sources::{fetch_lines, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;

/// Riddler.io data table export
#[derive(Debug, Clone)]
pub struct RiddlerSource {
    name: String,
    base_url: String,
}

impl Default for RiddlerSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RiddlerSource {
    pub fn new() -> Self {
        Self {
            name: "riddler".to_string(),
            base_url: "https://riddler.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for RiddlerSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let url = format!("{}/search?q=pld:{}&view_type=data_table", self.base_url, domain);
        let mut lines = fetch_lines(&self.name, &ctx.session, &url).await?;

        while let Some(line) = lines.next_line().await? {
            results.matches(&ctx.extractor, &line).await?;
        }

        Ok(())
    }
}
