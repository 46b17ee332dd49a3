// src/sources/archiveis.rs
use crate::sources::{fetch_text, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use regex::Regex;

/// Upper bound on "next page" links followed.
const MAX_PAGES: usize = 50;

const NEXT_PAGE_PATTERN: &str = r#"<a id="next" style="[^"]*" href="([^"]+)">&rarr;</a>"#;

/// archive.is snapshot listing, scraped page by page
#[derive(Debug, Clone)]
pub struct ArchiveIsSource {
    name: String,
    base_url: String,
}

impl Default for ArchiveIsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveIsSource {
    pub fn new() -> Self {
        Self {
            name: "archiveis".to_string(),
            base_url: "http://archive.is".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for ArchiveIsSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let next_page = Regex::new(NEXT_PAGE_PATTERN)
            .map_err(|e| FinderError::ParseError(format!("Regex error: {}", e)))?;
        let mut url = format!("{}/*.{}", self.base_url, domain);

        for _ in 0..MAX_PAGES {
            let page = fetch_text(&self.name, &ctx.session, &url).await?;
            let decoded = urlencoding::decode(&page)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| page.clone());

            for line in decoded.lines() {
                results.matches(&ctx.extractor, line).await?;
            }

            match next_page.captures(&page).and_then(|c| c.get(1)) {
                Some(next) => url = next.as_str().to_string(),
                None => break,
            }
        }

        Ok(())
    }
}
