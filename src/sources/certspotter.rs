// src/sources/certspotter.rs
use crate::sources::{fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Issuance {
    id: String,
    #[serde(default)]
    dns_names: Vec<String>,
}

/// Cert Spotter v1 issuances, paginated with `after=<last id>`
#[derive(Debug, Clone)]
pub struct CertSpotterSource {
    name: String,
    base_url: String,
}

impl Default for CertSpotterSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CertSpotterSource {
    pub fn new() -> Self {
        Self {
            name: "certspotter".to_string(),
            base_url: "https://api.certspotter.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for CertSpotterSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let Some(api_key) = ctx.random_key(&self.name) else {
            debug!("[{}] skipped: no API key configured", self.name);
            return Ok(());
        };
        let authorization = format!("Bearer {}", api_key);
        let base = format!(
            "{}/v1/issuances?domain={}&include_subdomains=true&expand=dns_names",
            self.base_url, domain
        );

        let mut after: Option<String> = None;
        loop {
            let url = match &after {
                Some(id) => format!("{}&after={}", base, id),
                None => base.clone(),
            };
            let issuances: Vec<Issuance> =
                fetch_json(&self.name, &ctx.session, &url, &[("Authorization", authorization.as_str())]).await?;

            let Some(last) = issuances.last() else {
                break;
            };
            after = Some(last.id.clone());

            for issuance in &issuances {
                for name in &issuance.dns_names {
                    if ctx.extractor.in_scope(name.trim_start_matches("*.")) {
                        results.subdomain(name.as_str()).await?;
                    }
                }
            }
        }

        Ok(())
    }
}
