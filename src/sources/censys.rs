// src/sources/censys.rs
use crate::sources::{decode, ensure_success, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use async_trait::async_trait;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

const MAX_PAGES: u32 = 10;

const NAMES_FIELD: &str = "parsed.names";
const SAN_FIELD: &str = "parsed.extensions.subject_alt_name.dns_names";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    page: u32,
    fields: [&'static str; 2],
    flatten: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CertificateFields>,
    metadata: Option<SearchMetadata>,
}

#[derive(Debug, Deserialize)]
struct CertificateFields {
    #[serde(rename = "parsed.names", default)]
    names: Vec<String>,
    #[serde(rename = "parsed.extensions.subject_alt_name.dns_names", default)]
    dns_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SearchMetadata {
    #[serde(default)]
    pages: u32,
}

/// Censys certificate search; credentials are `api_id:secret`
#[derive(Debug, Clone)]
pub struct CensysSource {
    name: String,
    base_url: String,
}

impl Default for CensysSource {
    fn default() -> Self {
        Self::new()
    }
}

impl CensysSource {
    pub fn new() -> Self {
        Self {
            name: "censys".to_string(),
            base_url: "https://search.censys.io".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for CensysSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn clone_source(&self) -> Box<dyn Source> {
        Box::new(self.clone())
    }

    async fn enumerate(&self, domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
        let Some(credential) = ctx.random_key(&self.name) else {
            debug!("[{}] skipped: no API key configured", self.name);
            return Ok(());
        };
        let Some((user, pass)) = credential.split_once(':') else {
            warn!("[{}] skipped: credential is not user:pass", self.name);
            return Ok(());
        };

        let url = format!("{}/api/v1/search/certificates", self.base_url);
        let mut page = 1;

        loop {
            let body = SearchRequest {
                query: domain,
                page,
                fields: [NAMES_FIELD, SAN_FIELD],
                flatten: true,
            };
            let request = ctx.session.client
                .post(&url)
                .basic_auth(user, Some(pass))
                .json(&body);

            let response = ctx.session.send(request).await?;
            let response = ensure_success(&self.name, &ctx.session, response).await?;
            let text = ctx.session.text(response).await?;
            let search: SearchResponse = decode(&text)?;

            for certificate in &search.results {
                for name in certificate.names.iter().chain(&certificate.dns_names) {
                    results.subdomain(name.as_str()).await?;
                }
            }

            let pages = search.metadata.map(|m| m.pages).unwrap_or(0);
            if page >= pages || page >= MAX_PAGES {
                break;
            }
            page += 1;
        }

        Ok(())
    }
}
