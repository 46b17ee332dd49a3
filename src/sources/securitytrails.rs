// src/sources/securitytrails.rs
use crate::sources::{decode, ensure_success, fetch_json, ResultSender, Source, SourceContext};
use crate::types::FinderError;
use crate::utils::qualify;
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::json;

#[derive(Debug, Deserialize)]
struct ScrollResponse {
    #[serde(default)]
    records: Vec<ScrollRecord>,
    #[serde(default)]
    meta: ScrollMeta,
}

#[derive(Debug, Deserialize)]
struct ScrollRecord {
    hostname: String,
}

#[derive(Debug, Default, Deserialize)]
struct ScrollMeta {
    #[serde(default)]
    scroll_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SubdomainsResponse {
    #[serde(default)]
    subdomains: Vec<String>,
}

/// SecurityTrails scroll API, falling back to the plain subdomain list
#[derive(Debug, Clone)]
pub struct SecurityTrailsSource {
    name: String,
    base_url: String,
}

impl Default for SecurityTrailsSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SecurityTrailsSource {
    pub fn new() -> Self {
        Self {
            name: "securitytrails".to_string(),
            base_url: "https://api.securitytrails.com".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn fallback(
        &self,
        domain: &str,
        api_key: &str,
        ctx: &SourceContext,
        results: &ResultSender,
    ) -> Result<(), FinderError> {
        let url = format!("{}/v1/domain/{}/subdomains?children_only=false", self.base_url, domain);
        let response: SubdomainsResponse =
            fetch_json(&self.name, &ctx.session, &url, &[("APIKEY", api_key)]).await?;

        for subdomain in &response.subdomains {
            results.subdomain(qualify(subdomain, domain)).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl Source for SecurityTrailsSource {
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

        let list_url = format!("{}/v1/domains/list?include_ips=false&scroll=true", self.base_url);
        let body = json!({ "query": format!("apex_domain='{}'", domain) }).to_string();
        let mut response = ctx.session
            .post(&list_url, "", &[("APIKEY", api_key.as_str()), ("Content-Type", "application/json")], body)
            .await?;

        if response.status().as_u16() == 403 {
            debug!("[{}] scroll API forbidden, using subdomain list", self.name);
            return self.fallback(domain, &api_key, ctx, results).await;
        }

        loop {
            let response_ok = ensure_success(&self.name, &ctx.session, response).await?;
            let text = ctx.session.text(response_ok).await?;
            let page: ScrollResponse = decode(&text)?;

            if page.records.is_empty() {
                break;
            }
            for record in &page.records {
                results.subdomain(record.hostname.as_str()).await?;
            }

            let scroll_id = match page.meta.scroll_id {
                Some(id) if !id.is_empty() => id,
                _ => break,
            };

            let scroll_url = format!("{}/v1/scroll/{}", self.base_url, scroll_id);
            response = ctx.session.get(&scroll_url, "", &[("APIKEY", api_key.as_str())]).await?;
        }

        Ok(())
    }
}
