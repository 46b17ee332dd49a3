// src/sources/mod.rs
use crate::extractor::Extractor;
use crate::keys::pick_random;
use crate::session::{BodyLines, Session};
use crate::types::{FinderError, Keys, SourceResult};
use async_trait::async_trait;
use log::debug;
use reqwest::Response;
use std::sync::Arc;
use tokio::sync::mpsc;

mod alienvault;
mod anubis;
mod archiveis;
mod builtwith;
mod censys;
mod certificatedetails;
mod certspotter;
mod certspotterold;
mod chaos;
mod commoncrawl;
mod crtsh;
mod fullhunt;
mod github;
mod hackertarget;
mod intelx;
mod leakix;
mod rapiddns;
mod riddler;
mod securitytrails;
mod shodan;
mod subdomaincenter;
mod sublist3r;
mod threatcrowd;
mod threatminer;
mod virustotal;
mod wayback;

pub use alienvault::AlienVaultSource;
pub use anubis::AnubisSource;
pub use archiveis::ArchiveIsSource;
pub use builtwith::BuiltWithSource;
pub use censys::CensysSource;
pub use certificatedetails::CertificateDetailsSource;
pub use certspotter::CertSpotterSource;
pub use certspotterold::CertSpotterOldSource;
pub use chaos::ChaosSource;
pub use commoncrawl::CommonCrawlSource;
pub use crtsh::CrtShSource;
pub use fullhunt::FullHuntSource;
pub use github::GitHubSource;
pub use hackertarget::HackerTargetSource;
pub use intelx::IntelXSource;
pub use leakix::LeakIxSource;
pub use rapiddns::RapidDnsSource;
pub use riddler::RiddlerSource;
pub use securitytrails::SecurityTrailsSource;
pub use shodan::ShodanSource;
pub use subdomaincenter::SubdomainCenterSource;
pub use sublist3r::Sublist3rSource;
pub use threatcrowd::ThreatCrowdSource;
pub use threatminer::ThreatMinerSource;
pub use virustotal::VirusTotalSource;
pub use wayback::WaybackSource;

/// Capacity of each per-source result channel.
const RESULT_BUFFER: usize = 256;

/// Everything a source needs for one enumeration.
pub struct SourceContext {
    pub domain: String,
    pub keys: Keys,
    pub extractor: Extractor,
    pub session: Session,
}

impl SourceContext {
    pub fn new(domain: &str, keys: Keys, session: Session) -> Result<Self, FinderError> {
        let extractor = Extractor::new(domain)?;
        Ok(Self {
            domain: extractor.domain().to_string(),
            keys,
            extractor,
            session,
        })
    }

    pub fn keys_for(&self, source: &str) -> &[String] {
        self.keys.get(source).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn random_key(&self, source: &str) -> Option<String> {
        pick_random(self.keys_for(source))
    }
}

/// Write half of a source's result stream.
#[derive(Clone)]
pub struct ResultSender {
    source: String,
    tx: mpsc::Sender<SourceResult>,
}

impl ResultSender {
    pub fn new(source: &str, tx: mpsc::Sender<SourceResult>) -> Self {
        Self { source: source.to_string(), tx }
    }

    /// Fails with `Cancelled` once the reader has gone away.
    pub async fn subdomain(&self, value: impl Into<String>) -> Result<(), FinderError> {
        self.tx
            .send(SourceResult::Subdomain {
                value: value.into(),
                source: self.source.clone(),
            })
            .await
            .map_err(|_| FinderError::Cancelled)
    }

    pub async fn error(&self, error: impl std::fmt::Display) -> Result<(), FinderError> {
        self.tx
            .send(SourceResult::Error {
                source: self.source.clone(),
                error: error.to_string(),
            })
            .await
            .map_err(|_| FinderError::Cancelled)
    }

    /// Runs the scope extractor over `text` and emits every match.
    pub async fn matches(&self, extractor: &Extractor, text: &str) -> Result<usize, FinderError> {
        let found = extractor.find_all(text);
        for host in &found {
            self.subdomain(*host).await?;
        }
        Ok(found.len())
    }
}

#[async_trait]
pub trait Source: Send + Sync {
    fn name(&self) -> &str;

    fn clone_source(&self) -> Box<dyn Source>;

    /// Performs the enumeration, emitting findings as they arrive.
    ///
    /// Missing credentials are not an error: return `Ok(())` without
    /// emitting anything.
    async fn enumerate(
        &self,
        domain: &str,
        ctx: &SourceContext,
        results: &ResultSender,
    ) -> Result<(), FinderError>;

    /// Starts the enumeration in a detached task and returns its stream.
    ///
    /// The stream closes once the source is done. An error returned by
    /// [`enumerate`](Source::enumerate), or a panic inside it, becomes a
    /// single `Error` event.
    fn run(&self, ctx: Arc<SourceContext>) -> mpsc::Receiver<SourceResult> {
        let (tx, rx) = mpsc::channel(RESULT_BUFFER);
        let source = self.clone_source();
        let results = ResultSender::new(self.name(), tx);

        tokio::spawn(async move {
            let cancel = ctx.session.cancellation();
            let mut task = {
                let ctx = ctx.clone();
                let results = results.clone();
                tokio::spawn(async move {
                    let domain = ctx.domain.clone();
                    source.enumerate(&domain, &ctx, &results).await
                })
            };

            let outcome = tokio::select! {
                _ = cancel.cancelled() => None,
                joined = &mut task => Some(joined),
            };
            let Some(outcome) = outcome else {
                task.abort();
                return;
            };

            let message = match outcome {
                Ok(Ok(())) | Ok(Err(FinderError::Cancelled)) => return,
                Ok(Err(e)) => e.to_string(),
                Err(e) if e.is_panic() => format!("source task panicked: {}", e),
                Err(e) => e.to_string(),
            };

            debug!("[{}] {}", results.source, message);
            let _ = results.error(message).await;
        });

        rx
    }
}

/// Static description of a registered source.
pub struct SourceDescriptor {
    pub name: &'static str,
    pub needs_key: bool,
    factory: fn() -> Box<dyn Source>,
}

impl SourceDescriptor {
    pub fn create(&self) -> Box<dyn Source> {
        (self.factory)()
    }
}

fn make<S: Source + Default + 'static>() -> Box<dyn Source> {
    Box::new(S::default())
}

macro_rules! descriptor {
    ($name:literal, $needs_key:literal, $source:ty) => {
        SourceDescriptor { name: $name, needs_key: $needs_key, factory: make::<$source> }
    };
}

static REGISTRY: &[SourceDescriptor] = &[
    descriptor!("alienvault", true, AlienVaultSource),
    descriptor!("anubis", false, AnubisSource),
    descriptor!("archiveis", false, ArchiveIsSource),
    descriptor!("builtwith", true, BuiltWithSource),
    descriptor!("censys", true, CensysSource),
    descriptor!("certificatedetails", false, CertificateDetailsSource),
    descriptor!("certspotter", true, CertSpotterSource),
    descriptor!("certspotterold", false, CertSpotterOldSource),
    descriptor!("chaos", true, ChaosSource),
    descriptor!("commoncrawl", false, CommonCrawlSource),
    descriptor!("crtsh", false, CrtShSource),
    descriptor!("fullhunt", true, FullHuntSource),
    descriptor!("github", true, GitHubSource),
    descriptor!("hackertarget", false, HackerTargetSource),
    descriptor!("intelx", true, IntelXSource),
    descriptor!("leakix", false, LeakIxSource),
    descriptor!("rapiddns", false, RapidDnsSource),
    descriptor!("riddler", false, RiddlerSource),
    descriptor!("securitytrails", true, SecurityTrailsSource),
    descriptor!("shodan", true, ShodanSource),
    descriptor!("subdomaincenter", false, SubdomainCenterSource),
    descriptor!("sublist3r", false, Sublist3rSource),
    descriptor!("threatcrowd", false, ThreatCrowdSource),
    descriptor!("threatminer", false, ThreatMinerSource),
    descriptor!("virustotal", true, VirusTotalSource),
    descriptor!("wayback", false, WaybackSource),
];

pub fn registry() -> &'static [SourceDescriptor] {
    REGISTRY
}

pub fn all_source_names() -> Vec<&'static str> {
    REGISTRY.iter().map(|d| d.name).collect()
}

pub fn find_descriptor(name: &str) -> Option<&'static SourceDescriptor> {
    let name = name.trim().to_lowercase();
    REGISTRY.iter().find(|d| d.name == name)
}

/// Active source set: `use` (or the whole registry when empty) minus
/// `exclude`. Unknown names are dropped, duplicates collapsed.
pub fn select_sources(use_sources: &[String], exclude: &[String]) -> Vec<&'static SourceDescriptor> {
    let excluded: Vec<String> = exclude.iter().map(|n| n.trim().to_lowercase()).collect();

    let initial: Vec<&'static SourceDescriptor> = if use_sources.is_empty() {
        REGISTRY.iter().collect()
    } else {
        use_sources.iter().filter_map(|n| find_descriptor(n)).collect()
    };

    let mut selected: Vec<&'static SourceDescriptor> = Vec::new();
    for descriptor in initial {
        if excluded.iter().any(|n| n == descriptor.name) {
            continue;
        }
        if !selected.iter().any(|d| d.name == descriptor.name) {
            selected.push(descriptor);
        }
    }
    selected
}

/// Turns a non-2xx response into a source error carrying the body.
pub(crate) async fn ensure_success(
    source: &str,
    session: &Session,
    response: Response,
) -> Result<Response, FinderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = session.text(response).await.unwrap_or_default();
    Err(FinderError::SourceError {
        source_name: source.to_string(),
        message: format!("unexpected status {}: {}", status, body.chars().take(200).collect::<String>()),
    })
}

pub(crate) fn decode<T: serde::de::DeserializeOwned>(text: &str) -> Result<T, FinderError> {
    serde_json::from_str(text).map_err(|e| FinderError::JsonParseError(e.to_string(), text.chars().take(200).collect()))
}

/// GET, require 2xx, decode JSON.
pub(crate) async fn fetch_json<T: serde::de::DeserializeOwned>(
    source: &str,
    session: &Session,
    url: &str,
    headers: &[(&str, &str)],
) -> Result<T, FinderError> {
    let response = session.get(url, "", headers).await?;
    let response = ensure_success(source, session, response).await?;
    let text = session.text(response).await?;
    decode(&text)
}

/// GET, require 2xx, stream the body line by line.
pub(crate) async fn fetch_lines(source: &str, session: &Session, url: &str) -> Result<BodyLines, FinderError> {
    let response = session.simple_get(url).await?;
    let response = ensure_success(source, session, response).await?;
    Ok(session.lines(response))
}

/// GET, require 2xx, return the body.
pub(crate) async fn fetch_text(source: &str, session: &Session, url: &str) -> Result<String, FinderError> {
    let response = session.simple_get(url).await?;
    let response = ensure_success(source, session, response).await?;
    session.text(response).await
}


#[cfg(test)]
mod tests {
    use super::*;

    fn names(selected: &[&SourceDescriptor]) -> Vec<&'static str> {
        selected.iter().map(|d| d.name).collect()
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_find_descriptor() {
        let source = find_descriptor(" VirusTotal ").map(|d| d.create());
        assert_eq!(source.map(|s| s.name().to_string()), Some("virustotal".to_string()));

        assert!(find_descriptor("invalid").is_none());
    }

    #[test]
    fn test_registry_names_match_sources() {
        for descriptor in registry() {
            assert_eq!(descriptor.create().name(), descriptor.name);
        }
    }

    #[test]
    fn test_registry_names_are_unique_and_lowercase() {
        let mut names = all_source_names();
        assert!(names.iter().all(|n| *n == n.to_lowercase()));
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_needs_key_flags() {
        let needs_key = |name: &str| find_descriptor(name).map(|d| d.needs_key);
        assert_eq!(needs_key("virustotal"), Some(true));
        assert_eq!(needs_key("GitHub"), Some(true));
        assert_eq!(needs_key("crtsh"), Some(false));
        assert_eq!(needs_key("invalid"), None);
    }

    #[test]
    fn test_empty_use_selects_everything() {
        assert_eq!(select_sources(&[], &[]).len(), registry().len());
    }

    #[test]
    fn test_exclusion_wins_over_inclusion() {
        let selected = select_sources(&strings(&["crtsh", "github"]), &strings(&["github"]));
        assert_eq!(names(&selected), vec!["crtsh"]);
    }

    #[test]
    fn test_unknown_and_duplicate_names() {
        let selected = select_sources(&strings(&["CRTSH", "nope", "crtsh", "wayback"]), &[]);
        assert_eq!(names(&selected), vec!["crtsh", "wayback"]);
    }

    #[test]
    fn test_exclude_from_full_registry() {
        let selected = select_sources(&[], &strings(&["wayback"]));
        assert_eq!(selected.len(), registry().len() - 1);
        assert!(!names(&selected).contains(&"wayback"));
    }
}
