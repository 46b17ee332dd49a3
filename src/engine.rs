use crate::session::Session;
use crate::sources::{select_sources, Source, SourceContext};
use crate::types::{FinderError, FinderOptions, Keys, SourceResult};
use crate::utils::normalize_subdomain;
use dashmap::DashSet;
use futures::future::join_all;
use log::{debug, info};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Capacity of the merged output stream.
const OUTPUT_BUFFER: usize = 1024;

/// Source tag used for failures raised by the finder itself.
const FINDER_SOURCE: &str = "finder";

/// Fans a domain out to every selected source and merges their streams.
pub struct Finder {
    session: Session,
    keys: Keys,
    sources: Vec<Box<dyn Source>>,
}

impl Finder {
    pub fn new(options: FinderOptions) -> Result<Self, FinderError> {
        let session = Session::new(&options.session)?;
        let sources = select_sources(&options.sources_to_use, &options.sources_to_exclude)
            .into_iter()
            .map(|descriptor| descriptor.create())
            .collect();

        Ok(Self::from_sources(sources, options.keys, session))
    }

    /// Builds a finder over an explicit source list.
    pub fn from_sources(sources: Vec<Box<dyn Source>>, keys: Keys, session: Session) -> Self {
        let keys = keys
            .into_iter()
            .map(|(name, pool)| (name.to_lowercase(), pool))
            .collect();

        Self { session, keys, sources }
    }

    pub fn source_names(&self) -> Vec<String> {
        self.sources.iter().map(|s| s.name().to_string()).collect()
    }

    /// Cancels every enumeration started by this finder.
    pub fn cancel(&self) {
        self.session.cancel();
    }

    /// Starts enumerating `domain` and returns the merged stream.
    ///
    /// Subdomains are lowercased, stripped of a leading `*.`, dropped when
    /// out of scope and emitted at most once. Errors pass through as-is.
    /// The stream closes once every source is done; dropping the receiver
    /// cancels the sources still running. Must be called inside a tokio
    /// runtime.
    pub fn find(&self, domain: &str) -> mpsc::Receiver<SourceResult> {
        let (tx, rx) = mpsc::channel(OUTPUT_BUFFER);
        let session = self.session.child();

        let ctx = match SourceContext::new(domain, self.keys.clone(), session.clone()) {
            Ok(ctx) => Arc::new(ctx),
            Err(e) => {
                let _ = tx.try_send(SourceResult::Error {
                    source: FINDER_SOURCE.to_string(),
                    error: e.to_string(),
                });
                return rx;
            }
        };

        let apex = ctx.domain.clone();
        let seen: Arc<DashSet<String>> = Arc::new(DashSet::new());
        let started = Instant::now();

        let forwarders: Vec<_> = self
            .sources
            .iter()
            .map(|source| {
                let name = source.name().to_string();
                let mut stream = source.run(ctx.clone());
                let tx = tx.clone();
                let seen = seen.clone();
                let apex = apex.clone();
                let session = session.clone();

                tokio::spawn(async move {
                    let mut found = 0usize;
                    while let Some(event) = stream.recv().await {
                        let event = match event {
                            SourceResult::Subdomain { value, source } => {
                                let Some(host) = normalize_subdomain(&value, &apex) else {
                                    continue;
                                };
                                if !seen.insert(host.clone()) {
                                    continue;
                                }
                                found += 1;
                                SourceResult::Subdomain { value: host, source }
                            }
                            error => error,
                        };

                        if tx.send(event).await.is_err() {
                            session.cancel();
                            break;
                        }
                    }
                    debug!("[{}] done: {} new subdomains in {:?}", name, found, started.elapsed());
                })
            })
            .collect();

        // The coordinator owns the last sender: the stream closes when it returns.
        tokio::spawn(async move {
            tokio::select! {
                _ = join_all(forwarders) => {
                    info!("{}: {} unique subdomains in {:?}", apex, seen.len(), started.elapsed());
                }
                _ = tx.closed() => {
                    debug!("{}: output dropped, cancelling sources", apex);
                    session.cancel();
                }
            }
        });

        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::ResultSender;
    use crate::types::SessionConfig;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Clone)]
    struct StaticSource {
        name: &'static str,
        values: Vec<&'static str>,
    }

    #[async_trait]
    impl Source for StaticSource {
        fn name(&self) -> &str {
            self.name
        }

        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(self.clone())
        }

        async fn enumerate(&self, _domain: &str, _ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
            for value in &self.values {
                results.subdomain(*value).await?;
            }
            Ok(())
        }
    }

    #[derive(Clone)]
    struct PanickingSource;

    #[async_trait]
    impl Source for PanickingSource {
        fn name(&self) -> &str {
            "panicking"
        }

        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(self.clone())
        }

        async fn enumerate(&self, _domain: &str, _ctx: &SourceContext, _results: &ResultSender) -> Result<(), FinderError> {
            panic!("adapter bug");
        }
    }

    #[derive(Clone)]
    struct FailingSource;

    #[async_trait]
    impl Source for FailingSource {
        fn name(&self) -> &str {
            "failing"
        }

        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(self.clone())
        }

        async fn enumerate(&self, _domain: &str, _ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
            results.error("quota exceeded").await?;
            results.error("quota exceeded").await?;
            Err(FinderError::RateLimitError("failing".to_string()))
        }
    }

    /// Emits one value, then waits on the session before flagging completion.
    #[derive(Clone)]
    struct SlowSource {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Source for SlowSource {
        fn name(&self) -> &str {
            "slow"
        }

        fn clone_source(&self) -> Box<dyn Source> {
            Box::new(self.clone())
        }

        async fn enumerate(&self, _domain: &str, ctx: &SourceContext, results: &ResultSender) -> Result<(), FinderError> {
            results.subdomain("early.example.com").await?;
            ctx.session.sleep(Duration::from_millis(500)).await?;
            self.finished.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn finder(sources: Vec<Box<dyn Source>>) -> Finder {
        let session = Session::new(&SessionConfig::default()).unwrap();
        Finder::from_sources(sources, Keys::new(), session)
    }

    fn stub(name: &'static str, values: &[&'static str]) -> Box<dyn Source> {
        Box::new(StaticSource { name, values: values.to_vec() })
    }

    async fn drain(mut rx: mpsc::Receiver<SourceResult>) -> Vec<SourceResult> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    fn subdomains(events: &[SourceResult]) -> Vec<(String, String)> {
        events
            .iter()
            .filter_map(|e| match e {
                SourceResult::Subdomain { value, source } => Some((value.clone(), source.clone())),
                SourceResult::Error { .. } => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_normalises_scopes_and_dedups() {
        let raw = ["a.example.com", "A.Example.com", "*.b.example.com", "b.example.com", "x.other.com"];
        let finder = finder(vec![stub("one", &raw), stub("two", &raw), stub("three", &raw)]);

        let events = drain(finder.find("example.com")).await;
        let mut values: Vec<String> = subdomains(&events).into_iter().map(|(v, _)| v).collect();
        values.sort();

        assert_eq!(values, vec!["a.example.com", "b.example.com"]);
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn test_first_source_wins() {
        let finder = finder(vec![stub("one", &["c.example.com"]), stub("two", &["c.example.com"])]);

        let events = drain(finder.find("example.com")).await;
        let found = subdomains(&events);

        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, "c.example.com");
        assert!(found[0].1 == "one" || found[0].1 == "two");
    }

    #[tokio::test]
    async fn test_emitted_values_are_clean() {
        let finder = finder(vec![stub(
            "noisy",
            &["WWW.EXAMPLE.COM.", "example.com", "bad host.example.com", "notexample.com", "_dmarc.example.com"],
        )]);

        let events = drain(finder.find("Example.COM")).await;
        let values: HashSet<String> = subdomains(&events).into_iter().map(|(v, _)| v).collect();

        assert_eq!(
            values,
            HashSet::from(["www.example.com".to_string(), "example.com".to_string(), "_dmarc.example.com".to_string()])
        );
        for value in &values {
            assert!(value == "example.com" || value.ends_with(".example.com"));
            assert!(value
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')));
        }
    }

    #[tokio::test]
    async fn test_panicking_source_is_isolated() {
        let finder = finder(vec![Box::new(PanickingSource), stub("healthy", &["ok.example.com"])]);

        let events = drain(finder.find("example.com")).await;

        assert_eq!(subdomains(&events), vec![("ok.example.com".to_string(), "healthy".to_string())]);
        let errors: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                SourceResult::Error { source, .. } => Some(source.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(errors, vec!["panicking"]);
    }

    #[tokio::test]
    async fn test_errors_are_not_deduplicated() {
        let finder = finder(vec![Box::new(FailingSource)]);

        let events = drain(finder.find("example.com")).await;

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| matches!(e, SourceResult::Error { source, .. } if source == "failing")));
    }

    #[tokio::test]
    async fn test_no_sources_closes_immediately() {
        let finder = finder(Vec::new());
        assert!(drain(finder.find("example.com")).await.is_empty());
    }

    #[tokio::test]
    async fn test_dropping_one_stream_does_not_cancel_the_finder() {
        let finder = finder(vec![stub("one", &["a.example.com", "b.example.com"])]);

        drop(finder.find("example.com"));
        let events = drain(finder.find("example.com")).await;

        assert_eq!(subdomains(&events).len(), 2);
    }

    #[tokio::test]
    async fn test_dropping_the_stream_cancels_running_sources() {
        let finished = Arc::new(AtomicBool::new(false));
        let finder = finder(vec![Box::new(SlowSource { finished: finished.clone() })]);

        let mut rx = finder.find("example.com");
        assert!(matches!(rx.recv().await, Some(SourceResult::Subdomain { .. })));
        drop(rx);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_selection_from_options() {
        let options = FinderOptions {
            sources_to_use: vec!["crtsh".to_string(), "github".to_string()],
            sources_to_exclude: vec!["github".to_string()],
            ..Default::default()
        };

        let finder = Finder::new(options).unwrap();
        assert_eq!(finder.source_names(), vec!["crtsh"]);
    }

    #[test]
    fn test_keys_are_lowercased() {
        let session = Session::new(&SessionConfig::default()).unwrap();
        let keys = Keys::from([("GitHub".to_string(), vec!["t".to_string()])]);

        let finder = Finder::from_sources(Vec::new(), keys, session);
        assert_eq!(finder.keys.get("github"), Some(&vec!["t".to_string()]));
    }
}
