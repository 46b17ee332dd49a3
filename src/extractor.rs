// src/extractor.rs
use crate::types::FinderError;
use regex::{Regex, RegexBuilder};

/// Finds hostnames inside arbitrary text that belong to one apex domain.
///
/// A candidate is a run of `[A-Za-z0-9*_.-]` followed by `.` and the apex,
/// matched case-insensitively. The compiled matcher is read-only and can be
/// shared freely between tasks.
#[derive(Debug, Clone)]
pub struct Extractor {
    domain: String,
    regex: Regex,
}

impl Extractor {
    pub fn new(domain: &str) -> Result<Self, FinderError> {
        let domain = domain.trim().to_ascii_lowercase();
        if !domain.is_ascii() {
            return Err(FinderError::InvalidDomain(format!("{} (use the punycode form)", domain)));
        }
        let pattern = format!(r"[a-zA-Z0-9\*_.-]+\.{}", regex::escape(&domain));

        // ASCII-only folding: Unicode rules would let U+212A match `k`
        let regex = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .unicode(false)
            .build()
            .map_err(|e| FinderError::ParseError(format!("Regex error: {}", e)))?;

        Ok(Self { domain, regex })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Every non-overlapping match in `text`, in order of appearance.
    pub fn find_all<'t>(&self, text: &'t str) -> Vec<&'t str> {
        self.regex.find_iter(text).map(|m| m.as_str()).collect()
    }

    /// Scope predicate: equal to the apex or ending in `.apex`, ignoring case.
    pub fn in_scope(&self, host: &str) -> bool {
        let host = host.to_ascii_lowercase();
        host == self.domain || host.ends_with(&format!(".{}", self.domain))
    }
}
