// src/utils.rs
use crate::types::FinderError;
use url::Url;

/// Extract the host from a URL
pub fn extract_domain_from_url(url_str: &str) -> Result<String, FinderError> {
    let url = Url::parse(url_str)
        .map_err(|e| FinderError::InvalidDomain(format!("Invalid URL: {}", e)))?;

    url.host_str()
        .ok_or_else(|| FinderError::InvalidDomain("No host in URL".to_string()))
        .map(|s| s.to_string())
}

/// Host of a URL, or the value itself when it carries no scheme.
pub fn host_or_value(value: &str) -> String {
    let value = value.trim();
    if value.contains("://") {
        if let Ok(host) = extract_domain_from_url(value) {
            return host;
        }
    }
    value.to_string()
}

/// Check if a string is a valid domain
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 {
        return false;
    }

    let parts: Vec<&str> = domain.split('.').collect();
    if parts.len() < 2 {
        return false;
    }

    for part in parts {
        if part.is_empty() || part.len() > 63 {
            return false;
        }

        if !part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return false;
        }

        if part.starts_with('-') || part.ends_with('-') {
            return false;
        }
    }

    true
}

/// Normalise a discovered hostname and apply the scope check.
///
/// Lowercases, trims whitespace and trailing dots, strips one leading `*.`.
/// Returns `None` for anything outside `domain` or containing characters
/// other than `[a-z0-9._-]`.
pub fn normalize_subdomain(value: &str, domain: &str) -> Option<String> {
    let value = value.trim();
    if !value.is_ascii() {
        return None;
    }
    let mut cleaned = value.to_ascii_lowercase();

    while cleaned.ends_with('.') {
        cleaned.pop();
    }

    if let Some(stripped) = cleaned.strip_prefix("*.") {
        cleaned = stripped.to_string();
    }

    if cleaned.is_empty()
        || !cleaned
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'))
    {
        return None;
    }

    let domain = domain.to_ascii_lowercase();
    if cleaned == domain || cleaned.ends_with(&format!(".{}", domain)) {
        Some(cleaned)
    } else {
        None
    }
}

/// Join a bare label returned by an API with the apex, leaving full names alone.
pub fn qualify(subdomain: &str, domain: &str) -> String {
    let subdomain = subdomain.trim();
    let lower = subdomain.to_lowercase();
    if lower == domain || lower.ends_with(&format!(".{}", domain)) {
        subdomain.to_string()
    } else {
        format!("{}.{}", subdomain, domain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_domain() {
        assert!(is_valid_domain("example.com"));
        assert!(is_valid_domain("sub.example.com"));
        assert!(!is_valid_domain("example"));
        assert!(!is_valid_domain(""));
        assert!(!is_valid_domain("-example.com"));
        assert!(!is_valid_domain("example-.com"));
    }

    #[test]
    fn test_normalize_subdomain() {
        assert_eq!(normalize_subdomain("A.Example.com", "example.com"), Some("a.example.com".to_string()));
        assert_eq!(normalize_subdomain("*.b.example.com", "example.com"), Some("b.example.com".to_string()));
        assert_eq!(normalize_subdomain(" c.example.com. ", "example.com"), Some("c.example.com".to_string()));
        assert_eq!(normalize_subdomain("example.com", "example.com"), Some("example.com".to_string()));
        assert_eq!(normalize_subdomain("x.other.com", "example.com"), None);
        assert_eq!(normalize_subdomain("badexample.com", "example.com"), None);
        assert_eq!(normalize_subdomain("*.*.a.example.com", "example.com"), None);
        assert_eq!(normalize_subdomain("a b.example.com", "example.com"), None);
    }

    #[test]
    fn test_normalize_rejects_non_ascii() {
        assert_eq!(normalize_subdomain("\u{212A}ey.example.com", "example.com"), None);
        assert_eq!(normalize_subdomain("\u{17F}ub.example.com", "example.com"), None);
        assert_eq!(normalize_subdomain("KEY.example.com", "example.com"), Some("key.example.com".to_string()));
    }

    #[test]
    fn test_qualify() {
        assert_eq!(qualify("www", "example.com"), "www.example.com");
        assert_eq!(qualify("api.example.com", "example.com"), "api.example.com");
    }

    #[test]
    fn test_host_or_value() {
        assert_eq!(host_or_value("https://api.example.com/path?q=1"), "api.example.com");
        assert_eq!(host_or_value("mail.example.com"), "mail.example.com");
    }
}
