// Reference resolution and origin checks shared by the crawler and extractor

use crate::error::{Result, ScanError};
use url::Url;

const REJECTED_SCHEMES: [&str; 2] = ["javascript:", "mailto:"];

/// Parse an absolute base URL. A session cannot start without one.
pub fn parse_base(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| ScanError::InvalidUrl(format!("{}: {}", raw, e)))?;
    if url.cannot_be_a_base() {
        return Err(ScanError::InvalidUrl(format!("{} cannot be used as a base URL", raw)));
    }
    Ok(url)
}

/// Resolve `raw` against `base`, dropping fragments.
///
/// Returns `None` for references that are not navigable: empty once the
/// fragment is removed (so `#top` yields nothing), `javascript:` and `mailto:`
/// in any case, or anything the URL parser refuses.
pub fn normalize_reference(base: &Url, raw: &str) -> Option<Url> {
    let trimmed = raw.trim();
    let without_fragment = match trimmed.find('#') {
        Some(idx) => &trimmed[..idx],
        None => trimmed,
    };

    if without_fragment.is_empty() {
        return None;
    }

    let lowered = without_fragment.to_ascii_lowercase();
    if REJECTED_SCHEMES.iter().any(|scheme| lowered.starts_with(scheme)) {
        return None;
    }

    let mut resolved = base.join(without_fragment).ok()?;
    resolved.set_fragment(None);
    Some(resolved)
}

/// Scheme, host and port must all agree.
pub fn is_same_origin(a: &Url, b: &Url) -> bool {
    let (origin_a, origin_b) = (a.origin(), b.origin());
    origin_a.is_tuple() && origin_a == origin_b
}

/// `scheme://host[:port]` for the URL, used as the robots cache key.
pub fn origin_key(url: &Url) -> String {
    url.origin().ascii_serialization()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/dir/page.html").unwrap()
    }

    #[test]
    fn test_resolves_relative_reference() {
        let url = normalize_reference(&base(), "other.html").unwrap();
        assert_eq!(url.as_str(), "https://example.com/dir/other.html");

        let url = normalize_reference(&base(), "/login.php").unwrap();
        assert_eq!(url.as_str(), "https://example.com/login.php");
    }

    #[test]
    fn test_strips_fragment() {
        let url = normalize_reference(&base(), "/about#team").unwrap();
        assert_eq!(url.as_str(), "https://example.com/about");
    }

    #[test]
    fn test_fragment_only_reference_is_rejected() {
        assert!(normalize_reference(&base(), "#x").is_none());
        assert!(normalize_reference(&base(), "  #").is_none());
        assert!(normalize_reference(&base(), "").is_none());
    }

    #[test]
    fn test_rejects_script_and_mail_schemes_in_any_case() {
        for raw in [
            "javascript:alert(1)",
            "JavaScript:void(0)",
            "JAVASCRIPT:x",
            "mailto:admin@example.com",
            "MailTo:someone@other.org",
        ] {
            assert!(normalize_reference(&base(), raw).is_none(), "{} should be rejected", raw);
        }
    }

    #[test]
    fn test_same_origin_compares_scheme_host_and_port() {
        let a = Url::parse("https://example.com/a").unwrap();
        assert!(is_same_origin(&a, &Url::parse("https://example.com/b?x=1").unwrap()));
        assert!(is_same_origin(&a, &Url::parse("https://example.com:443/c").unwrap()));
        assert!(!is_same_origin(&a, &Url::parse("http://example.com/a").unwrap()));
        assert!(!is_same_origin(&a, &Url::parse("https://sub.example.com/a").unwrap()));
        assert!(!is_same_origin(&a, &Url::parse("https://example.com:8443/a").unwrap()));
    }

    #[test]
    fn test_opaque_origins_never_match() {
        let a = Url::parse("data:text/plain,hello").unwrap();
        assert!(!is_same_origin(&a, &a));
    }

    #[test]
    fn test_parse_base_rejects_malformed_urls() {
        assert!(parse_base("not a url").is_err());
        assert!(parse_base("mailto:someone@example.com").is_err());
        assert_eq!(parse_base(" http://testphp.vulnweb.com ").unwrap().as_str(), "http://testphp.vulnweb.com/");
    }

    #[test]
    fn test_origin_key() {
        let url = Url::parse("http://127.0.0.1:8080/path?q=1").unwrap();
        assert_eq!(origin_key(&url), "http://127.0.0.1:8080");
    }
}
