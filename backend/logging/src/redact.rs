//! Log Redaction
//!
//! Scrubs API keys, access tokens, and phone numbers from strings before they
//! reach a log sink.

use regex::Regex;
use std::sync::LazyLock;

static TELEPHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap()
});
static API_KEY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(sk-[a-zA-Z0-9_\-]{20,})|(gh[pousr]_[A-Za-z0-9]{20,})|(github_pat_[A-Za-z0-9_]{20,})|(Bearer\s+[a-zA-Z0-9\-\._~+/]+=*)",
    )
    .unwrap()
});

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = TELEPHONE_RE.replace_all(input, "[REDACTED_PHONE]");
    API_KEY_RE
        .replace_all(&redacted, "[REDACTED_TOKEN]")
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redaction() {
        let raw = "Sending to +1-555-123-4567 with Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";
        let clean = redact_sensitive_data(raw);
        assert!(!clean.contains("+1-555-123-4567"));
        assert!(!clean.contains("Bearer eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9"));
    }

    #[test]
    fn test_redacts_provider_keys() {
        let raw = "keys: sk-abcdefghijklmnopqrstuvwx ghp_ABCDEFGHIJKLMNOPQRSTuvwxyz";
        let clean = redact_sensitive_data(raw);
        assert_eq!(clean, "keys: [REDACTED_TOKEN] [REDACTED_TOKEN]");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(redact_sensitive_data("what is a lifetime?"), "what is a lifetime?");
    }
}
