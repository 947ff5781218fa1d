//! PII redaction
//!
//! Scrubs emails, phone numbers, card-like digit groups and SSN-like
//! digit groups from text bound for persistence or display. Never used to
//! alter what backends receive.

use regex::Regex;
use std::sync::LazyLock;

static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").unwrap()
});

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b").unwrap()
});

static CARD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:\d{4}[-\s]){3}\d{4}\b").unwrap());

static SSN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b").unwrap());

/// Replace each PII occurrence with a fixed placeholder token.
///
/// Card-like groups are scrubbed before SSN-like groups so a 16-digit
/// card number is not partially consumed by the shorter SSN pattern.
pub fn redact(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let text = EMAIL.replace_all(text, "[EMAIL_REDACTED]");
    let text = PHONE.replace_all(&text, "[PHONE_REDACTED]");
    let text = CARD.replace_all(&text, "[CARD_REDACTED]");
    let text = SSN.replace_all(&text, "[SSN_REDACTED]");
    text.into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_email() {
        let out = redact("Contact alice@example.com for details");
        assert_eq!(out, "Contact [EMAIL_REDACTED] for details");
    }

    #[test]
    fn test_redact_phone() {
        let out = redact("Call 555-123-4567 now");
        assert_eq!(out, "Call [PHONE_REDACTED] now");
    }

    #[test]
    fn test_redact_card() {
        let out = redact("Card: 4111 1111 1111 1111");
        assert_eq!(out, "Card: [CARD_REDACTED]");
    }

    #[test]
    fn test_redact_ssn() {
        let out = redact("SSN 123-45-6789 on file");
        assert_eq!(out, "SSN [SSN_REDACTED] on file");
    }

    #[test]
    fn test_redact_empty() {
        assert_eq!(redact(""), "");
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = "Nothing sensitive here.";
        assert_eq!(redact(text), text);
    }
}
