//! Sensitive-data detection
//!
//! Regex/lexical scanners for credit cards, emails, phone numbers and
//! personal names, with a lexicon tagger as a fallback pass. Scans run in a
//! fixed priority order; spans claimed by an earlier pass are never
//! re-claimed by a later one (first-registered-wins), so a digit run is
//! classified exactly once.

mod luhn;
mod tagger;

pub use luhn::validate as luhn_validate;
pub use tagger::{LexicalTagger, TaggedSpan};

use crate::error::DetectError;
use regex::Regex;
use std::ops::Range;

const CREDIT_CARD_PATTERN: &str = r"\b(?:\d[ -]*?){13,19}\b";
const EMAIL_PATTERN: &str = r"[A-Z0-9a-z._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,64}";
const PHONE_PATTERN: &str =
    r"\b(?:\+?\d{1,3}[-.\s]?)?(?:\(?\d{1,5}\)?[-.\s]?)?\d{1,5}[-.\s]?\d{1,5}[-.\s]?\d{1,9}\b";
// Latin and Cyrillic capitalized multi-word names
const NAME_PATTERN: &str = r"\b[А-ЯЁA-Z][а-яёa-z]+(?:\s+[А-ЯЁA-Z][а-яёa-z]+){1,2}\b";

/// Classification of a detected sensitive value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensitiveKind {
    /// Credit-card number (Luhn-validated)
    CreditCard,
    /// Email address
    Email,
    /// Phone number
    Phone,
    /// Capitalized multi-word personal name
    Name,
    /// Name/organization/place word from the lexical tagger
    Phrase,
}

impl SensitiveKind {
    /// Token prefix used for redaction tokens
    pub fn token_prefix(&self) -> &'static str {
        match self {
            SensitiveKind::CreditCard => "CARD",
            SensitiveKind::Email => "EMAIL",
            SensitiveKind::Phone => "PHONE",
            SensitiveKind::Name => "NAME",
            SensitiveKind::Phrase => "PHRASE",
        }
    }
}

/// A detected span of sensitive data.
///
/// Ephemeral: produced and consumed within one detection pass. `span` is a
/// half-open byte range into the scanned text.
#[derive(Debug, Clone)]
pub struct SensitiveFinding {
    /// Classified kind
    pub kind: SensitiveKind,
    /// The matched text
    pub value: String,
    /// Half-open byte range in the input
    pub span: Range<usize>,
}

/// Tracks spans already claimed by an earlier, higher-priority pass
struct SpanLedger {
    claimed: Vec<Range<usize>>,
}

impl SpanLedger {
    fn new() -> Self {
        Self { claimed: Vec::new() }
    }

    /// Claim a span unless it overlaps one already claimed
    fn try_claim(&mut self, span: &Range<usize>) -> bool {
        let overlaps = self
            .claimed
            .iter()
            .any(|c| span.start < c.end && c.start < span.end);
        if !overlaps {
            self.claimed.push(span.clone());
        }
        !overlaps
    }
}

/// Detector for sensitive data in outgoing text.
///
/// Deterministic for a given input. Construct once and share; compilation of
/// the patterns happens up front.
pub struct PatternDetector {
    card: Regex,
    card_exact: Regex,
    email: Regex,
    email_exact: Regex,
    phone: Regex,
    name: Regex,
    tagger: LexicalTagger,
}

impl PatternDetector {
    /// Compile the detection patterns
    pub fn new() -> Result<Self, DetectError> {
        Ok(Self {
            card: compile("credit_card", CREDIT_CARD_PATTERN)?,
            card_exact: compile("credit_card_exact", &anchored(CREDIT_CARD_PATTERN))?,
            email: compile("email", EMAIL_PATTERN)?,
            email_exact: compile("email_exact", &anchored(EMAIL_PATTERN))?,
            phone: compile("phone", PHONE_PATTERN)?,
            name: compile("name", NAME_PATTERN)?,
            tagger: LexicalTagger::new(),
        })
    }

    /// Detect sensitive data, ordered by ascending span start.
    ///
    /// Candidates that fail their secondary validity check (Luhn for cards,
    /// shape for emails, digit count for phones) are dropped entirely.
    pub fn detect(&self, text: &str) -> Vec<SensitiveFinding> {
        if text.is_empty() {
            return Vec::new();
        }

        let mut findings = Vec::new();
        let mut ledger = SpanLedger::new();

        // 1. Credit cards (Luhn-gated)
        for m in self.card.find_iter(text) {
            if !luhn_validate(m.as_str()) {
                tracing::debug!("card candidate failed Luhn check, dropped");
                continue;
            }
            if ledger.try_claim(&m.range()) {
                findings.push(finding(SensitiveKind::CreditCard, m.as_str(), m.range()));
            }
        }

        // 2. Emails
        for m in self.email.find_iter(text) {
            if self.email_exact.is_match(m.as_str()) && ledger.try_claim(&m.range()) {
                findings.push(finding(SensitiveKind::Email, m.as_str(), m.range()));
            }
        }

        // 3. Phone numbers. A candidate that also has credit-card structure
        // is rejected outright so digit runs that merely failed Luhn do not
        // come back as phones.
        for m in self.phone.find_iter(text) {
            let digit_count = m.as_str().chars().filter(|c| c.is_ascii_digit()).count();
            let card_shaped = self.card_exact.is_match(m.as_str());
            if digit_count >= 7 && !card_shaped && ledger.try_claim(&m.range()) {
                findings.push(finding(SensitiveKind::Phone, m.as_str(), m.range()));
            }
        }

        // 4. Capitalized multi-word names
        for m in self.name.find_iter(text) {
            if ledger.try_claim(&m.range()) {
                findings.push(finding(SensitiveKind::Name, m.as_str(), m.range()));
            }
        }

        // 5. Lexical tagger fallback
        for tag in self.tagger.tag(text) {
            if ledger.try_claim(&tag.span) {
                findings.push(SensitiveFinding {
                    kind: SensitiveKind::Phrase,
                    value: tag.value,
                    span: tag.span,
                });
            }
        }

        findings.sort_by_key(|f| f.span.start);
        findings
    }
}

fn finding(kind: SensitiveKind, value: &str, span: Range<usize>) -> SensitiveFinding {
    SensitiveFinding {
        kind,
        value: value.to_string(),
        span,
    }
}

fn anchored(pattern: &str) -> String {
    format!("^(?:{})$", pattern)
}

fn compile(name: &str, pattern: &str) -> Result<Regex, DetectError> {
    Regex::new(pattern).map_err(|e| DetectError::InvalidPattern {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> PatternDetector {
        PatternDetector::new().unwrap()
    }

    #[test]
    fn test_empty_text() {
        assert!(detector().detect("").is_empty());
    }

    #[test]
    fn test_valid_card_detected() {
        let findings = detector().detect("card 4539 1488 0343 6467 on file");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, SensitiveKind::CreditCard);
        assert_eq!(findings[0].value, "4539 1488 0343 6467");
    }

    #[test]
    fn test_luhn_failure_is_dropped_not_reclassified() {
        // Fails Luhn, so it is neither a card nor (because it has card
        // structure) a phone number.
        let findings = detector().detect("4539 1488 0343 6468");
        assert!(findings.is_empty());
    }

    #[test]
    fn test_email_and_card_no_name_overlap() {
        let findings = detector().detect("john.smith@example.com 4539148803436467");
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].kind, SensitiveKind::Email);
        assert_eq!(findings[1].kind, SensitiveKind::CreditCard);
    }

    #[test]
    fn test_phone_detected() {
        let findings = detector().detect("call me at +1 555 123-4567 tonight");
        assert!(findings
            .iter()
            .any(|f| f.kind == SensitiveKind::Phone && f.value.contains("555")));
    }

    #[test]
    fn test_short_digit_run_not_phone() {
        let findings = detector().detect("room 12345");
        assert!(findings.iter().all(|f| f.kind != SensitiveKind::Phone));
    }

    #[test]
    fn test_name_regex() {
        let findings = detector().detect("forward this to Ivan Petrov please");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, SensitiveKind::Name);
        assert_eq!(findings[0].value, "Ivan Petrov");
    }

    #[test]
    fn test_cyrillic_name() {
        let findings = detector().detect("передай Ивану: Анна Петрова уже здесь");
        assert!(findings
            .iter()
            .any(|f| f.kind == SensitiveKind::Name && f.value == "Анна Петрова"));
    }

    #[test]
    fn test_tagger_fallback_defers_to_name_regex() {
        // "Ivan Petrov" is claimed by the name pass; the tagger must not
        // produce a second overlapping finding for "Ivan".
        let findings = detector().detect("Ivan Petrov");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, SensitiveKind::Name);
    }

    #[test]
    fn test_tagger_fallback_single_name() {
        let findings = detector().detect("please remind ivan that Olga called");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].kind, SensitiveKind::Phrase);
        assert_eq!(findings[0].value, "Olga");
    }

    #[test]
    fn test_findings_sorted_by_position() {
        let text = "Olga will pay with 4539148803436467 via anna@example.com";
        let findings = detector().detect(text);
        let starts: Vec<usize> = findings.iter().map(|f| f.span.start).collect();
        let mut sorted = starts.clone();
        sorted.sort_unstable();
        assert_eq!(starts, sorted);
    }

    #[test]
    fn test_deterministic() {
        let text = "Olga, card 4539148803436467, mail anna@example.com";
        let d = detector();
        let a: Vec<String> = d.detect(text).into_iter().map(|f| f.value).collect();
        let b: Vec<String> = d.detect(text).into_iter().map(|f| f.value).collect();
        assert_eq!(a, b);
    }
}
