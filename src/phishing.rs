//! Phishing keyword/URL heuristics
//!
//! Lexical-only scoring, independent of detection and tokenization. An empty
//! result means "no heuristic signal", not "safe". There is no network
//! lookup; the known-domain set is fixed at construction.

use crate::error::DetectError;
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt;

/// Account/credential/urgency/financial lexicon, bilingual
const PHISHING_KEYWORDS: &[&str] = &[
    // Russian
    "пароль",
    "логин",
    "войти",
    "аккаунт",
    "учетная запись",
    "верификация",
    "подтвердить",
    "банк",
    "кредит",
    "карта",
    "выигрыш",
    "приз",
    "наследство",
    "срочно",
    "немедленно",
    "бесплатно",
    "подарок",
    "обновить",
    "безопасность",
    "конфиденциально",
    "личные данные",
    // English
    "password",
    "login",
    "verify",
    "account",
    "bank",
    "credit",
    "card",
    "prize",
    "winner",
    "urgent",
    "immediate",
    "free",
    "gift",
    "update",
    "security",
    "confidential",
    "personal data",
    "click here",
];

const URL_PATTERN: &str = r"(?i)(?:https?://|www\.)[\w\.-]+\.[a-z]{2,}(?:[\w/\.\?=&%-]*)?";

/// Demo set standing in for an externally refreshed blocklist
const KNOWN_PHISHING_DOMAINS: &[&str] = &[
    "known-phishing-site.com",
    "fake-bank-login.com",
    "suspicious-crypto.net",
];

const SUSPICIOUS_HOST_KEYWORDS: &[&str] =
    &["login", "signin", "account", "verify", "security", "update"];

const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf", ".gq"];

const LOOKALIKE_DOMAINS: &[&str] = &["paypa1", "g00gle", "faceb00k", "appleid-verify"];

/// A single heuristic signal found in scanned text
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhishingFinding {
    /// A lexicon keyword appeared in the text
    Keyword(String),
    /// The text contains at least one URL
    ContainsUrl,
}

impl fmt::Display for PhishingFinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhishingFinding::Keyword(word) => write!(f, "Keyword: '{}'", word),
            PhishingFinding::ContainsUrl => write!(f, "Contains URL(s)"),
        }
    }
}

/// Verdict for a single scanned URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlVerdict {
    /// No heuristic fired
    Safe,
    /// Structural indicators of phishing
    Suspicious,
    /// Host is on the known-bad list
    Phishing,
}

/// Keyword/URL/domain-pattern scanner
pub struct PhishingScanner {
    keywords: Vec<&'static str>,
    url_regex: Regex,
    known_domains: BTreeSet<&'static str>,
}

impl PhishingScanner {
    /// Build the scanner with the built-in lexicon and blocklist
    pub fn new() -> Result<Self, DetectError> {
        let url_regex = Regex::new(URL_PATTERN).map_err(|e| DetectError::InvalidPattern {
            name: "url".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            keywords: PHISHING_KEYWORDS.to_vec(),
            url_regex,
            known_domains: KNOWN_PHISHING_DOMAINS.iter().copied().collect(),
        })
    }

    /// Scan text for phishing signals. De-duplicated; empty ≠ safe.
    pub fn scan(&self, text: &str) -> BTreeSet<PhishingFinding> {
        let mut findings = BTreeSet::new();
        let lowercased = text.to_lowercase();

        for keyword in &self.keywords {
            if lowercased.contains(keyword) {
                findings.insert(PhishingFinding::Keyword((*keyword).to_string()));
            }
        }

        if self.url_regex.is_match(text) {
            findings.insert(PhishingFinding::ContainsUrl);
        }

        findings
    }

    /// Structural verdict for a single URL.
    ///
    /// Checks, in order: the known-bad host list, host+path keyword combos,
    /// risky TLDs, lookalike domains of popular services, and excessive
    /// subdomain depth.
    pub fn scan_url(&self, url: &str) -> UrlVerdict {
        let host = match host_of(url) {
            Some(host) => host,
            None => return UrlVerdict::Safe,
        };

        if self.known_domains.contains(host.as_str()) {
            return UrlVerdict::Phishing;
        }

        let path = path_of(url).to_lowercase();
        let host_keyword = SUSPICIOUS_HOST_KEYWORDS.iter().any(|k| host.contains(k));
        let path_keyword = SUSPICIOUS_HOST_KEYWORDS
            .iter()
            .any(|k| path.split('/').any(|seg| seg == *k));
        if host_keyword && path_keyword {
            return UrlVerdict::Suspicious;
        }

        if SUSPICIOUS_TLDS.iter().any(|tld| host.ends_with(tld)) {
            return UrlVerdict::Suspicious;
        }

        if LOOKALIKE_DOMAINS.iter().any(|d| host.contains(d)) {
            return UrlVerdict::Suspicious;
        }

        if host.split('.').count() > 4 {
            return UrlVerdict::Suspicious;
        }

        UrlVerdict::Safe
    }
}

/// Extract the lowercased host from a URL, tolerating a missing scheme
fn host_of(url: &str) -> Option<String> {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    let host = rest.split(['/', '?', '#']).next()?;
    let host = host.split('@').next_back()?; // drop userinfo
    let host = host.split(':').next()?; // drop port
    if host.contains('.') {
        Some(host.to_lowercase())
    } else {
        None
    }
}

fn path_of(url: &str) -> &str {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(url);
    match rest.find('/') {
        Some(idx) => &rest[idx..],
        None => "",
    }
}
