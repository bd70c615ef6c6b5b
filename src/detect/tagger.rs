//! Lexical name/organization/place tagger
//!
//! Fallback pass behind the regex scanners: a small word-level tagger that
//! flags personal names, organization markers and place names from fixed
//! lexicons. Purely lexical; no language model (non-goal).

use std::collections::HashSet;
use std::ops::Range;

/// Common given names the regex name pass misses when they appear alone.
const GIVEN_NAMES: &[&str] = &[
    "alexander", "alexei", "anna", "boris", "daniel", "david", "dmitri", "elena", "emma", "igor",
    "irina", "ivan", "james", "john", "laura", "maria", "michael", "natalia", "nikolai", "olga",
    "oliver", "peter", "robert", "sarah", "sergei", "sophia", "svetlana", "thomas", "vladimir",
    "william",
];

/// Organization markers; the preceding capitalized word is part of the name.
const ORG_MARKERS: &[&str] = &[
    "bank", "corp", "corporation", "gmbh", "group", "holdings", "inc", "llc", "ltd", "plc",
];

const PLACES: &[&str] = &[
    "amsterdam", "beijing", "berlin", "boston", "chicago", "dubai", "kyiv", "london", "madrid",
    "moscow", "paris", "prague", "rome", "seattle", "singapore", "tokyo", "vienna", "warsaw",
];

/// A word tagged as naming a person, organization or place
#[derive(Debug, Clone)]
pub struct TaggedSpan {
    /// Byte range of the word in the source text
    pub span: Range<usize>,
    /// The word itself
    pub value: String,
}

/// Word-level lexicon tagger
pub struct LexicalTagger {
    given_names: HashSet<&'static str>,
    org_markers: HashSet<&'static str>,
    places: HashSet<&'static str>,
}

impl Default for LexicalTagger {
    fn default() -> Self {
        Self::new()
    }
}

impl LexicalTagger {
    /// Build the tagger with the built-in lexicons
    pub fn new() -> Self {
        Self {
            given_names: GIVEN_NAMES.iter().copied().collect(),
            org_markers: ORG_MARKERS.iter().copied().collect(),
            places: PLACES.iter().copied().collect(),
        }
    }

    /// Tag every word that names a person, organization or place
    pub fn tag(&self, text: &str) -> Vec<TaggedSpan> {
        let words = word_spans(text);
        let mut tagged = Vec::new();

        for (i, (span, word)) in words.iter().enumerate() {
            let lower = word.to_lowercase();
            let capitalized = word.chars().next().is_some_and(|c| c.is_uppercase());

            let is_person = capitalized && self.given_names.contains(lower.as_str());
            let is_place = capitalized && self.places.contains(lower.as_str());
            // Capitalized word directly followed by an organization marker
            let is_org = capitalized
                && words
                    .get(i + 1)
                    .is_some_and(|(_, next)| self.org_markers.contains(next.to_lowercase().as_str()));

            if is_person || is_place || is_org {
                tagged.push(TaggedSpan {
                    span: span.clone(),
                    value: word.clone(),
                });
            }
        }

        tagged
    }
}

/// Split text into alphabetic words with their byte spans
fn word_spans(text: &str) -> Vec<(Range<usize>, String)> {
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (idx, ch) in text.char_indices() {
        if ch.is_alphabetic() {
            start.get_or_insert(idx);
        } else if let Some(s) = start.take() {
            words.push((s..idx, text[s..idx].to_string()));
        }
    }
    if let Some(s) = start {
        words.push((s..text.len(), text[s..].to_string()));
    }

    words
}
