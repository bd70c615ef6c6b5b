//! Reversible tokenization of detected sensitive data
//!
//! Findings are replaced by opaque tokens of the form `<PREFIX>_<fragment>`.
//! The token→original mapping accumulates in a process-wide reveal map with
//! last-write-wins merge semantics. The map is deliberately not persisted:
//! after a restart the redacted text remains but the originals are
//! unrecoverable. Reveal is an ephemeral, same-process operation.

use crate::crypto;
use crate::detect::{PatternDetector, SensitiveKind};
use crate::error::TokenError;
use crate::keystore::KeyStore;
use base64::Engine;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use zeroize::Zeroizing;

/// Key-store identifier of the process tokenization key
pub const TOKENIZATION_KEY_ID: &str = "tokenization_key";

/// Length of the encoded payload fragment kept in a token
const FRAGMENT_LEN: usize = 16;

/// Length of the random suffix mixed into each token payload
const SUFFIX_LEN: usize = 8;

/// Converts findings into opaque reversible tokens.
///
/// Construct once per process and share; the reveal map lives inside.
pub struct Tokenizer {
    detector: Arc<PatternDetector>,
    key: Option<Zeroizing<[u8; crypto::KEY_SIZE]>>,
    reveal_map: RwLock<HashMap<String, String>>,
}

impl std::fmt::Debug for Tokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tokenizer").finish_non_exhaustive()
    }
}

impl Tokenizer {
    /// Create a tokenizer whose sealing key is loaded from (or created in)
    /// the key store under [`TOKENIZATION_KEY_ID`].
    ///
    /// Fails with [`TokenError::KeyStore`] when a freshly generated key
    /// cannot be persisted to the store.
    pub fn new(
        detector: Arc<PatternDetector>,
        key_store: &dyn KeyStore,
    ) -> Result<Self, TokenError> {
        let key = match key_store.retrieve(TOKENIZATION_KEY_ID) {
            Some(bytes) => match crypto::key_from_slice(&bytes) {
                Ok(key) => Zeroizing::new(key),
                Err(_) => {
                    tracing::warn!(
                        "Stored tokenization key has wrong length ({} bytes), regenerating",
                        bytes.len()
                    );
                    create_key(key_store)?
                }
            },
            None => create_key(key_store)?,
        };

        Ok(Self {
            detector,
            key: Some(key),
            reveal_map: RwLock::new(HashMap::new()),
        })
    }

    /// Create a tokenizer with no sealing key.
    ///
    /// Tokens degrade to `<PREFIX>_<random>`: still unique, no longer sealed.
    pub fn without_key(detector: Arc<PatternDetector>) -> Self {
        Self {
            detector,
            key: None,
            reveal_map: RwLock::new(HashMap::new()),
        }
    }

    /// Redact all detected sensitive values in `text`.
    ///
    /// Returns the redacted text and the token→original map for this call.
    /// Replacement is by first literal occurrence of each value; a value no
    /// longer present (already consumed by an earlier replacement) is
    /// silently skipped.
    pub fn tokenize(&self, text: &str) -> (String, HashMap<String, String>) {
        let mut redacted = text.to_string();
        let mut tokens = HashMap::new();

        for finding in self.detector.detect(text) {
            let token = self.generate_token(finding.kind);
            match redacted.find(&finding.value) {
                Some(pos) => {
                    redacted.replace_range(pos..pos + finding.value.len(), &token);
                    tokens.insert(token, finding.value);
                }
                None => {
                    tracing::debug!(
                        kind = finding.kind.token_prefix(),
                        "finding value no longer present, skipping"
                    );
                }
            }
        }

        if !tokens.is_empty() {
            let mut map = self.reveal_map.write().expect("reveal map lock poisoned");
            for (token, original) in &tokens {
                map.insert(token.clone(), original.clone());
            }
        }

        (redacted, tokens)
    }

    /// Substitute every known token in `text` back to its original value
    pub fn reveal(&self, text: &str) -> String {
        let map = self.reveal_map.read().expect("reveal map lock poisoned");
        let mut revealed = text.to_string();
        for (token, original) in map.iter() {
            if revealed.contains(token) {
                revealed = revealed.replace(token, original);
            }
        }
        revealed
    }

    /// Merge externally produced token mappings (later writes win)
    pub fn merge_tokens(&self, tokens: &HashMap<String, String>) {
        let mut map = self.reveal_map.write().expect("reveal map lock poisoned");
        for (token, original) in tokens {
            map.insert(token.clone(), original.clone());
        }
    }

    /// Number of tokens currently revealable
    pub fn reveal_map_len(&self) -> usize {
        self.reveal_map.read().expect("reveal map lock poisoned").len()
    }

    fn generate_token(&self, kind: SensitiveKind) -> String {
        let prefix = kind.token_prefix();
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(SUFFIX_LEN)
            .map(char::from)
            .collect();

        if let Some(key) = &self.key {
            let payload = format!("{}{}", prefix, suffix);
            match crypto::encrypt(key, payload.as_bytes()) {
                Ok(sealed) => {
                    let encoded = base64::engine::general_purpose::STANDARD.encode(sealed);
                    let fragment: String = encoded.chars().take(FRAGMENT_LEN).collect();
                    return format!("{}_{}", prefix, fragment);
                }
                Err(e) => {
                    tracing::warn!("Token sealing failed, using random fallback: {}", e);
                }
            }
        }

        format!("{}_{}", prefix, suffix)
    }
}

fn create_key(
    key_store: &dyn KeyStore,
) -> Result<Zeroizing<[u8; crypto::KEY_SIZE]>, TokenError> {
    let key = crypto::generate_key();
    key_store
        .store(key.as_ref(), TOKENIZATION_KEY_ID)
        .map_err(|e| TokenError::KeyStore {
            reason: format!("failed to persist tokenization key: {}", e),
        })?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keystore::MemoryKeyStore;

    fn tokenizer() -> Tokenizer {
        let detector = Arc::new(PatternDetector::new().unwrap());
        Tokenizer::new(detector, &MemoryKeyStore::new()).unwrap()
    }

    #[test]
    fn test_tokenize_email_and_card() {
        let tk = tokenizer();
        let text = "mail anna@example.com, card 4539 1488 0343 6467";
        let (redacted, tokens) = tk.tokenize(text);

        assert_eq!(tokens.len(), 2);
        assert!(!redacted.contains("anna@example.com"));
        assert!(!redacted.contains("4539 1488 0343 6467"));
        assert!(redacted.contains("EMAIL_"));
        assert!(redacted.contains("CARD_"));
    }

    #[test]
    fn test_tokenize_then_reveal_round_trip() {
        let tk = tokenizer();
        let text = "mail anna@example.com, card 4539 1488 0343 6467";
        let (redacted, _) = tk.tokenize(text);

        assert_eq!(tk.reveal(&redacted), text);
    }

    #[test]
    fn test_no_sensitive_data_is_identity() {
        let tk = tokenizer();
        let (redacted, tokens) = tk.tokenize("nothing secret here");
        assert_eq!(redacted, "nothing secret here");
        assert!(tokens.is_empty());
    }

    #[test]
    fn test_token_shape() {
        let tk = tokenizer();
        let (_, tokens) = tk.tokenize("write to anna@example.com");
        let token = tokens.keys().next().unwrap();
        let (prefix, fragment) = token.split_once('_').unwrap();
        assert_eq!(prefix, "EMAIL");
        assert_eq!(fragment.chars().count(), FRAGMENT_LEN);
    }

    #[test]
    fn test_fallback_token_without_key() {
        let detector = Arc::new(PatternDetector::new().unwrap());
        let tk = Tokenizer::without_key(detector);
        let (_, tokens) = tk.tokenize("write to anna@example.com");
        let token = tokens.keys().next().unwrap();
        let (prefix, fragment) = token.split_once('_').unwrap();
        assert_eq!(prefix, "EMAIL");
        assert_eq!(fragment.len(), SUFFIX_LEN);
    }

    #[test]
    fn test_key_reused_across_instances() {
        let store = MemoryKeyStore::new();
        let detector = Arc::new(PatternDetector::new().unwrap());
        let _first = Tokenizer::new(detector.clone(), &store).unwrap();
        let stored = store.retrieve(TOKENIZATION_KEY_ID).unwrap();

        let _second = Tokenizer::new(detector, &store).unwrap();
        assert_eq!(store.retrieve(TOKENIZATION_KEY_ID).unwrap(), stored);
    }

    #[test]
    fn test_unwritable_key_store_fails_construction() {
        struct RejectingKeyStore;

        impl KeyStore for RejectingKeyStore {
            fn store(&self, _key: &[u8], _id: &str) -> std::io::Result<()> {
                Err(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "read-only vault",
                ))
            }
            fn retrieve(&self, _id: &str) -> Option<Vec<u8>> {
                None
            }
            fn delete(&self, _id: &str) -> std::io::Result<()> {
                Ok(())
            }
        }

        let detector = Arc::new(PatternDetector::new().unwrap());
        let err = Tokenizer::new(detector, &RejectingKeyStore).unwrap_err();
        assert!(matches!(err, TokenError::KeyStore { .. }));
    }

    #[test]
    fn test_reveal_map_accumulates() {
        let tk = tokenizer();
        tk.tokenize("first: anna@example.com");
        tk.tokenize("second: bob@example.com");
        assert_eq!(tk.reveal_map_len(), 2);
    }

    #[test]
    fn test_merge_later_write_wins() {
        let tk = tokenizer();
        let mut first = HashMap::new();
        first.insert("EMAIL_x".to_string(), "old@example.com".to_string());
        tk.merge_tokens(&first);

        let mut second = HashMap::new();
        second.insert("EMAIL_x".to_string(), "new@example.com".to_string());
        tk.merge_tokens(&second);

        assert_eq!(tk.reveal("EMAIL_x"), "new@example.com");
    }
}
