//! SafeRelay: data protection for a personal secure-messaging client.
//!
//! The crate implements the client-side protection pipeline that sits
//! between the user and the wire:
//!
//! - **Detection** ([`detect`]): regex/lexical scanners classify credit
//!   cards, emails, phone numbers and personal names in outgoing text, with
//!   overlap resolution so every span is classified exactly once.
//! - **Tokenization** ([`tokenize`]): detected values are replaced by opaque
//!   reversible tokens; the token map accumulates in a process-wide reveal
//!   map held by the [`tokenize::Tokenizer`].
//! - **Phishing heuristics** ([`phishing`]): keyword/URL scanning of
//!   incoming or outgoing text, plus structural per-URL verdicts.
//! - **Split transfers** ([`transfer`]): files are sealed whole under a
//!   fresh AES-256-GCM key, then the ciphertext is split so the bulk travels
//!   through the normal channel and a small secondary package (ciphertext
//!   tail plus key) travels through a separate user-mediated channel.
//!   Reconstruction is idempotent and duplicate-safe per transfer id.
//! - **Orchestration** ([`relay`]): [`relay::SecureRelay`] wires the
//!   components together behind security-level presets and emits ordered
//!   events for the presentation layer.
//!
//! Collaborators are injected, never global: key material lives behind the
//! [`keystore::KeyStore`] trait and message persistence behind
//! [`message::MessageStore`].

pub mod config;
pub mod crypto;
pub mod detect;
pub mod error;
pub mod keystore;
pub mod message;
pub mod phishing;
pub mod relay;
pub mod tokenize;
pub mod transfer;

pub use config::{SafeRelayConfig, SecurityConfig, SecurityLevel};
pub use detect::{PatternDetector, SensitiveFinding, SensitiveKind};
pub use error::{Error, Result};
pub use keystore::{FileKeyStore, KeyStore, MemoryKeyStore};
pub use message::{MessageRecord, MessageStore};
pub use phishing::{PhishingFinding, PhishingScanner, UrlVerdict};
pub use relay::{RelayEvent, SecureRelay, SendOutcome};
pub use tokenize::Tokenizer;
pub use transfer::{
    FileSplitter, ReconstructOutcome, Reconstructor, SecondaryPackage, SplitOutcome,
};
