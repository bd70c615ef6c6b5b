//! Message records
//!
//! The pipeline's view of a stored/sent message. Persistence itself is a
//! collaborator (a flat blob store); see [`store`].

pub mod store;

pub use store::MessageStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// A stored or sent message, possibly referencing a split file transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message id
    pub id: Uuid,

    /// Original (pre-redaction) content shown to the local user
    pub content: String,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// Whether the message travels encrypted
    pub is_encrypted: bool,

    /// Redacted content actually sent, when tokenization ran
    pub tokenized_content: Option<String>,

    /// Location of the primary ciphertext part, for file transfers
    pub primary_part: Option<PathBuf>,

    /// Location of the secondary package, for file transfers
    pub secondary_package: Option<PathBuf>,

    /// Transfer id correlating the two parts
    pub transfer_id: Option<String>,

    /// Location of the reconstructed plaintext; set at most once
    pub reconstructed_file: Option<PathBuf>,

    /// Original filename of a transferred file
    pub original_filename: Option<String>,
}

impl MessageRecord {
    /// Create a plain text message record
    pub fn text(content: impl Into<String>, is_encrypted: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            content: content.into(),
            timestamp: Utc::now(),
            is_encrypted,
            tokenized_content: None,
            primary_part: None,
            secondary_package: None,
            transfer_id: None,
            reconstructed_file: None,
            original_filename: None,
        }
    }

    /// Create a tokenized text message record
    pub fn tokenized(
        content: impl Into<String>,
        tokenized_content: impl Into<String>,
        is_encrypted: bool,
    ) -> Self {
        Self {
            tokenized_content: Some(tokenized_content.into()),
            ..Self::text(content, is_encrypted)
        }
    }

    /// Create a file-transfer message record
    pub fn file_transfer(
        content: impl Into<String>,
        primary_part: PathBuf,
        secondary_package: PathBuf,
        transfer_id: impl Into<String>,
        original_filename: impl Into<String>,
    ) -> Self {
        Self {
            primary_part: Some(primary_part),
            secondary_package: Some(secondary_package),
            transfer_id: Some(transfer_id.into()),
            original_filename: Some(original_filename.into()),
            ..Self::text(content, true)
        }
    }

    /// Whether this record references a split file transfer
    pub fn is_split(&self) -> bool {
        self.primary_part.is_some() && self.secondary_package.is_some()
    }
}
