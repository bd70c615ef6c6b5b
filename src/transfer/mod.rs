//! Split-transfer protocol
//!
//! A file is sealed with a fresh AES-256-GCM key, the ciphertext is cut into
//! a large primary part and a small secondary part, and the secondary part
//! is bundled with the key into a secondary package. The two artifacts are
//! meant to travel through independent channels; the protocol prepares them
//! but does not transport them (non-goal). Channel separation only helps if
//! the *entire* secondary package, not merely the key, travels apart from
//! the primary part.

mod reconstruct;
mod split;

pub use reconstruct::{ReconstructOutcome, Reconstructor};
pub use split::{FileSplitter, SplitOutcome};

use crate::crypto;
use crate::error::TransferError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Extension of primary part files
pub const PRIMARY_PART_EXT: &str = "relaypart";

/// Extension of secondary package files
pub const SECONDARY_PACKAGE_EXT: &str = "relaypkg";

/// The secondary artifact: tail ciphertext plus the transfer key.
///
/// Serialized as JSON with exactly these two fields; there is no version
/// field, so format changes are breaking. Created once per transfer,
/// immutable thereafter, consumed exactly once by the reconstructor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecondaryPackage {
    /// Ciphertext suffix not carried by the primary part
    pub secondary_ciphertext: Vec<u8>,
    /// The 32-byte transfer key
    pub key: Vec<u8>,
}

impl SecondaryPackage {
    /// Serialize for writing as the secondary package file
    pub fn to_bytes(&self) -> Result<Vec<u8>, TransferError> {
        serde_json::to_vec(self).map_err(|e| TransferError::EncryptionFailed {
            reason: format!("package serialization: {}", e),
        })
    }

    /// Deserialize a secondary package file
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransferError> {
        serde_json::from_slice(bytes).map_err(|source| TransferError::MalformedPackage { source })
    }

    /// The transfer key, length-checked
    pub fn transfer_key(&self) -> Result<[u8; crypto::KEY_SIZE], TransferError> {
        crypto::key_from_slice(&self.key)
    }
}

/// Filename of a primary part: `primary_<transferID>_<stem>.relaypart`
pub fn primary_part_filename(transfer_id: &str, stem: &str) -> String {
    format!("primary_{}_{}.{}", transfer_id, stem, PRIMARY_PART_EXT)
}

/// Filename of a secondary package: `secondary_<transferID>_<stem>.relaypkg`
pub fn secondary_package_filename(transfer_id: &str, stem: &str) -> String {
    format!("secondary_{}_{}.{}", transfer_id, stem, SECONDARY_PACKAGE_EXT)
}

/// Parse the transfer id out of a secondary package filename.
///
/// Requires at least three underscore-delimited segments and the literal
/// `secondary` prefix; the second segment is the transfer id.
pub fn parse_transfer_id(filename: &str) -> Option<&str> {
    let segments: Vec<&str> = filename.split('_').collect();
    if segments.len() < 3 || segments[0] != "secondary" {
        return None;
    }
    Some(segments[1])
}

/// RAII guard modelling scoped access to an external resource.
///
/// Acquisition verifies the resource is present and readable; release is
/// logged on drop, so every exit path (including errors) releases it.
pub(crate) struct ScopedAccess {
    resource: String,
}

impl ScopedAccess {
    pub(crate) async fn acquire(path: &Path) -> Result<Self, TransferError> {
        let resource = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        match tokio::fs::metadata(path).await {
            Ok(_) => {
                tracing::trace!(resource = %resource, "acquired scoped access");
                Ok(Self { resource })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(TransferError::ResourceNotFound { name: resource })
            }
            Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                Err(TransferError::AccessDenied { resource })
            }
            Err(e) => Err(TransferError::Io(e)),
        }
    }
}

impl Drop for ScopedAccess {
    fn drop(&mut self) {
        tracing::trace!(resource = %self.resource, "released scoped access");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_round_trip() {
        let package = SecondaryPackage {
            secondary_ciphertext: vec![1, 2, 3],
            key: vec![0u8; 32],
        };
        let bytes = package.to_bytes().unwrap();
        let parsed = SecondaryPackage::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.secondary_ciphertext, vec![1, 2, 3]);
        assert_eq!(parsed.transfer_key().unwrap(), [0u8; 32]);
    }

    #[test]
    fn test_malformed_package() {
        let err = SecondaryPackage::from_bytes(b"not json").unwrap_err();
        assert!(matches!(err, TransferError::MalformedPackage { .. }));
    }

    #[test]
    fn test_package_rejects_wrong_key_length() {
        let package = SecondaryPackage {
            secondary_ciphertext: vec![1],
            key: vec![0u8; 16],
        };
        assert!(matches!(
            package.transfer_key(),
            Err(TransferError::KeyLength {
                expected: 32,
                actual: 16
            })
        ));
    }

    #[test]
    fn test_filename_round_trip() {
        let name = secondary_package_filename("abc-123", "report");
        assert_eq!(name, "secondary_abc-123_report.relaypkg");
        assert_eq!(parse_transfer_id(&name), Some("abc-123"));
    }

    #[test]
    fn test_parse_requires_secondary_prefix() {
        assert_eq!(parse_transfer_id("primary_abc_report.relaypart"), None);
    }

    #[test]
    fn test_parse_requires_three_segments() {
        assert_eq!(parse_transfer_id("secondary_abc"), None);
        assert_eq!(parse_transfer_id("secondary"), None);
    }

    #[test]
    fn test_parse_tolerates_underscores_in_stem() {
        let name = secondary_package_filename("id-1", "my_report_v2");
        assert_eq!(parse_transfer_id(&name), Some("id-1"));
    }
}
