//! Whole-file sealing and ciphertext splitting

use super::{primary_part_filename, secondary_package_filename, ScopedAccess, SecondaryPackage};
use crate::config::TransferConfig;
use crate::crypto;
use crate::error::TransferError;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of splitting one file: the two artifact locations and the id that
/// correlates them across the transfer lifecycle.
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    /// Location of the primary part (bulk ciphertext)
    pub primary_part: PathBuf,
    /// Location of the serialized secondary package (tail + key)
    pub secondary_package: PathBuf,
    /// Fresh unique transfer id
    pub transfer_id: String,
}

/// Seals a file under a fresh key and splits the ciphertext.
///
/// The primary part carries `ratio` of the ciphertext (default 0.9) so it
/// stays transmissible through the normal message channel; the small
/// secondary package carries the rest plus the key and goes through a
/// distinct, user-mediated sharing action.
pub struct FileSplitter {
    ratio: f64,
    parts_dir: PathBuf,
}

impl FileSplitter {
    /// Create a splitter from transfer configuration
    pub fn new(config: &TransferConfig) -> Result<Self, TransferError> {
        if !(config.split_ratio > 0.0 && config.split_ratio < 1.0) {
            return Err(TransferError::InvalidRatio {
                ratio: config.split_ratio,
            });
        }
        Ok(Self {
            ratio: config.split_ratio,
            parts_dir: config.parts_dir.clone(),
        })
    }

    /// Seal and split an in-memory buffer.
    ///
    /// Returns the primary ciphertext, the secondary package and the
    /// transfer id. The secondary ciphertext is never empty when the
    /// ciphertext is non-empty (and AEAD ciphertext is never empty, even
    /// for an empty input).
    pub fn split_and_encrypt_bytes(
        &self,
        data: &[u8],
    ) -> Result<(Vec<u8>, SecondaryPackage, String), TransferError> {
        let key = crypto::generate_key();
        let transfer_id = Uuid::new_v4().to_string();

        let ciphertext = crypto::encrypt(&key, data)?;
        let primary_size = split_point(self.ratio, ciphertext.len());

        let primary = ciphertext[..primary_size].to_vec();
        let package = SecondaryPackage {
            secondary_ciphertext: ciphertext[primary_size..].to_vec(),
            key: key.to_vec(),
        };

        tracing::debug!(
            transfer_id = %transfer_id,
            total = ciphertext.len(),
            primary = primary.len(),
            secondary = package.secondary_ciphertext.len(),
            "split ciphertext"
        );

        Ok((primary, package, transfer_id))
    }

    /// Seal and split a file, writing both artifacts under the parts
    /// directory with the transfer id embedded in their names.
    pub async fn split_and_encrypt(&self, path: &Path) -> Result<SplitOutcome, TransferError> {
        let guard = ScopedAccess::acquire(path).await?;
        let data = tokio::fs::read(path).await?;
        drop(guard);

        let (primary, package, transfer_id) = self.split_and_encrypt_bytes(&data)?;

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".to_string());

        tokio::fs::create_dir_all(&self.parts_dir).await?;
        let primary_part = self.parts_dir.join(primary_part_filename(&transfer_id, &stem));
        let secondary_package = self
            .parts_dir
            .join(secondary_package_filename(&transfer_id, &stem));

        tokio::fs::write(&primary_part, &primary).await?;
        tokio::fs::write(&secondary_package, package.to_bytes()?).await?;

        tracing::info!(
            transfer_id = %transfer_id,
            primary = %primary_part.display(),
            secondary = %secondary_package.display(),
            "file split and encrypted"
        );

        Ok(SplitOutcome {
            primary_part,
            secondary_package,
            transfer_id,
        })
    }
}

/// Primary part size: `floor(ratio * len)`, clamped so the secondary part is
/// never empty for non-empty ciphertext.
fn split_point(ratio: f64, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let primary = (ratio * len as f64).floor() as usize;
    primary.min(len - 1)
}
