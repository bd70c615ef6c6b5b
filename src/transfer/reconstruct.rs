//! Reconstruction of split transfers
//!
//! Inverse of the splitter: recombine primary + secondary ciphertext,
//! decrypt under the packaged key, and materialize the plaintext with a
//! write-to-temp-then-rename discipline so a failed reconstruction never
//! leaves a partial file.

use super::{ScopedAccess, SecondaryPackage, PRIMARY_PART_EXT};
use crate::crypto;
use crate::error::TransferError;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Per-transfer reconstruction state
#[derive(Debug, Clone)]
enum TransferState {
    /// A reconstruction for this transfer id is running
    Processing,
    /// Reconstruction finished; plaintext lives at the recorded path
    Done(PathBuf),
}

/// Outcome of a reconstruction request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconstructOutcome {
    /// Plaintext newly materialized at this location
    Completed(PathBuf),
    /// Transfer already reconstructed; existing location returned without
    /// re-decrypting
    AlreadyDone(PathBuf),
    /// A request for this transfer id is already in flight; dropped
    InFlight,
}

impl ReconstructOutcome {
    /// The plaintext location, if this outcome carries one
    pub fn path(&self) -> Option<&Path> {
        match self {
            ReconstructOutcome::Completed(p) | ReconstructOutcome::AlreadyDone(p) => Some(p),
            ReconstructOutcome::InFlight => None,
        }
    }
}

/// Idempotent, duplicate-safe reconstructor keyed by transfer id.
///
/// The state map is the only shared mutable state in the protocol: an entry
/// is inserted before work starts and resolved exactly once on every exit
/// path (`Done` on success, removed on failure so a corrected package can be
/// retried). Decryption is treated as a fast, non-interruptible unit; there
/// is no cancellation mid-decrypt.
pub struct Reconstructor {
    output_dir: PathBuf,
    states: Mutex<HashMap<String, TransferState>>,
}

impl Reconstructor {
    /// Create a reconstructor materializing plaintext under `output_dir`
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Reconstruct and decrypt one transfer.
    ///
    /// `primary_path` is the known primary part matched by `transfer_id`;
    /// `package_bytes` is the serialized secondary package received through
    /// the second channel.
    pub async fn reconstruct(
        &self,
        transfer_id: &str,
        primary_path: &Path,
        package_bytes: &[u8],
    ) -> Result<ReconstructOutcome, TransferError> {
        {
            let mut states = self.states.lock().await;
            match states.get(transfer_id) {
                Some(TransferState::Processing) => {
                    tracing::debug!(transfer_id = %transfer_id, "reconstruction already in flight, dropping");
                    return Ok(ReconstructOutcome::InFlight);
                }
                Some(TransferState::Done(path)) => {
                    tracing::debug!(transfer_id = %transfer_id, "transfer already reconstructed");
                    return Ok(ReconstructOutcome::AlreadyDone(path.clone()));
                }
                None => {
                    states.insert(transfer_id.to_string(), TransferState::Processing);
                }
            }
        }

        let result = self.run(transfer_id, primary_path, package_bytes).await;

        let mut states = self.states.lock().await;
        match result {
            Ok(path) => {
                states.insert(transfer_id.to_string(), TransferState::Done(path.clone()));
                Ok(ReconstructOutcome::Completed(path))
            }
            Err(e) => {
                // Failed transfers go back to Idle so a corrected package
                // can be retried.
                states.remove(transfer_id);
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        transfer_id: &str,
        primary_path: &Path,
        package_bytes: &[u8],
    ) -> Result<PathBuf, TransferError> {
        let package = SecondaryPackage::from_bytes(package_bytes)?;
        let key = package.transfer_key()?;

        let guard = ScopedAccess::acquire(primary_path).await?;
        let primary = tokio::fs::read(primary_path).await?;
        drop(guard);

        let mut combined = primary;
        combined.extend_from_slice(&package.secondary_ciphertext);

        let plaintext = crypto::decrypt(&key, &combined)?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let final_name = decrypted_filename(primary_path, transfer_id);
        let final_path = self.output_dir.join(&final_name);
        let tmp_path = self.output_dir.join(format!(".{}.tmp", final_name));

        let materialized = async {
            tokio::fs::write(&tmp_path, &plaintext).await?;
            tokio::fs::rename(&tmp_path, &final_path).await
        }
        .await;
        if let Err(e) = materialized {
            // The temp file may hold partial plaintext; it must not survive
            // a failed reconstruction.
            if let Err(cleanup) = tokio::fs::remove_file(&tmp_path).await {
                if cleanup.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(
                        path = %tmp_path.display(),
                        "Failed to remove temp file after error: {}",
                        cleanup
                    );
                }
            }
            return Err(TransferError::Io(e));
        }

        tracing::info!(
            transfer_id = %transfer_id,
            size = plaintext.len(),
            path = %final_path.display(),
            "transfer reconstructed"
        );

        Ok(final_path)
    }
}

/// Derive the plaintext filename from the primary part's name
fn decrypted_filename(primary_path: &Path, transfer_id: &str) -> String {
    let name = primary_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| transfer_id.to_string());
    let name = name.strip_prefix("primary_").unwrap_or(&name);
    let name = name
        .strip_suffix(&format!(".{}", PRIMARY_PART_EXT))
        .unwrap_or(name);
    format!("decrypted_{}", name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransferConfig;
    use crate::transfer::FileSplitter;
    use std::sync::Arc;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        splitter: FileSplitter,
        reconstructor: Arc<Reconstructor>,
        input: PathBuf,
    }

    async fn fixture(contents: &[u8]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("notes.txt");
        tokio::fs::write(&input, contents).await.unwrap();

        let config = TransferConfig {
            split_ratio: 0.9,
            parts_dir: dir.path().join("parts"),
            output_dir: dir.path().join("out"),
        };
        Fixture {
            splitter: FileSplitter::new(&config).unwrap(),
            reconstructor: Arc::new(Reconstructor::new(config.output_dir.clone())),
            input,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn test_round_trip() {
        let contents = b"the quick brown fox";
        let fx = fixture(contents).await;

        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

        let outcome = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap();

        let path = outcome.path().unwrap();
        let restored = tokio::fs::read(path).await.unwrap();
        assert_eq!(restored, contents);
    }

    #[tokio::test]
    async fn test_round_trip_empty_and_one_byte() {
        for contents in [&b""[..], &b"x"[..]] {
            let fx = fixture(contents).await;
            let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
            let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

            let outcome = fx
                .reconstructor
                .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
                .await
                .unwrap();
            let restored = tokio::fs::read(outcome.path().unwrap()).await.unwrap();
            assert_eq!(restored, contents);
        }
    }

    #[tokio::test]
    async fn test_second_request_short_circuits() {
        let fx = fixture(b"payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

        let first = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap();
        let second = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap();

        let path = match first {
            ReconstructOutcome::Completed(p) => p,
            other => panic!("expected Completed, got {:?}", other),
        };
        assert_eq!(second, ReconstructOutcome::AlreadyDone(path));
    }

    #[tokio::test]
    async fn test_malformed_package_fails_without_output() {
        let fx = fixture(b"payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();

        let err = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, b"garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::MalformedPackage { .. }));

        // No partial plaintext materialized
        let out_dir = fx._dir.path().join("out");
        let empty = !out_dir.exists()
            || std::fs::read_dir(&out_dir).unwrap().next().is_none();
        assert!(empty);
    }

    #[tokio::test]
    async fn test_tampered_primary_fails_decryption() {
        let fx = fixture(b"payload payload payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

        let mut primary = tokio::fs::read(&split.primary_part).await.unwrap();
        primary[20] ^= 0xFF;
        tokio::fs::write(&split.primary_part, &primary).await.unwrap();

        let err = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::DecryptionFailed));
    }

    #[tokio::test]
    async fn test_failure_allows_retry() {
        let fx = fixture(b"payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

        // First attempt with a broken package fails...
        let _ = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, b"broken")
            .await
            .unwrap_err();

        // ...and the id is free again for the corrected package.
        let outcome = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap();
        assert!(matches!(outcome, ReconstructOutcome::Completed(_)));
    }

    #[tokio::test]
    async fn test_failed_materialization_leaves_no_temp_file() {
        let fx = fixture(b"payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();

        // Occupy the final location with a non-empty directory so the
        // rename step fails after the temp file has been written.
        let out_dir = fx._dir.path().join("out");
        let final_name = decrypted_filename(&split.primary_part, &split.transfer_id);
        tokio::fs::create_dir_all(out_dir.join(&final_name).join("occupied"))
            .await
            .unwrap();

        let err = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::Io(_)));

        let mut entries = tokio::fs::read_dir(&out_dir).await.unwrap();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            assert!(!entry.file_name().to_string_lossy().ends_with(".tmp"));
        }
    }

    #[tokio::test]
    async fn test_missing_primary_part() {
        let fx = fixture(b"payload").await;
        let split = fx.splitter.split_and_encrypt(&fx.input).await.unwrap();
        let package_bytes = tokio::fs::read(&split.secondary_package).await.unwrap();
        tokio::fs::remove_file(&split.primary_part).await.unwrap();

        let err = fx
            .reconstructor
            .reconstruct(&split.transfer_id, &split.primary_part, &package_bytes)
            .await
            .unwrap_err();
        assert!(matches!(err, TransferError::ResourceNotFound { .. }));
    }

    #[test]
    fn test_decrypted_filename() {
        let path = Path::new("/tmp/parts/primary_id-1_report.relaypart");
        assert_eq!(decrypted_filename(path, "id-1"), "decrypted_id-1_report");
    }
}
