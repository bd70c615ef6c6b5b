//! Flat-blob message persistence
//!
//! The whole message list is encoded as one JSON array in a single file,
//! rewritten on every save. Small and simple on purpose: the store is an
//! external collaborator and the pipeline only relies on `save` and
//! `fetch_all`.

use super::MessageRecord;
use crate::error::StoreError;
use std::path::PathBuf;
use tokio::sync::RwLock;

/// File-backed message store with an in-memory cache
pub struct MessageStore {
    blob_path: PathBuf,
    messages: RwLock<Vec<MessageRecord>>,
}

impl MessageStore {
    /// Open (or create) the store at the given blob file
    pub async fn open(blob_path: PathBuf) -> Result<Self, StoreError> {
        if let Some(parent) = blob_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let messages = match tokio::fs::read(&blob_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                tracing::warn!("Discarding unreadable message blob: {}", e);
                Vec::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(StoreError::Io(e)),
        };

        Ok(Self {
            blob_path,
            messages: RwLock::new(messages),
        })
    }

    /// Save a record, replacing any existing record with the same id
    pub async fn save(&self, record: MessageRecord) -> Result<(), StoreError> {
        {
            let mut messages = self.messages.write().await;
            match messages.iter_mut().find(|m| m.id == record.id) {
                Some(existing) => *existing = record,
                None => messages.push(record),
            }
        }
        self.flush().await
    }

    /// Fetch all saved records in insertion order
    pub async fn fetch_all(&self) -> Vec<MessageRecord> {
        self.messages.read().await.clone()
    }

    /// Find the record referencing a transfer id
    pub async fn find_by_transfer_id(&self, transfer_id: &str) -> Option<MessageRecord> {
        self.messages
            .read()
            .await
            .iter()
            .find(|m| m.transfer_id.as_deref() == Some(transfer_id))
            .cloned()
    }

    /// Record the reconstructed plaintext location for a transfer.
    ///
    /// Returns `false` without touching the record when the location was
    /// already set: `reconstructed_file` is written at most once.
    pub async fn mark_reconstructed(
        &self,
        transfer_id: &str,
        path: PathBuf,
    ) -> Result<bool, StoreError> {
        let updated = {
            let mut messages = self.messages.write().await;
            match messages
                .iter_mut()
                .find(|m| m.transfer_id.as_deref() == Some(transfer_id))
            {
                Some(record) if record.reconstructed_file.is_none() => {
                    record.reconstructed_file = Some(path);
                    true
                }
                _ => false,
            }
        };

        if updated {
            self.flush().await?;
        }
        Ok(updated)
    }

    async fn flush(&self) -> Result<(), StoreError> {
        let json = {
            let messages = self.messages.read().await;
            serde_json::to_vec_pretty(&*messages)?
        };
        tokio::fs::write(&self.blob_path, json).await?;
        Ok(())
    }
}
