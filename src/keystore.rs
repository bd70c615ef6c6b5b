//! Key-vault collaborator interface
//!
//! The platform key vault is external to the pipeline; this module defines
//! the interface the pipeline consumes plus two local implementations: a
//! file-backed store for the CLI and an in-memory store for tests.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use base64::Engine;

/// Symmetric-key vault keyed by identifier.
///
/// `retrieve` returns `None` both for missing keys and unreadable entries;
/// callers treat absence as "generate a fresh key".
pub trait KeyStore: Send + Sync {
    /// Store (or overwrite) a key under an identifier
    fn store(&self, key: &[u8], id: &str) -> std::io::Result<()>;

    /// Retrieve a key by identifier
    fn retrieve(&self, id: &str) -> Option<Vec<u8>>;

    /// Delete a key; deleting a missing key is not an error
    fn delete(&self, id: &str) -> std::io::Result<()>;
}

/// File-backed key store.
///
/// Each key lives in its own file named by the SHA-256 of its identifier,
/// so identifiers never reach the filesystem verbatim.
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: PathBuf) -> std::io::Result<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path_for(&self, id: &str) -> PathBuf {
        let digest = Sha256::digest(id.as_bytes());
        let mut name = String::with_capacity(64);
        for byte in digest {
            name.push_str(&format!("{:02x}", byte));
        }
        self.dir.join(format!("{}.key", name))
    }
}

impl KeyStore for FileKeyStore {
    fn store(&self, key: &[u8], id: &str) -> std::io::Result<()> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(key);
        std::fs::write(self.path_for(id), encoded)
    }

    fn retrieve(&self, id: &str) -> Option<Vec<u8>> {
        let encoded = std::fs::read_to_string(self.path_for(id)).ok()?;
        match base64::engine::general_purpose::STANDARD.decode(encoded.trim()) {
            Ok(key) => Some(key),
            Err(e) => {
                tracing::warn!("Discarding corrupt key-store entry '{}': {}", id, e);
                None
            }
        }
    }

    fn delete(&self, id: &str) -> std::io::Result<()> {
        match std::fs::remove_file(self.path_for(id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// In-memory key store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryKeyStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyStore for MemoryKeyStore {
    fn store(&self, key: &[u8], id: &str) -> std::io::Result<()> {
        self.keys
            .lock()
            .expect("key store lock poisoned")
            .insert(id.to_string(), key.to_vec());
        Ok(())
    }

    fn retrieve(&self, id: &str) -> Option<Vec<u8>> {
        self.keys
            .lock()
            .expect("key store lock poisoned")
            .get(id)
            .cloned()
    }

    fn delete(&self, id: &str) -> std::io::Result<()> {
        self.keys
            .lock()
            .expect("key store lock poisoned")
            .remove(id);
        Ok(())
    }
}
