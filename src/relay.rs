//! Pipeline orchestrator
//!
//! Wires detector, tokenizer, phishing scanner, splitter and reconstructor
//! into the outgoing/incoming message flow. All components are explicitly
//! constructed and injected; there is no global state. Results reach the
//! presentation layer through a single ordered event channel.

use crate::config::{SafeRelayConfig, SecurityConfig, SecurityLevel};
use crate::detect::{PatternDetector, SensitiveFinding};
use crate::error::{Error, Result, TransferError};
use crate::keystore::KeyStore;
use crate::message::{MessageRecord, MessageStore};
use crate::phishing::{PhishingFinding, PhishingScanner};
use crate::tokenize::Tokenizer;
use crate::transfer::{FileSplitter, ReconstructOutcome, Reconstructor};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Ordered notifications for the presentation layer
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A message record was created (and persisted, unless disabled)
    MessageStored(MessageRecord),
    /// A transfer finished reconstructing
    TransferReconstructed {
        /// Transfer that completed
        transfer_id: String,
        /// Location of the plaintext
        path: PathBuf,
    },
}

/// Result of attempting to send a message
#[derive(Debug)]
pub enum SendOutcome {
    /// Message was recorded (tokenized or plain)
    Sent(MessageRecord),
    /// Phishing gate fired; nothing was sent
    PhishingSuspected(BTreeSet<PhishingFinding>),
    /// Sensitive data found and auto-tokenize is off; caller must decide
    SensitivePrompt(Vec<SensitiveFinding>),
}

/// The data-protection pipeline for one messaging session
pub struct SecureRelay {
    security: SecurityConfig,
    detector: Arc<PatternDetector>,
    tokenizer: Arc<Tokenizer>,
    phishing: PhishingScanner,
    splitter: FileSplitter,
    reconstructor: Arc<Reconstructor>,
    store: Arc<MessageStore>,
    events: Option<mpsc::UnboundedSender<RelayEvent>>,
}

impl SecureRelay {
    /// Assemble the pipeline from configuration and its collaborators
    pub fn new(
        config: &SafeRelayConfig,
        key_store: &dyn KeyStore,
        store: Arc<MessageStore>,
    ) -> Result<Self> {
        let detector = Arc::new(PatternDetector::new()?);
        let tokenizer = Arc::new(Tokenizer::new(detector.clone(), key_store)?);
        let splitter = FileSplitter::new(&config.transfer)?;
        let reconstructor = Arc::new(Reconstructor::new(config.transfer.output_dir.clone()));

        Ok(Self {
            security: config.security.clone(),
            detector,
            tokenizer,
            phishing: PhishingScanner::new()?,
            splitter,
            reconstructor,
            store,
            events: None,
        })
    }

    /// Attach the event channel feeding the presentation layer
    pub fn with_events(mut self, sender: mpsc::UnboundedSender<RelayEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    /// The tokenizer (for reveal operations and reveal-map inspection)
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Send an outgoing text message through the protection pipeline.
    ///
    /// Order of gates: phishing (Enhanced/Maximum only), then sensitive-data
    /// detection. With auto-tokenize off below Maximum, detection findings
    /// are returned for the caller to confirm instead of being sent.
    pub async fn send_message(&self, content: &str) -> Result<SendOutcome> {
        if self.security.phishing_gate() {
            let findings = self.phishing.scan(content);
            if !findings.is_empty() {
                tracing::warn!(count = findings.len(), "phishing gate fired, holding message");
                return Ok(SendOutcome::PhishingSuspected(findings));
            }
        }

        let detected = self.detector.detect(content);
        if detected.is_empty() {
            let record = MessageRecord::text(content, self.security.effective_encryption());
            self.persist(record.clone()).await?;
            return Ok(SendOutcome::Sent(record));
        }

        if !self.security.auto_tokenize && self.security.level != SecurityLevel::Maximum {
            return Ok(SendOutcome::SensitivePrompt(detected));
        }

        let record = self.tokenize_and_send(content).await?;
        Ok(SendOutcome::Sent(record))
    }

    /// Tokenize unconditionally and record the message.
    ///
    /// Used by [`send_message`](Self::send_message) when auto-tokenize is on
    /// and by callers confirming a [`SendOutcome::SensitivePrompt`].
    pub async fn tokenize_and_send(&self, content: &str) -> Result<MessageRecord> {
        let (redacted, tokens) = self.tokenizer.tokenize(content);
        tracing::debug!(tokens = tokens.len(), "message tokenized");

        let record =
            MessageRecord::tokenized(content, redacted, self.security.effective_encryption());
        self.persist(record.clone()).await?;
        Ok(record)
    }

    /// Send an outgoing file as a split, encrypted transfer.
    ///
    /// The configured security level must demand splitting; sending files
    /// plain is not part of this pipeline.
    pub async fn send_file(&self, path: &Path) -> Result<MessageRecord> {
        if !self.security.must_split() {
            return Err(Error::Config(
                "sending files without split+encrypt is not supported; enable split_files"
                    .to_string(),
            ));
        }

        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let outcome = self.splitter.split_and_encrypt(path).await?;

        let record = MessageRecord::file_transfer(
            format!("File: {} (split & encrypted)", filename),
            outcome.primary_part,
            outcome.secondary_package,
            outcome.transfer_id,
            filename,
        );
        self.persist(record.clone()).await?;
        Ok(record)
    }

    /// Reconstruct an incoming transfer from its secondary package.
    ///
    /// The matching primary part is located through the message store by
    /// transfer id. Returns the plaintext location, or `None` when a request
    /// for the same transfer is already in flight. Idempotent: a completed
    /// transfer returns its existing location without re-decrypting.
    pub async fn reconstruct_transfer(
        &self,
        transfer_id: &str,
        package_bytes: &[u8],
    ) -> Result<Option<PathBuf>> {
        let record = self
            .store
            .find_by_transfer_id(transfer_id)
            .await
            .ok_or_else(|| TransferError::ResourceNotFound {
                name: format!("transfer {}", transfer_id),
            })?;
        let primary_part = record
            .primary_part
            .ok_or_else(|| TransferError::ResourceNotFound {
                name: format!("primary part of transfer {}", transfer_id),
            })?;

        let outcome = self
            .reconstructor
            .reconstruct(transfer_id, &primary_part, package_bytes)
            .await?;

        match outcome {
            ReconstructOutcome::Completed(path) => {
                self.store
                    .mark_reconstructed(transfer_id, path.clone())
                    .await?;
                self.emit(RelayEvent::TransferReconstructed {
                    transfer_id: transfer_id.to_string(),
                    path: path.clone(),
                });
                Ok(Some(path))
            }
            ReconstructOutcome::AlreadyDone(path) => Ok(Some(path)),
            ReconstructOutcome::InFlight => Ok(None),
        }
    }

    /// Reveal the original content of a record using the process reveal map
    pub fn reveal_original(&self, record: &MessageRecord) -> String {
        match &record.tokenized_content {
            Some(tokenized) => self.tokenizer.reveal(tokenized),
            None => record.content.clone(),
        }
    }

    async fn persist(&self, record: MessageRecord) -> Result<()> {
        if self.security.save_to_device {
            self.store.save(record.clone()).await?;
        } else {
            tracing::debug!("device persistence disabled, message kept in session only");
        }
        self.emit(RelayEvent::MessageStored(record));
        Ok(())
    }

    fn emit(&self, event: RelayEvent) {
        if let Some(sender) = &self.events {
            if sender.send(event).is_err() {
                tracing::trace!("event receiver dropped");
            }
        }
    }
}
