//! SafeRelay configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main SafeRelay configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SafeRelayConfig {
    /// Security level and message-handling toggles
    pub security: SecurityConfig,

    /// Split-transfer protocol configuration
    pub transfer: TransferConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Security level presets.
///
/// Raising the level tightens the defaults in [`SecurityConfig`]; `Maximum`
/// enforces them regardless of individual toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityLevel {
    /// Everything opt-in
    #[default]
    Standard,

    /// Tokenization, encryption and splitting on by default
    Enhanced,

    /// All protections enforced, previews and device persistence off
    Maximum,
}

/// Message-handling security configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Active security level
    pub level: SecurityLevel,

    /// Encrypt outgoing messages
    pub encryption_enabled: bool,

    /// Tokenize detected sensitive data without prompting
    pub auto_tokenize: bool,

    /// Split outgoing files into primary/secondary parts
    pub split_files: bool,

    /// Encrypt outgoing files
    pub encrypt_files: bool,

    /// Show message previews in the presentation layer
    pub show_message_preview: bool,

    /// Persist messages to the device store
    pub save_to_device: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self::for_level(SecurityLevel::Standard)
    }
}

impl SecurityConfig {
    /// Preset toggle matrix for a security level
    pub fn for_level(level: SecurityLevel) -> Self {
        match level {
            SecurityLevel::Standard => Self {
                level,
                encryption_enabled: false,
                auto_tokenize: false,
                split_files: false,
                encrypt_files: false,
                show_message_preview: true,
                save_to_device: true,
            },
            SecurityLevel::Enhanced => Self {
                level,
                encryption_enabled: true,
                auto_tokenize: true,
                split_files: true,
                encrypt_files: true,
                show_message_preview: true,
                save_to_device: true,
            },
            SecurityLevel::Maximum => Self {
                level,
                encryption_enabled: true,
                auto_tokenize: true,
                split_files: true,
                encrypt_files: true,
                show_message_preview: false,
                save_to_device: false,
            },
        }
    }

    /// Whether outgoing files must be split and encrypted
    pub fn must_split(&self) -> bool {
        self.level == SecurityLevel::Maximum || self.split_files
    }

    /// Whether outgoing messages are encrypted (enforced at Maximum)
    pub fn effective_encryption(&self) -> bool {
        self.level == SecurityLevel::Maximum || self.encryption_enabled
    }

    /// Whether the phishing gate runs before sending
    pub fn phishing_gate(&self) -> bool {
        matches!(self.level, SecurityLevel::Enhanced | SecurityLevel::Maximum)
    }
}

/// Split-transfer protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferConfig {
    /// Fraction of the ciphertext carried by the primary part.
    ///
    /// Must lie in the open interval (0, 1). The secondary part is never
    /// empty for non-empty ciphertext regardless of this value.
    pub split_ratio: f64,

    /// Directory where primary parts and secondary packages are written
    pub parts_dir: PathBuf,

    /// Directory where reconstructed plaintext files are materialized
    pub output_dir: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        let base = default_data_dir();
        Self {
            split_ratio: 0.9,
            parts_dir: base.join("parts"),
            output_dir: base.join("decrypted"),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Base directory for storage
    pub base_dir: PathBuf,

    /// Message blob store file
    pub messages_file: PathBuf,

    /// Key-store directory
    pub keys_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = default_data_dir();
        Self {
            messages_file: base.join("messages.json"),
            keys_dir: base.join("keys"),
            base_dir: base,
        }
    }
}

fn default_data_dir() -> PathBuf {
    dirs_next::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("saferelay")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SafeRelayConfig::default();
        assert_eq!(config.security.level, SecurityLevel::Standard);
        assert!((config.transfer.split_ratio - 0.9).abs() < f64::EPSILON);
        assert!(config.security.save_to_device);
    }

    #[test]
    fn test_level_presets() {
        let standard = SecurityConfig::for_level(SecurityLevel::Standard);
        assert!(!standard.auto_tokenize);
        assert!(!standard.phishing_gate());

        let enhanced = SecurityConfig::for_level(SecurityLevel::Enhanced);
        assert!(enhanced.auto_tokenize);
        assert!(enhanced.split_files);
        assert!(enhanced.phishing_gate());
        assert!(enhanced.save_to_device);

        let maximum = SecurityConfig::for_level(SecurityLevel::Maximum);
        assert!(maximum.effective_encryption());
        assert!(maximum.must_split());
        assert!(!maximum.show_message_preview);
        assert!(!maximum.save_to_device);
    }

    #[test]
    fn test_maximum_enforces_encryption() {
        let mut config = SecurityConfig::for_level(SecurityLevel::Maximum);
        config.encryption_enabled = false;
        config.split_files = false;
        assert!(config.effective_encryption());
        assert!(config.must_split());
    }

    #[test]
    fn test_config_toml_round_trip() {
        let config = SafeRelayConfig::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed: SafeRelayConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.security.level, config.security.level);
        assert_eq!(parsed.transfer.parts_dir, config.transfer.parts_dir);
    }
}
