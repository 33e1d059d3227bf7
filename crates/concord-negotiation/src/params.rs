//! `NegotiableParams`: the fixed-schema record of communication settings
//! negotiated between two agents, its allowed-value validation, strength
//! ordering, compatibility classification, and merge rules.

use std::collections::HashMap;

use concord_core::{ConcordError, ConcordResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DATA_FORMATS: &[&str] = &["json", "msgpack", "protobuf", "vector_float32", "vector_int8", "cbor"];
pub const COMPRESSIONS: &[&str] = &["null", "gzip", "lz4", "zstd", "snappy"];
pub const ENCRYPTIONS: &[&str] = &["none", "tls", "aes256", "chacha20"];
pub const ERROR_CORRECTIONS: &[&str] = &["none", "checksum", "crc32", "reed_solomon"];
pub const MIN_MAX_MESSAGE_SIZE: u64 = 1024;
pub const MAX_MAX_MESSAGE_SIZE: u64 = 100 * 1024 * 1024;
pub const MIN_TIMEOUT_MS: u64 = 1_000;
pub const MAX_TIMEOUT_MS: u64 = 600_000;
pub const MIN_PRIORITY: u8 = 1;
pub const MAX_PRIORITY: u8 = 10;

/// Strength ordering used when merging encryption choices; index is
/// strength rank, higher is stronger.
fn encryption_strength(value: &str) -> u8 {
    match value {
        "none" => 0,
        "tls" => 1,
        "chacha20" => 2,
        "aes256" => 3,
        _ => 0,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NegotiableParams {
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default = "default_data_format")]
    pub data_format: String,
    #[serde(default = "default_compression")]
    pub compression: String,
    #[serde(default = "default_error_correction")]
    pub error_correction: String,
    #[serde(default = "default_encryption")]
    pub encryption: String,
    #[serde(default = "default_max_message_size")]
    pub max_message_size: u64,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub streaming_enabled: bool,
    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
    #[serde(default = "default_retry_policy")]
    pub retry_policy: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_priority")]
    pub priority: u8,
    #[serde(default)]
    pub custom_params: HashMap<String, Value>,
}

fn default_protocol_version() -> String {
    "1.0".to_string()
}
fn default_data_format() -> String {
    "json".to_string()
}
fn default_compression() -> String {
    "null".to_string()
}
fn default_error_correction() -> String {
    "checksum".to_string()
}
fn default_encryption() -> String {
    "tls".to_string()
}
fn default_max_message_size() -> u64 {
    1024 * 1024
}
fn default_timeout_ms() -> u64 {
    30_000
}
fn default_batch_size() -> u32 {
    1
}
fn default_retry_policy() -> String {
    "exponential_backoff".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_priority() -> u8 {
    5
}

impl Default for NegotiableParams {
    fn default() -> Self {
        Self {
            protocol_version: default_protocol_version(),
            data_format: default_data_format(),
            compression: default_compression(),
            error_correction: default_error_correction(),
            encryption: default_encryption(),
            max_message_size: default_max_message_size(),
            timeout_ms: default_timeout_ms(),
            streaming_enabled: false,
            batch_size: default_batch_size(),
            retry_policy: default_retry_policy(),
            max_retries: default_max_retries(),
            priority: default_priority(),
            custom_params: HashMap::new(),
        }
    }
}

impl NegotiableParams {
    /// Validates every field against the fixed allowed-value lists in the
    /// external-interfaces spec. Encryption `none` is additionally
    /// rejected here when compared against a stronger-requiring peer via
    /// `reject_weaker_encryption`, not as part of bare validation.
    pub fn validate(&self) -> ConcordResult<()> {
        if !DATA_FORMATS.contains(&self.data_format.as_str()) {
            return Err(ConcordError::validation(format!("data_format '{}' not in {:?}", self.data_format, DATA_FORMATS)));
        }
        if !COMPRESSIONS.contains(&self.compression.as_str()) {
            return Err(ConcordError::validation(format!("compression '{}' not in {:?}", self.compression, COMPRESSIONS)));
        }
        if !ENCRYPTIONS.contains(&self.encryption.as_str()) {
            return Err(ConcordError::validation(format!("encryption '{}' not in {:?}", self.encryption, ENCRYPTIONS)));
        }
        if !ERROR_CORRECTIONS.contains(&self.error_correction.as_str()) {
            return Err(ConcordError::validation(format!(
                "error_correction '{}' not in {:?}",
                self.error_correction, ERROR_CORRECTIONS
            )));
        }
        if !(MIN_MAX_MESSAGE_SIZE..=MAX_MAX_MESSAGE_SIZE).contains(&self.max_message_size) {
            return Err(ConcordError::validation(format!(
                "max_message_size {} not in [{}, {}]",
                self.max_message_size, MIN_MAX_MESSAGE_SIZE, MAX_MAX_MESSAGE_SIZE
            )));
        }
        if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&self.timeout_ms) {
            return Err(ConcordError::validation(format!(
                "timeout_ms {} not in [{}, {}]",
                self.timeout_ms, MIN_TIMEOUT_MS, MAX_TIMEOUT_MS
            )));
        }
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&self.priority) {
            return Err(ConcordError::validation(format!("priority {} not in [{}, {}]", self.priority, MIN_PRIORITY, MAX_PRIORITY)));
        }
        Ok(())
    }

    /// `none` encryption is incompatible (not merely negotiable) against
    /// a peer proposing anything stronger.
    pub fn incompatible_with(&self, other: &Self) -> Option<String> {
        if self.encryption == "none" && other.encryption != "none" {
            return Some(format!("encryption 'none' cannot be accepted against peer's '{}'", other.encryption));
        }
        if other.encryption == "none" && self.encryption != "none" {
            return Some(format!("peer's encryption 'none' cannot be accepted against '{}'", self.encryption));
        }
        None
    }

    /// Field-wise merge picking the stricter/safer value per field,
    /// per the component design's `merge_with`/`auto_resolve` rules.
    /// Commutative for `max_message_size`, `timeout_ms`, `streaming_enabled`,
    /// `max_retries`, and `priority`.
    pub fn merge_with(&self, other: &Self, prefer_self: bool) -> Self {
        let mut custom_params = other.custom_params.clone();
        for (k, v) in &self.custom_params {
            if prefer_self || !custom_params.contains_key(k) {
                custom_params.insert(k.clone(), v.clone());
            }
        }

        Self {
            protocol_version: std::cmp::max(self.protocol_version.clone(), other.protocol_version.clone()),
            data_format: if prefer_self { self.data_format.clone() } else { other.data_format.clone() },
            compression: if self.compression == "null" || other.compression == "null" {
                "null".to_string()
            } else if prefer_self {
                self.compression.clone()
            } else {
                other.compression.clone()
            },
            max_message_size: self.max_message_size.min(other.max_message_size),
            timeout_ms: self.timeout_ms.min(other.timeout_ms),
            encryption: if encryption_strength(&self.encryption) >= encryption_strength(&other.encryption) {
                self.encryption.clone()
            } else {
                other.encryption.clone()
            },
            error_correction: if prefer_self { self.error_correction.clone() } else { other.error_correction.clone() },
            streaming_enabled: self.streaming_enabled && other.streaming_enabled,
            batch_size: self.batch_size.min(other.batch_size),
            retry_policy: if prefer_self { self.retry_policy.clone() } else { other.retry_policy.clone() },
            max_retries: self.max_retries.max(other.max_retries),
            priority: self.priority.max(other.priority),
            custom_params,
        }
    }

    /// Compatibility classification between two params instances, used
    /// by callers that want a yes/no/advisory read without performing a
    /// full negotiation round. Mirrors the allowed-value and encryption
    /// checks but returns a label instead of raising.
    pub fn compatibility_with(&self, other: &Self) -> CompatibilityClass {
        if self.incompatible_with(other).is_some() {
            return CompatibilityClass::Incompatible;
        }
        if self == other {
            return CompatibilityClass::Identical;
        }
        let format_ok = self.data_format == other.data_format;
        let encryption_ok = self.encryption != "none" && other.encryption != "none";
        if format_ok && encryption_ok {
            CompatibilityClass::Compatible
        } else {
            CompatibilityClass::Negotiable
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CompatibilityClass {
    Identical,
    Compatible,
    Negotiable,
    Incompatible,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_validate() {
        assert!(NegotiableParams::default().validate().is_ok());
    }

    #[test]
    fn out_of_range_max_message_size_fails_validation() {
        let mut p = NegotiableParams::default();
        p.max_message_size = 10;
        assert!(p.validate().is_err());
    }

    #[test]
    fn none_encryption_is_incompatible_with_stronger_peer() {
        let mut weak = NegotiableParams::default();
        weak.encryption = "none".to_string();
        let strong = NegotiableParams::default();
        assert!(weak.incompatible_with(&strong).is_some());
    }

    #[test]
    fn merge_is_commutative_for_deterministic_fields() {
        let mut a = NegotiableParams::default();
        a.max_message_size = 2048;
        a.timeout_ms = 5000;
        a.streaming_enabled = true;
        a.max_retries = 2;
        a.priority = 3;

        let mut b = NegotiableParams::default();
        b.max_message_size = 4096;
        b.timeout_ms = 2000;
        b.streaming_enabled = false;
        b.max_retries = 7;
        b.priority = 9;

        let merged_ab = a.merge_with(&b, true);
        let merged_ba = b.merge_with(&a, true);

        assert_eq!(merged_ab.max_message_size, merged_ba.max_message_size);
        assert_eq!(merged_ab.timeout_ms, merged_ba.timeout_ms);
        assert_eq!(merged_ab.streaming_enabled, merged_ba.streaming_enabled);
        assert_eq!(merged_ab.max_retries, merged_ba.max_retries);
        assert_eq!(merged_ab.priority, merged_ba.priority);
    }

    #[test]
    fn merge_picks_strongest_encryption() {
        let mut weak = NegotiableParams::default();
        weak.encryption = "tls".to_string();
        let mut strong = NegotiableParams::default();
        strong.encryption = "aes256".to_string();
        assert_eq!(weak.merge_with(&strong, true).encryption, "aes256");
    }
}
