//! Auto-optimization: given two capability maps and a priority, suggest a
//! `NegotiableParams` record. Advisory only — never applied implicitly to
//! an existing session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::params::NegotiableParams;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationPriority {
    Performance,
    Compatibility,
    Security,
}

fn data_format_preference(priority: OptimizationPriority) -> &'static [&'static str] {
    match priority {
        OptimizationPriority::Performance => &["msgpack", "protobuf", "vector_float32", "cbor", "json"],
        OptimizationPriority::Compatibility => &["json", "msgpack", "cbor", "protobuf"],
        OptimizationPriority::Security => &["protobuf", "cbor", "msgpack", "json"],
    }
}

fn compression_preference(priority: OptimizationPriority) -> &'static [&'static str] {
    match priority {
        OptimizationPriority::Performance => &["lz4", "snappy", "zstd", "gzip", "null"],
        OptimizationPriority::Compatibility => &["gzip", "null", "lz4", "zstd", "snappy"],
        OptimizationPriority::Security => &["zstd", "gzip", "lz4", "snappy", "null"],
    }
}

fn encryption_preference(priority: OptimizationPriority) -> &'static [&'static str] {
    match priority {
        OptimizationPriority::Performance => &["chacha20", "tls", "aes256", "none"],
        OptimizationPriority::Compatibility => &["tls", "chacha20", "aes256", "none"],
        OptimizationPriority::Security => &["aes256", "chacha20", "tls", "none"],
    }
}

fn error_correction_preference(priority: OptimizationPriority) -> &'static [&'static str] {
    match priority {
        OptimizationPriority::Performance => &["checksum", "none", "crc32", "reed_solomon"],
        OptimizationPriority::Compatibility => &["checksum", "crc32", "none", "reed_solomon"],
        OptimizationPriority::Security => &["reed_solomon", "crc32", "checksum", "none"],
    }
}

/// Reads a capability entry that names a list of supported string values
/// (e.g. `"data_formats": ["json", "msgpack"]`). Absent entries are
/// treated as "supports everything" so an agent that never declared the
/// capability doesn't block the other side's preference.
fn supported_values(capabilities: &HashMap<String, Value>, key: &str) -> Option<Vec<String>> {
    capabilities.get(key).and_then(|v| v.as_array()).map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect())
}

fn first_common<'a>(preference: &[&'a str], a: &HashMap<String, Value>, b: &HashMap<String, Value>, key: &str) -> Option<&'a str> {
    let sup_a = supported_values(a, key);
    let sup_b = supported_values(b, key);
    preference
        .iter()
        .find(|candidate| {
            sup_a.as_ref().map_or(true, |s| s.iter().any(|v| v == *candidate))
                && sup_b.as_ref().map_or(true, |s| s.iter().any(|v| v == *candidate))
        })
        .copied()
}

fn numeric(capabilities: &HashMap<String, Value>, key: &str) -> Option<u64> {
    capabilities.get(key).and_then(|v| v.as_u64())
}

fn boolean(capabilities: &HashMap<String, Value>, key: &str) -> Option<bool> {
    capabilities.get(key).and_then(|v| v.as_bool())
}

/// Suggests optimized params from two capability maps under a priority.
/// Preference-list fields fall back to the default params value if
/// neither side declared a supported-values list at all.
pub fn suggest_optimal_params(
    capabilities_a: &HashMap<String, Value>,
    capabilities_b: &HashMap<String, Value>,
    priority: OptimizationPriority,
) -> NegotiableParams {
    let base = NegotiableParams::default();

    let data_format = first_common(data_format_preference(priority), capabilities_a, capabilities_b, "data_formats")
        .map(str::to_string)
        .unwrap_or(base.data_format);
    let compression = first_common(compression_preference(priority), capabilities_a, capabilities_b, "compression_formats")
        .map(str::to_string)
        .unwrap_or(base.compression);
    let encryption = first_common(encryption_preference(priority), capabilities_a, capabilities_b, "encryption_options")
        .map(str::to_string)
        .unwrap_or(base.encryption);
    let error_correction = first_common(error_correction_preference(priority), capabilities_a, capabilities_b, "error_correction_options")
        .map(str::to_string)
        .unwrap_or(base.error_correction);

    let max_message_size = match (numeric(capabilities_a, "max_message_size"), numeric(capabilities_b, "max_message_size")) {
        (Some(a), Some(b)) => a.min(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => base.max_message_size,
    };

    let streaming_enabled = boolean(capabilities_a, "streaming").unwrap_or(true) && boolean(capabilities_b, "streaming").unwrap_or(true);

    let batch_size = match (numeric(capabilities_a, "max_batch_size"), numeric(capabilities_b, "max_batch_size")) {
        (Some(a), Some(b)) => a.min(b) as u32,
        (Some(a), None) => a as u32,
        (None, Some(b)) => b as u32,
        (None, None) => base.batch_size,
    };

    NegotiableParams {
        data_format,
        compression,
        encryption,
        error_correction,
        max_message_size,
        streaming_enabled,
        batch_size,
        ..base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn picks_first_mutually_supported_format_under_performance() {
        let mut a = HashMap::new();
        a.insert("data_formats".to_string(), json!(["json", "msgpack"]));
        let mut b = HashMap::new();
        b.insert("data_formats".to_string(), json!(["msgpack", "protobuf"]));
        let params = suggest_optimal_params(&a, &b, OptimizationPriority::Performance);
        assert_eq!(params.data_format, "msgpack");
    }

    #[test]
    fn streaming_is_and_of_both_sides() {
        let mut a = HashMap::new();
        a.insert("streaming".to_string(), json!(true));
        let mut b = HashMap::new();
        b.insert("streaming".to_string(), json!(false));
        let params = suggest_optimal_params(&a, &b, OptimizationPriority::Compatibility);
        assert!(!params.streaming_enabled);
    }

    #[test]
    fn max_message_size_is_min_of_both() {
        let mut a = HashMap::new();
        a.insert("max_message_size".to_string(), json!(4096));
        let mut b = HashMap::new();
        b.insert("max_message_size".to_string(), json!(2048));
        let params = suggest_optimal_params(&a, &b, OptimizationPriority::Performance);
        assert_eq!(params.max_message_size, 2048);
    }
}
