use serde::{Deserialize, Serialize};

/// Resource limits applied while decoding a single stream.
///
/// The defaults accept anything a real pickler produces for ordinary data;
/// tighten them when decoding untrusted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// Largest memo index PUT/BINPUT/LONG_BINPUT may store at.
    pub max_memo_index: usize,
    /// Largest declared payload length for counted strings and LONG4.
    pub max_literal_len: usize,
    /// Longest digit string accepted by the INT and LONG text opcodes.
    pub max_long_digits: usize,
    /// Deepest container nesting the decoded value may have.
    ///
    /// `Value`'s derived `Clone`, `PartialEq` and `Drop` recurse per level,
    /// so this also bounds the call stack those need.
    pub max_depth: usize,
    /// Most values the decoded tree may hold. A memo entry fetched twice is
    /// copied into both positions and counts twice.
    pub max_nodes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_memo_index: 100_000,
            max_literal_len: 256 * 1024 * 1024, // 256 MB
            max_long_digits: 10_000,
            max_depth: 1000,
            max_nodes: 10_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let cfg: DecoderConfig = serde_json::from_str(r#"{"max_memo_index": 16}"#).unwrap();
        assert_eq!(cfg.max_memo_index, 16);
        assert_eq!(cfg.max_long_digits, DecoderConfig::default().max_long_digits);
        assert_eq!(cfg.max_depth, 1000);
    }
}
