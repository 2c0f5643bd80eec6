//! Vault metadata grammar.
//!
//! Metadata is a comma-separated list of unique `key=value` pairs, e.g.
//! `name=BTC-CVX,protocol=Badger,behavior=DCA`.

use crate::error::{RegistryError, Result};

/// Parse metadata into its `(key, value)` pairs.
pub fn parse(metadata: &str) -> Result<Vec<(&str, &str)>> {
    if metadata.is_empty() {
        return Err(invalid(metadata, "empty metadata"));
    }

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for pair in metadata.split(',') {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| invalid(metadata, "expected key=value"))?;

        if key.is_empty() || !key.chars().all(is_key_char) {
            return Err(invalid(metadata, "bad key"));
        }
        if value.is_empty() || value.contains('=') || value.chars().any(char::is_whitespace) {
            return Err(invalid(metadata, "bad value"));
        }
        if pairs.iter().any(|(k, _)| *k == key) {
            return Err(invalid(metadata, "duplicate key"));
        }
        pairs.push((key, value));
    }
    Ok(pairs)
}

/// Check metadata against the grammar.
pub fn validate(metadata: &str) -> Result<()> {
    parse(metadata).map(|_| ())
}

fn is_key_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '-'
}

fn invalid(metadata: &str, reason: &str) -> RegistryError {
    RegistryError::InvalidMetadata(format!("{reason}: {metadata:?}"))
}
