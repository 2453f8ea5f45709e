//! Byte sizes with unit suffixes
//!
//! Thresholds are written as `<digits>` or `<digits><unit>` with binary units
//! `b`, `k`, `m`, `g` and `t`, so `10g` is ten gibibytes.

use serde::{Deserialize, Deserializer};

use super::error::{ConfigResult, ConfigurationError};

const KIB: u64 = 1024;

/// Decode a size string such as `512`, `64k` or `10g` into bytes
pub fn decode_bytes(input: &str) -> ConfigResult<u64> {
    let trimmed = input.trim();
    let invalid = || ConfigurationError::InvalidSize(input.to_string());

    let (digits, multiplier) = match trimmed.char_indices().last() {
        Some((idx, unit)) if unit.is_ascii_alphabetic() => {
            let multiplier = match unit {
                'b' => 1,
                'k' => KIB,
                'm' => KIB.pow(2),
                'g' => KIB.pow(3),
                't' => KIB.pow(4),
                _ => return Err(invalid()),
            };
            (&trimmed[..idx], multiplier)
        }
        Some(_) => (trimmed, 1),
        None => return Err(invalid()),
    };

    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }

    digits
        .parse::<u64>()
        .ok()
        .and_then(|value| value.checked_mul(multiplier))
        .ok_or_else(invalid)
}

/// Sizes arrive from files as integers and from the environment or command
/// line as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

/// Serde adapter for `Option<u64>` size fields
pub fn deserialize_optional_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(None),
        Some(RawSize::Bytes(bytes)) => Ok(Some(bytes)),
        Some(RawSize::Text(text)) => decode_bytes(&text).map(Some).map_err(D::Error::custom),
    }
}
