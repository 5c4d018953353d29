// Value codec
//
// Encoded format (binary):
// [magic: 4 bytes "KVV\0"] [version: u16 LE] [bincode(Value)]
//
// The bincode payload carries the enum variant index, so the decoder
// recovers the value kind without any external type hint.

use crate::format_version::{magic, value_version, VALUE_FORMAT_VERSION};
use crate::value::Value;
use crate::{Error, Result};
use bincode::Options;
use serde::{de::Error as _, Deserialize, Deserializer};
use std::cell::Cell;

/// Maximum nesting depth of arrays and objects
pub const MAX_DEPTH: usize = 64;

/// Maximum size of an encoded value (64MB)
pub const MAX_ENCODED_LEN: u64 = 64 * 1024 * 1024;

const HEADER_LEN: usize = 6;

thread_local! {
    static DECODE_DEPTH: Cell<usize> = const { Cell::new(0) };
}

/// Restores the decode depth counter when a nested value finishes.
struct DepthGuard;

impl Drop for DepthGuard {
    fn drop(&mut self) {
        DECODE_DEPTH.with(|d| d.set(d.get().saturating_sub(1)));
    }
}

/// Deserializes an array or object body while tracking nesting depth.
///
/// Without the bound a crafted payload could recurse until the stack
/// overflows.
pub(crate) fn nested<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let depth = DECODE_DEPTH.with(|d| {
        let next = d.get() + 1;
        d.set(next);
        next
    });
    let _guard = DepthGuard;
    if depth > MAX_DEPTH {
        return Err(D::Error::custom(format!(
            "nesting exceeds maximum depth of {}",
            MAX_DEPTH
        )));
    }
    T::deserialize(deserializer)
}

fn options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
        .with_limit(MAX_ENCODED_LEN)
        .reject_trailing_bytes()
}

/// Checks that a value can be stored: floats are finite and nesting is
/// bounded.
fn validate(value: &Value, depth: usize) -> std::result::Result<(), String> {
    match value {
        Value::Float(n) if !n.is_finite() => Err(format!("non-finite float {}", n)),
        Value::Array(items) => {
            if depth >= MAX_DEPTH {
                return Err(format!("nesting exceeds maximum depth of {}", MAX_DEPTH));
            }
            items.iter().try_for_each(|v| validate(v, depth + 1))
        }
        Value::Object(map) => {
            if depth >= MAX_DEPTH {
                return Err(format!("nesting exceeds maximum depth of {}", MAX_DEPTH));
            }
            map.values().try_for_each(|v| validate(v, depth + 1))
        }
        _ => Ok(()),
    }
}

/// Encodes a value into its storable byte form.
///
/// Fails with [`Error::Validation`] for values that cannot be stored:
/// NaN or infinite floats, nesting deeper than [`MAX_DEPTH`], or payloads
/// larger than [`MAX_ENCODED_LEN`].
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    validate(value, 0).map_err(|msg| Error::Validation(format!("unencodable value: {}", msg)))?;

    let payload = options()
        .serialize(value)
        .map_err(|e| Error::Validation(format!("unencodable value: {}", e)))?;

    let mut out = Vec::with_capacity(HEADER_LEN + payload.len());
    out.extend_from_slice(&magic::VALUE);
    out.extend_from_slice(&VALUE_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&payload);
    Ok(out)
}

/// Decodes bytes produced by [`encode`].
///
/// Any foreign, truncated or corrupted input fails with [`Error::Decode`].
pub fn decode(data: &[u8]) -> Result<Value> {
    if data.len() < HEADER_LEN {
        return Err(Error::Decode(format!(
            "encoded value too short: {} bytes",
            data.len()
        )));
    }
    if data[..4] != magic::VALUE {
        return Err(Error::Decode("bad value magic".to_string()));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if !value_version().can_read(version) {
        return Err(Error::Decode(format!(
            "unsupported value format version {}",
            version
        )));
    }

    DECODE_DEPTH.with(|d| d.set(0));
    let value: Value = options()
        .deserialize(&data[HEADER_LEN..])
        .map_err(|e| Error::Decode(e.to_string()))?;

    validate(&value, 0).map_err(Error::Decode)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn roundtrip(v: Value) {
        let bytes = encode(&v).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, v);
        assert_eq!(decoded.kind(), v.kind());
    }

    #[test]
    fn test_roundtrip_every_kind() {
        roundtrip(Value::Null);
        roundtrip(Value::Bool(true));
        roundtrip(Value::Bool(false));
        roundtrip(Value::Int(0));
        roundtrip(Value::Int(i64::MIN));
        roundtrip(Value::Float(-0.5));
        roundtrip(Value::Text(String::new()));
        roundtrip(Value::Text("héllo wörld".to_string()));
        roundtrip(Value::Bytes(vec![0, 255, 0, 128]));
        roundtrip(Value::Date(1_700_000_000_000));

        let mut map = BTreeMap::new();
        map.insert("tags".to_string(), Value::Array(vec![1.into(), "two".into()]));
        map.insert("blob".to_string(), Value::Bytes(vec![1, 2, 3]));
        map.insert("none".to_string(), Value::Null);
        roundtrip(Value::Object(map));
    }

    #[test]
    fn test_falsy_values_keep_their_kind() {
        let decoded: Vec<Value> = [Value::Bool(false), Value::Int(0), Value::Null, Value::Float(0.0)]
            .iter()
            .map(|v| decode(&encode(v).unwrap()).unwrap())
            .collect();

        assert_eq!(decoded[0], Value::Bool(false));
        assert_eq!(decoded[1], Value::Int(0));
        assert_eq!(decoded[2], Value::Null);
        assert_eq!(decoded[3], Value::Float(0.0));
    }

    #[test]
    fn test_encode_rejects_non_finite() {
        for f in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let err = encode(&Value::Float(f)).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
        let nested = Value::Array(vec![Value::Float(f64::NAN)]);
        assert!(matches!(encode(&nested), Err(Error::Validation(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut v = Value::Null;
        for _ in 0..MAX_DEPTH {
            v = Value::Array(vec![v]);
        }
        roundtrip(v.clone());

        let too_deep = Value::Array(vec![v]);
        assert!(matches!(encode(&too_deep), Err(Error::Validation(_))));
    }

    #[test]
    fn test_decode_rejects_deep_crafted_payload() {
        // Array variant index (7) followed by length 1, repeated
        let mut data = Vec::new();
        data.extend_from_slice(&magic::VALUE);
        data.extend_from_slice(&VALUE_FORMAT_VERSION.to_le_bytes());
        for _ in 0..10_000 {
            data.extend_from_slice(&7u32.to_le_bytes());
            data.extend_from_slice(&1u64.to_le_bytes());
        }
        data.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode(&data), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode(b""), Err(Error::Decode(_))));
        assert!(matches!(decode(b"not a value"), Err(Error::Decode(_))));

        let mut bytes = encode(&Value::Text("abc".to_string())).unwrap();
        bytes.truncate(bytes.len() - 1);
        assert!(matches!(decode(&bytes), Err(Error::Decode(_))));

        let mut bytes = encode(&Value::Int(7)).unwrap();
        bytes.push(0);
        assert!(matches!(decode(&bytes), Err(Error::Decode(_))));

        let mut bytes = encode(&Value::Int(7)).unwrap();
        bytes[4] = 99;
        assert!(matches!(decode(&bytes), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_unknown_variant() {
        let mut data = Vec::new();
        data.extend_from_slice(&magic::VALUE);
        data.extend_from_slice(&VALUE_FORMAT_VERSION.to_le_bytes());
        data.extend_from_slice(&42u32.to_le_bytes());
        assert!(matches!(decode(&data), Err(Error::Decode(_))));
    }
}
