//! Transaction memos
//!
//! Callers hand in loosely typed memo values; `validate_memo` maps them to
//! the memo kinds the ledger understands.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum byte length of a text memo
pub const MAX_TEXT_MEMO_LEN: usize = 28;

/// Length of a hash memo
pub const HASH_MEMO_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MemoError {
    #[error("Invalid memo: {0}")]
    Invalid(String),
}

/// A memo attached to a transaction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Memo {
    #[default]
    None,
    Text(String),
    Id(u64),
    /// Hex-encoded 32-byte hash
    Hash(String),
    /// Base64-encoded return payload
    Return(String),
}

/// Caller-supplied memo input
#[derive(Debug, Clone, PartialEq)]
pub enum MemoValue {
    Text(String),
    Number(u64),
    Binary(Vec<u8>),
    /// Anything else a caller passed through (e.g. a JSON object)
    Other(serde_json::Value),
}

impl From<&str> for MemoValue {
    fn from(value: &str) -> Self {
        MemoValue::Text(value.to_string())
    }
}

impl From<String> for MemoValue {
    fn from(value: String) -> Self {
        MemoValue::Text(value)
    }
}

impl From<u64> for MemoValue {
    fn from(value: u64) -> Self {
        MemoValue::Number(value)
    }
}

impl From<Vec<u8>> for MemoValue {
    fn from(value: Vec<u8>) -> Self {
        MemoValue::Binary(value)
    }
}

impl From<serde_json::Value> for MemoValue {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(s) => MemoValue::Text(s),
            serde_json::Value::Number(ref n) => match n.as_u64() {
                Some(id) => MemoValue::Number(id),
                None => MemoValue::Other(value),
            },
            serde_json::Value::Array(ref items) => {
                let bytes: Option<Vec<u8>> = items
                    .iter()
                    .map(|v| v.as_u64().and_then(|b| u8::try_from(b).ok()))
                    .collect();
                match bytes {
                    Some(bytes) => MemoValue::Binary(bytes),
                    None => MemoValue::Other(value),
                }
            }
            other => MemoValue::Other(other),
        }
    }
}

/// Map a memo value onto a ledger memo.
///
/// text → text memo, number → id memo, 32 bytes → hash memo, any other
/// binary → base64 return memo; everything else is rejected.
pub fn validate_memo(value: MemoValue) -> Result<Memo, MemoError> {
    match value {
        MemoValue::Text(text) => {
            if text.len() > MAX_TEXT_MEMO_LEN {
                return Err(MemoError::Invalid(format!(
                    "text memo is {} bytes, limit is {}",
                    text.len(),
                    MAX_TEXT_MEMO_LEN
                )));
            }
            Ok(Memo::Text(text))
        }
        MemoValue::Number(id) => Ok(Memo::Id(id)),
        MemoValue::Binary(bytes) if bytes.len() == HASH_MEMO_LEN => {
            Ok(Memo::Hash(hex::encode(bytes)))
        }
        MemoValue::Binary(bytes) => Ok(Memo::Return(BASE64.encode(bytes))),
        MemoValue::Other(value) => Err(MemoError::Invalid(format!(
            "unsupported memo value {}",
            value
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_memo() {
        assert_eq!(
            validate_memo("hello".into()).unwrap(),
            Memo::Text("hello".to_string())
        );
    }

    #[test]
    fn test_id_memo() {
        assert_eq!(validate_memo(42u64.into()).unwrap(), Memo::Id(42));
    }

    #[test]
    fn test_hash_memo() {
        let memo = validate_memo(vec![7u8; 32].into()).unwrap();
        assert_eq!(memo, Memo::Hash(hex::encode([7u8; 32])));
    }

    #[test]
    fn test_return_memo() {
        let bytes = vec![1u8, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let memo = validate_memo(bytes.clone().into()).unwrap();
        assert_eq!(memo, Memo::Return(BASE64.encode(bytes)));
    }

    #[test]
    fn test_invalid_memo() {
        let result = validate_memo(serde_json::json!({ "memo": true }).into());
        assert!(matches!(result, Err(MemoError::Invalid(_))));

        let result = validate_memo(serde_json::json!(-3).into());
        assert!(result.is_err());

        let result = validate_memo("this text is definitely longer than allowed".into());
        assert!(result.is_err());
    }

    #[test]
    fn test_json_inputs() {
        assert_eq!(
            MemoValue::from(serde_json::json!("hi")),
            MemoValue::Text("hi".to_string())
        );
        assert_eq!(MemoValue::from(serde_json::json!(9)), MemoValue::Number(9));
        assert_eq!(
            MemoValue::from(serde_json::json!([1, 2, 3])),
            MemoValue::Binary(vec![1, 2, 3])
        );
        assert!(matches!(
            MemoValue::from(serde_json::json!([1, 300])),
            MemoValue::Other(_)
        ));
    }
}
