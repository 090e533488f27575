//! JSON-RPC 2.0 envelopes and hex-quantity helpers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::RpcError;

#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

impl<'a> Request<'a> {
    pub(crate) fn new(id: u64, method: &'a str, params: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Response {
    #[serde(default)]
    id: Value,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<ErrorObject>,
}

impl Response {
    pub(crate) fn id(&self) -> Option<u64> {
        match &self.id {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }

    pub(crate) fn into_result(self) -> Result<Value, RpcError> {
        match self.error {
            Some(error) => Err(RpcError::Response {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            None => Ok(self.result.unwrap_or(Value::Null)),
        }
    }
}

/// Parses a `0x`-prefixed hex quantity.
pub fn parse_quantity(value: &Value) -> Result<u128, RpcError> {
    let text = value
        .as_str()
        .ok_or_else(|| RpcError::Decode(format!("expected hex quantity, got {}", value)))?;
    let digits = text
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Decode(format!("quantity without 0x prefix: {}", text)))?;
    if digits.is_empty() {
        return Ok(0);
    }
    u128::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Decode(format!("bad quantity {}: {}", text, e)))
}

/// Formats a number as a hex quantity.
pub fn to_quantity(value: u128) -> String {
    format!("{:#x}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quantities() {
        assert_eq!(parse_quantity(&json!("0x5208")).unwrap(), 21_000);
        assert_eq!(parse_quantity(&json!("0x0")).unwrap(), 0);
        assert_eq!(parse_quantity(&json!("0x")).unwrap(), 0);
        assert!(parse_quantity(&json!("5208")).is_err());
        assert!(parse_quantity(&json!(5208)).is_err());
        assert_eq!(to_quantity(0), "0x0");
        assert_eq!(to_quantity(21_000), "0x5208");
    }

    #[test]
    fn test_response_error() {
        let response: Response = serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": 7,
            "error": { "code": 3, "message": "execution reverted", "data": "0x" }
        }))
        .unwrap();
        assert_eq!(response.id(), Some(7));
        match response.into_result() {
            Err(RpcError::Response { code, message, .. }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "execution reverted");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_null_result() {
        let response: Response =
            serde_json::from_value(json!({ "jsonrpc": "2.0", "id": "1", "result": null })).unwrap();
        assert_eq!(response.id(), Some(1));
        assert_eq!(response.into_result().unwrap(), Value::Null);
    }
}
