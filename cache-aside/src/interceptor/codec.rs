//! Payload encoding

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Bytes written for a `None` result.
///
/// Starts with a NUL byte, which no JSON document can, so it never collides
/// with an encoded value.
pub const EMPTY_MARKER: &[u8] = b"\0cache-aside:empty";

/// Turns results into stored bytes and back
pub trait Codec: Send + Sync {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, String>;
    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, String>;
}

/// JSON via `serde_json`
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, String> {
        serde_json::to_vec(value).map_err(|e| e.to_string())
    }

    fn decode<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, String> {
        serde_json::from_slice(bytes).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn test_json_codec() {
        let user = User {
            id: 7,
            name: "alice".to_string(),
        };
        let bytes = JsonCodec.encode(&user).unwrap();
        assert_eq!(bytes, br#"{"id":7,"name":"alice"}"#.to_vec());
        assert_eq!(JsonCodec.decode::<User>(&bytes).unwrap(), user);
    }

    #[test]
    fn test_empty_marker_is_not_json() {
        assert!(JsonCodec.decode::<serde_json::Value>(EMPTY_MARKER).is_err());
        assert!(JsonCodec.decode::<User>(b"not json").is_err());
    }
}
