//! Typed reply conversion
//!
//! The protocol core only ever returns the raw `result` value of a reply.
//! Anything that can be built from that value implements [`FromReply`];
//! every `serde` deserializable type does so automatically.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::Result;

/// Construct a value from a raw device reply
pub trait FromReply: Sized {
    fn from_reply(value: Value) -> Result<Self>;
}

impl<T: DeserializeOwned> FromReply for T {
    fn from_reply(value: Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Status {
        power: String,
        temperature: f64,
    }

    #[test]
    fn test_from_reply_struct() {
        let status = Status::from_reply(json!({"power": "on", "temperature": 21.5})).unwrap();
        assert_eq!(
            status,
            Status {
                power: "on".into(),
                temperature: 21.5
            }
        );
    }

    #[test]
    fn test_from_reply_list() {
        let values = Vec::<String>::from_reply(json!(["on", "off"])).unwrap();
        assert_eq!(values, vec!["on", "off"]);
    }

    #[test]
    fn test_from_reply_mismatch() {
        let result = Status::from_reply(json!(["on"]));
        assert!(matches!(result, Err(crate::Error::Parse(_))));
    }
}
