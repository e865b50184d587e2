//! Plaintext request/response envelopes

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::Result;

/// Request envelope
///
/// ```text
/// {"id": 1, "method": "get_prop", "params": ["power"], ...extra}
/// ```
///
/// # Examples
///
/// ```
/// use miio_core::Request;
/// use serde_json::json;
///
/// let request = Request::new(1, "get_prop", json!(["power"]));
/// assert_eq!(
///     serde_json::to_string(&request).unwrap(),
///     r#"{"id":1,"method":"get_prop","params":["power"]}"#
/// );
/// ```
///
/// An extra field named `id`, `method` or `params` replaces the base field
/// on the wire.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    /// Sequence id
    pub id: u32,

    /// Method name
    pub method: String,

    /// Method parameters (array or object)
    pub params: Value,

    /// Extra top-level fields some device families expect next to the method
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Request {
    /// Create a request; `null` params become an empty list
    pub fn new(id: u32, method: impl Into<String>, params: Value) -> Self {
        let params = match params {
            Value::Null => Value::Array(Vec::new()),
            other => other,
        };

        Self {
            id,
            method: method.into(),
            params,
            extra: Map::new(),
        }
    }

    /// Attach extra top-level fields
    pub fn with_extra(mut self, extra: Map<String, Value>) -> Self {
        self.extra.extend(extra);
        self
    }
}

impl Serialize for Request {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;

        if !self.extra.contains_key("id") {
            map.serialize_entry("id", &self.id)?;
        }
        if !self.extra.contains_key("method") {
            map.serialize_entry("method", &self.method)?;
        }
        if !self.extra.contains_key("params") {
            map.serialize_entry("params", &self.params)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }

        map.end()
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request[{}]({}, params={})", self.id, self.method, self.params)
    }
}

/// Error object reported by a device
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceErrorObject {
    #[serde(default)]
    pub code: i64,

    #[serde(default)]
    pub message: String,
}

impl fmt::Display for DeviceErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code)
    }
}

/// Outcome carried by a response
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// `result` field, or the whole body when a device omits the wrapper
    Result(Value),

    /// `error` object
    Error(DeviceErrorObject),
}

/// Response envelope
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Id echoed by the device, if any
    pub id: Option<u32>,

    pub reply: Reply,
}

impl Response {
    /// Interpret a decoded body
    ///
    /// # Examples
    ///
    /// ```
    /// use miio_core::{Reply, Response};
    /// use serde_json::json;
    ///
    /// let response = Response::from_value(json!({"id": 3, "result": ["on"]})).unwrap();
    /// assert_eq!(response.id, Some(3));
    /// assert_eq!(response.reply, Reply::Result(json!(["on"])));
    /// ```
    pub fn from_value(mut body: Value) -> Result<Self> {
        let id = body
            .get("id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok());

        let reply = match body.get_mut("error").map(Value::take) {
            Some(Value::String(message)) => Reply::Error(DeviceErrorObject { code: 0, message }),
            Some(error) => Reply::Error(serde_json::from_value(error)?),
            None => match body.get_mut("result").map(Value::take) {
                Some(result) => Reply::Result(result),
                None => Reply::Result(body),
            },
        };

        Ok(Self { id, reply })
    }

    /// Check if the device reported an error
    pub fn is_error(&self) -> bool {
        matches!(self.reply, Reply::Error(_))
    }
}
