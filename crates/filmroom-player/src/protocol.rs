//! Wire format of the player's IPC endpoint.
//!
//! Every message is one JSON object followed by `\n`. Requests carry a
//! `request_id`; responses echo it. Spontaneous events carry an `event`
//! name and no `request_id`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{PlayerError, PlayerResult};

/// The `error` value of a successful response.
pub const SUCCESS: &str = "success";

#[derive(Debug, Serialize)]
struct Request<'a> {
    command: &'a [Value],
    request_id: u64,
}

/// Encode a command as one framed line, newline included.
pub fn encode(command: &[Value], request_id: u64) -> PlayerResult<String> {
    let mut line = serde_json::to_string(&Request {
        command,
        request_id,
    })
    .map_err(|e| PlayerError::Wire(format!("cannot encode request: {e}")))?;
    line.push('\n');
    Ok(line)
}

/// A reply to a request.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Response {
    pub request_id: u64,
    #[serde(default = "success")]
    pub error: String,
    #[serde(default)]
    pub data: Value,
}

impl Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error == SUCCESS
    }
}

fn success() -> String {
    SUCCESS.to_string()
}

/// A spontaneous notification from the player (property changes,
/// playback state, and so on).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PlayerEvent {
    pub event: String,
    /// Observer id for `property-change` events.
    #[serde(default)]
    pub id: Option<u64>,
    /// Property name for `property-change` events.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub data: Value,
}

/// One decoded line from the stream.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Incoming {
    Response(Response),
    Event(PlayerEvent),
}

/// Decode one line.
///
/// Returns `Ok(None)` for well-formed JSON that is neither a response nor
/// an event; those are skipped. Anything that is not a JSON object is a
/// wire error.
pub fn decode(line: &str) -> PlayerResult<Option<Incoming>> {
    let value: Value = serde_json::from_str(line)
        .map_err(|e| PlayerError::Wire(format!("malformed message {line:?}: {e}")))?;
    if !value.is_object() {
        return Err(PlayerError::Wire(format!("expected a JSON object, got {line:?}")));
    }
    if value.get("request_id").is_none() && value.get("event").is_none() {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| PlayerError::Wire(format!("unrecognised message {line:?}: {e}")))
}

/// The `data` of a response, tagged by kind.
///
/// Properties come back as numbers, strings or booleans depending on the
/// property; callers convert with the `expect_*` methods, which fail with
/// [`PlayerError::UnexpectedType`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
    Other(Value),
}

impl PropertyValue {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Flag(_) => "boolean",
            Self::Number(_) => "number",
            Self::Text(_) => "string",
            Self::Other(_) => "structured value",
        }
    }

    pub fn expect_number(self, property: &str) -> PlayerResult<f64> {
        match self {
            Self::Number(n) => Ok(n),
            other => Err(other.mismatch(property, "number")),
        }
    }

    pub fn expect_text(self, property: &str) -> PlayerResult<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(other.mismatch(property, "string")),
        }
    }

    pub fn expect_flag(self, property: &str) -> PlayerResult<bool> {
        match self {
            Self::Flag(b) => Ok(b),
            other => Err(other.mismatch(property, "boolean")),
        }
    }

    /// A loop point: a number, or the string `"no"` when unset.
    pub fn expect_loop_point(self, property: &str) -> PlayerResult<Option<f64>> {
        match self {
            Self::Number(n) => Ok(Some(n)),
            Self::Text(s) if s == "no" => Ok(None),
            other => Err(other.mismatch(property, "number or \"no\"")),
        }
    }

    fn mismatch(&self, property: &str, expected: &'static str) -> PlayerError {
        PlayerError::UnexpectedType {
            property: property.to_string(),
            expected,
            found: self.kind(),
        }
    }
}

impl From<Value> for PropertyValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Flag(b),
            Value::Number(n) => n.as_f64().map_or(Self::Other(Value::Number(n)), Self::Number),
            Value::String(s) => Self::Text(s),
            other => Self::Other(other),
        }
    }
}
