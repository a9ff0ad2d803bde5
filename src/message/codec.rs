use super::{Body, Envelope, MessageType};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Placeholder logged instead of full configuration contents
pub const REDACTED_CONFIG: &str = "contents too long to print";

/// Timestamp layouts used by the back-end and the device library
const LEGACY_TIMESTAMP_FORMATS: [&str; 2] = ["%d-%m-%Y %H:%M:%S", "%d-%m-%YT%H:%M:%S"];

/// Decoding errors for inbound envelopes
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// Payload is not a JSON object of the envelope shape
    Malformed(String),
    MissingType,
    UnknownType(String),
    InvalidTimestamp(String),
    InvalidContents {
        message_type: MessageType,
        reason: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Malformed(reason) => write!(f, "malformed envelope: {}", reason),
            DecodeError::MissingType => write!(f, "envelope has no type"),
            DecodeError::UnknownType(t) => write!(f, "invalid message type '{}'", t),
            DecodeError::InvalidTimestamp(ts) => write!(f, "invalid timestamp {}", ts),
            DecodeError::InvalidContents {
                message_type,
                reason,
            } => write!(f, "invalid contents for '{}': {}", message_type, reason),
        }
    }
}

impl std::error::Error for DecodeError {}

/// Inbound wire shape, before the contents are interpreted
#[derive(Deserialize)]
struct RawEnvelope {
    #[serde(alias = "device_id")]
    sender: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(alias = "time_sent")]
    timestamp: Value,
    #[serde(default)]
    contents: Value,
}

/// Outbound wire shape
#[derive(Serialize)]
struct WireEnvelope<'a> {
    sender: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    timestamp: DateTime<Utc>,
    contents: Value,
}

impl<'a> WireEnvelope<'a> {
    fn from_envelope(envelope: &'a Envelope) -> serde_json::Result<Self> {
        Ok(Self {
            sender: &envelope.sender,
            kind: envelope.message_type().as_str(),
            timestamp: envelope.timestamp,
            contents: contents_value(&envelope.body)?,
        })
    }
}

fn contents_value(body: &Body) -> serde_json::Result<Value> {
    match body {
        Body::Instruction(items) => serde_json::to_value(items),
        Body::Status(status) => serde_json::to_value(status),
        Body::Connection(connection) => serde_json::to_value(connection),
        Body::EventStatus(items) => serde_json::to_value(items),
        Body::Time(timer) => serde_json::to_value(timer),
        Body::Setup(setup) => serde_json::to_value(setup),
        Body::Config(report) => serde_json::to_value(report),
        Body::NewConfig(notice) => serde_json::to_value(notice),
        Body::Confirmation(confirmation) => serde_json::to_value(confirmation),
    }
}

/// Serialize an envelope to its JSON wire form
pub fn encode(envelope: &Envelope) -> serde_json::Result<Vec<u8>> {
    serde_json::to_vec(&WireEnvelope::from_envelope(envelope)?)
}

/// Parse a JSON payload into a typed envelope.
///
/// The type tag is resolved first; contents are then decoded into the
/// variant that tag names, so a payload can never be read as the wrong
/// shape.
pub fn decode(bytes: &[u8]) -> Result<Envelope, DecodeError> {
    let raw: RawEnvelope =
        serde_json::from_slice(bytes).map_err(|e| DecodeError::Malformed(e.to_string()))?;

    let kind = raw.kind.ok_or(DecodeError::MissingType)?;
    let message_type = MessageType::parse(&kind).ok_or(DecodeError::UnknownType(kind))?;
    let timestamp = parse_timestamp(&raw.timestamp)?;

    let body = match message_type {
        MessageType::Instruction => Body::Instruction(contents(message_type, raw.contents)?),
        MessageType::Status => Body::Status(contents(message_type, raw.contents)?),
        MessageType::Connection => Body::Connection(contents(message_type, raw.contents)?),
        MessageType::EventStatus => Body::EventStatus(contents(message_type, raw.contents)?),
        MessageType::Time => Body::Time(contents(message_type, raw.contents)?),
        MessageType::Setup => Body::Setup(contents(message_type, raw.contents)?),
        MessageType::Config => Body::Config(contents(message_type, raw.contents)?),
        MessageType::NewConfig => Body::NewConfig(contents(message_type, raw.contents)?),
        MessageType::Confirmation => Body::Confirmation(contents(message_type, raw.contents)?),
    };

    Ok(Envelope {
        sender: raw.sender,
        timestamp,
        body,
    })
}

fn contents<T: DeserializeOwned>(message_type: MessageType, value: Value) -> Result<T, DecodeError> {
    serde_json::from_value(value).map_err(|e| DecodeError::InvalidContents {
        message_type,
        reason: e.to_string(),
    })
}

/// Accepts RFC 3339 strings, epoch milliseconds, and the legacy
/// `dd-mm-YYYY HH:MM:SS` layout (read as UTC).
fn parse_timestamp(value: &Value) -> Result<DateTime<Utc>, DecodeError> {
    match value {
        Value::String(s) => {
            if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
                return Ok(ts.with_timezone(&Utc));
            }
            LEGACY_TIMESTAMP_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                .map(|naive| naive.and_utc())
                .ok_or_else(|| DecodeError::InvalidTimestamp(s.clone()))
        }
        Value::Number(n) => n
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(|| DecodeError::InvalidTimestamp(n.to_string())),
        other => Err(DecodeError::InvalidTimestamp(other.to_string())),
    }
}

/// Render an envelope for logging.
///
/// Instruction messages carrying a `config` argument have their contents
/// replaced by a placeholder. Only the rendering is affected.
pub fn redacted(envelope: &Envelope) -> String {
    let mut wire = match WireEnvelope::from_envelope(envelope) {
        Ok(wire) => wire,
        Err(e) => return format!("<unrenderable {} message: {}>", envelope.message_type(), e),
    };

    if let Body::Instruction(items) = &envelope.body {
        if items.iter().any(|item| item.arguments.contains_key("config")) {
            wire.contents = json!({ "config": REDACTED_CONFIG });
        }
    }

    serde_json::to_string(&wire)
        .unwrap_or_else(|e| format!("<unrenderable {} message: {}>", envelope.message_type(), e))
}
