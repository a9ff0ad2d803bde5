use chrono::{DateTime, Utc};
use std::fmt;

mod codec;
mod contents;
#[cfg(test)]
mod tests;

pub use codec::{decode, encode, redacted, DecodeError, REDACTED_CONFIG};
pub use contents::{
    CameraDescriptor, Confirmation, ConfigReport, ConnectionContents, DeviceStatus,
    InstructedMessage, Instruction, NewConfigNotice, PuzzleStatus, SetupContents,
    StatusContents, TimerRecord, TimerState,
};

/// Envelope is the wire-level unit exchanged with the back-end.
///
/// The `type` tag on the wire is carried by the `Body` variant, so an
/// envelope can only ever hold contents matching its type.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    /// Identity of the producing client (e.g. "front-end", "back-end")
    pub sender: String,

    /// Producer time
    pub timestamp: DateTime<Utc>,

    /// Typed contents
    pub body: Body,
}

impl Envelope {
    /// Create an envelope stamped with the current time
    pub fn new(sender: impl Into<String>, body: Body) -> Self {
        Self {
            sender: sender.into(),
            timestamp: Utc::now(),
            body,
        }
    }

    pub fn message_type(&self) -> MessageType {
        self.body.message_type()
    }
}

/// Message contents, one variant per recognized message type.
#[derive(Clone, Debug, PartialEq)]
pub enum Body {
    Instruction(Vec<Instruction>),
    Status(StatusContents),
    Connection(ConnectionContents),
    EventStatus(Vec<PuzzleStatus>),
    Time(TimerRecord),
    Setup(SetupContents),
    Config(ConfigReport),
    NewConfig(NewConfigNotice),
    Confirmation(Confirmation),
}

impl Body {
    pub fn message_type(&self) -> MessageType {
        match self {
            Body::Instruction(_) => MessageType::Instruction,
            Body::Status(_) => MessageType::Status,
            Body::Connection(_) => MessageType::Connection,
            Body::EventStatus(_) => MessageType::EventStatus,
            Body::Time(_) => MessageType::Time,
            Body::Setup(_) => MessageType::Setup,
            Body::Config(_) => MessageType::Config,
            Body::NewConfig(_) => MessageType::NewConfig,
            Body::Confirmation(_) => MessageType::Confirmation,
        }
    }
}

/// The `type` tag of an envelope
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    Instruction,
    Status,
    Connection,
    EventStatus,
    Time,
    Setup,
    Config,
    NewConfig,
    Confirmation,
}

impl MessageType {
    pub const ALL: [MessageType; 9] = [
        MessageType::Instruction,
        MessageType::Status,
        MessageType::Connection,
        MessageType::EventStatus,
        MessageType::Time,
        MessageType::Setup,
        MessageType::Config,
        MessageType::NewConfig,
        MessageType::Confirmation,
    ];

    /// Wire name of the type tag
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Instruction => "instruction",
            MessageType::Status => "status",
            MessageType::Connection => "connection",
            MessageType::EventStatus => "event status",
            MessageType::Time => "time",
            MessageType::Setup => "setup",
            MessageType::Config => "config",
            MessageType::NewConfig => "new config",
            MessageType::Confirmation => "confirmation",
        }
    }

    /// Look up a type tag by its wire name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
