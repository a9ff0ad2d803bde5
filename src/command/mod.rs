// Outbound command construction and publishing

pub mod instructions;

use crate::message::{
    encode, redacted, Body, ConnectionContents, Envelope, Instruction, StatusContents,
};
use crate::transport::Transport;
use serde_json::{Map, Value};
use tracing::{error, info, warn};

/// An outbound request, before it is wrapped in an envelope
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Instruction(Vec<Instruction>),
    Status { start: Value, stop: Value },
    Connection(bool),
}

/// Builds envelopes on behalf of this client and publishes them on the
/// outbound topic.
#[derive(Clone, Debug)]
pub struct CommandBuilder {
    client_id: String,
    outbound_topic: String,
}

impl CommandBuilder {
    pub fn new(client_id: impl Into<String>, outbound_topic: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            outbound_topic: outbound_topic.into(),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn outbound_topic(&self) -> &str {
        &self.outbound_topic
    }

    pub fn build_instruction(&self, instructions: Vec<Instruction>) -> Envelope {
        Envelope::new(&self.client_id, Body::Instruction(instructions))
    }

    pub fn build_status(&self, start: impl Into<Value>, stop: impl Into<Value>) -> Envelope {
        let mut components = Map::new();
        components.insert("start".to_string(), start.into());
        components.insert("stop".to_string(), stop.into());
        Envelope::new(&self.client_id, Body::Status(StatusContents::Components(components)))
    }

    pub fn build_connection(&self, connected: bool) -> Envelope {
        Envelope::new(
            &self.client_id,
            Body::Connection(ConnectionContents {
                connection: connected,
            }),
        )
    }

    pub fn build(&self, command: Command) -> Envelope {
        match command {
            Command::Instruction(instructions) => self.build_instruction(instructions),
            Command::Status { start, stop } => self.build_status(start, stop),
            Command::Connection(connected) => self.build_connection(connected),
        }
    }

    /// Encode and publish an envelope on the outbound topic.
    ///
    /// Best effort: failures are logged and the message is dropped.
    /// Returns whether the transport accepted the payload.
    pub async fn publish<T>(&self, transport: &T, envelope: &Envelope) -> bool
    where
        T: Transport + ?Sized,
    {
        let payload = match encode(envelope) {
            Ok(payload) => payload,
            Err(e) => {
                error!(
                    message_type = %envelope.message_type(),
                    error = %e,
                    "Failed to encode outbound message"
                );
                return false;
            }
        };

        if let Err(e) = transport.publish(&self.outbound_topic, payload).await {
            warn!(
                topic = %self.outbound_topic,
                message_type = %envelope.message_type(),
                error = %e,
                "Publish failed, message lost"
            );
            return false;
        }

        info!(
            topic = %self.outbound_topic,
            "sent {} message: {}",
            envelope.message_type(),
            redacted(envelope)
        );
        true
    }
}
