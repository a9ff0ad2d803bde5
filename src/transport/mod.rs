// Broker transport: the black-box duplex channel of topic + payload

mod nats;

pub use nats::{NatsConfig, NatsTransport};

use anyhow::Result;
use async_trait::async_trait;

/// Something that can publish raw payloads on a topic.
///
/// Publishing is best effort: an error means the message is lost, callers
/// log it and move on.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()>;

    /// Flush pending output before the link is released
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// What the transport reports back to the session
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// Link to the broker is (re)established
    Connected,

    /// Link to the broker is lost
    Offline,

    /// A message arrived on a subscribed topic
    Message { topic: String, payload: Vec<u8> },
}
