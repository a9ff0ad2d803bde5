use super::{Transport, TransportEvent};
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// NATS configuration
#[derive(Clone, Debug, Deserialize)]
pub struct NatsConfig {
    #[serde(default = "default_url")]
    pub url: String,
    /// Connection name reported to the server
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_url() -> String {
    "nats://localhost:4222".to_string()
}

fn default_client_name() -> String {
    "roomsync".to_string()
}

impl Default for NatsConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            client_name: default_client_name(),
        }
    }
}

/// NATS-backed transport.
///
/// Inbound messages and connection lifecycle changes are forwarded into
/// the session channel as `TransportEvent`s.
pub struct NatsTransport {
    client: async_nats::Client,
    forwarders: Vec<JoinHandle<()>>,
}

impl NatsTransport {
    /// Connect to NATS and subscribe to the inbound topics
    pub async fn connect<E>(
        config: &NatsConfig,
        topics: &[String],
        events: mpsc::Sender<E>,
    ) -> Result<Self>
    where
        E: From<TransportEvent> + Send + Sync + 'static,
    {
        info!("Connecting to NATS at {}", config.url);

        let lifecycle = events.clone();
        let client = async_nats::ConnectOptions::new()
            .name(&config.client_name)
            .event_callback(move |event| {
                let lifecycle = lifecycle.clone();
                async move {
                    let mapped = match event {
                        async_nats::Event::Connected => TransportEvent::Connected,
                        async_nats::Event::Disconnected => TransportEvent::Offline,
                        other => {
                            debug!(event = %other, "NATS client event");
                            return;
                        }
                    };
                    let _ = lifecycle.send(E::from(mapped)).await;
                }
            })
            .connect(&config.url)
            .await
            .context("Failed to connect to NATS")?;

        let mut forwarders = Vec::with_capacity(topics.len());
        for topic in topics {
            let mut subscriber = client
                .subscribe(topic.clone())
                .await
                .with_context(|| format!("Failed to subscribe to topic '{}'", topic))?;
            info!(topic = %topic, "Subscribed to topic");

            let inbound = events.clone();
            let topic = topic.clone();
            forwarders.push(tokio::spawn(async move {
                while let Some(message) = subscriber.next().await {
                    let event = TransportEvent::Message {
                        topic: message.subject.to_string(),
                        payload: message.payload.to_vec(),
                    };
                    if inbound.send(E::from(event)).await.is_err() {
                        break;
                    }
                }
                warn!(topic = %topic, "Subscription stream ended");
            }));
        }

        // Duplicates of a connect event already seen are ignored downstream
        let _ = events.send(E::from(TransportEvent::Connected)).await;

        Ok(Self { client, forwarders })
    }
}

#[async_trait]
impl Transport for NatsTransport {
    async fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<()> {
        self.client
            .publish(topic.to_string(), payload.into())
            .await
            .with_context(|| format!("Failed to publish to subject '{}'", topic))
    }

    async fn close(&self) -> Result<()> {
        self.client
            .flush()
            .await
            .context("Failed to flush NATS client")
    }
}

impl Drop for NatsTransport {
    fn drop(&mut self) {
        for forwarder in &self.forwarders {
            forwarder.abort();
        }
    }
}
