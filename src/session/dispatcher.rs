use crate::command::{instructions, Command};
use crate::message::{
    Body, Confirmation, DeviceStatus, Envelope, Instruction, MessageType, StatusContents,
};
use crate::state::RoomState;
use serde_json::{json, Map};
use std::fmt;
use tracing::debug;

/// Side effect requested by a dispatched message.
///
/// The dispatcher only mutates room state; anything that talks to the
/// outside world is handed back to the session.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Show a message to the operator
    Notify(String),

    /// Publish a command to the back-end
    Send(Command),
}

/// A decoded envelope the client has no handling for
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Unhandled(pub MessageType);

impl fmt::Display for Unhandled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "received invalid message type {}", self.0)
    }
}

impl std::error::Error for Unhandled {}

/// Routes envelopes by type into the room state
#[derive(Clone, Debug)]
pub struct Dispatcher {
    /// This client's own device id
    client_id: String,

    /// Device id whose disconnect means the whole room is unreachable
    upstream_id: String,
}

impl Dispatcher {
    pub fn new(client_id: impl Into<String>, upstream_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            upstream_id: upstream_id.into(),
        }
    }

    /// Apply one envelope to the room. Runs to completion without I/O.
    pub fn dispatch(
        &self,
        room: &mut RoomState,
        envelope: Envelope,
    ) -> Result<Vec<Effect>, Unhandled> {
        let sender = envelope.sender;
        let mut effects = Vec::new();

        match envelope.body {
            Body::Confirmation(confirmation) => {
                self.confirmation(&sender, confirmation, &mut effects);
            }
            Body::Instruction(items) => {
                for item in items {
                    self.instruction(room, item, &mut effects);
                }
            }
            Body::Status(StatusContents::Device(status)) => {
                self.device_status(room, status);
            }
            Body::Status(StatusContents::Components(components)) => {
                // Client-style report: the sender is the device
                self.device_status(
                    room,
                    DeviceStatus {
                        id: sender,
                        connection: None,
                        status: components,
                    },
                );
            }
            Body::EventStatus(items) => {
                for item in items {
                    let id = item.id.clone();
                    if !room.puzzles_mut().merge(item) {
                        debug!(puzzle = %id, "Event status for unknown puzzle, skipping");
                    }
                }
            }
            Body::Time(record) => {
                room.timers_mut().upsert(record);
            }
            Body::Setup(setup) => {
                room.apply_setup(&setup);
            }
            Body::Config(report) => {
                room.set_config_errors(report.errors);
            }
            Body::NewConfig(notice) => {
                effects.push(Effect::Notify(format!("using new config: {}", notice.name)));
            }
            Body::Connection(_) => return Err(Unhandled(MessageType::Connection)),
        }

        Ok(effects)
    }

    fn confirmation(&self, sender: &str, confirmation: Confirmation, effects: &mut Vec<Effect>) {
        for item in confirmation.instructed.contents {
            effects.push(Effect::Notify(format!(
                "received confirmation from {} for instruction: {}",
                sender, item.instruction
            )));
        }
    }

    fn instruction(&self, room: &mut RoomState, item: Instruction, effects: &mut Vec<Effect>) {
        match item.instruction.as_str() {
            instructions::RESET => {
                let mut status = Map::new();
                status.insert("start".to_string(), json!(0));
                status.insert("stop".to_string(), json!(0));
                room.devices_mut().upsert(DeviceStatus {
                    id: self.client_id.clone(),
                    connection: Some(true),
                    status,
                });
            }
            instructions::STATUS_UPDATE => {
                effects.push(Effect::Send(Command::Connection(true)));
            }
            instructions::TEST => {
                effects.push(Effect::Notify("performing instruction test".to_string()));
            }
            // Instructions meant for other clients are ignored
            _ => {}
        }
    }

    fn device_status(&self, room: &mut RoomState, status: DeviceStatus) {
        let upstream_lost = status.id == self.upstream_id && status.connection == Some(false);
        room.devices_mut().upsert(status);

        if upstream_lost {
            debug!(upstream = %self.upstream_id, "Upstream link lost, marking all devices disconnected");
            room.devices_mut().set_connection_all(false);
        }
    }
}
