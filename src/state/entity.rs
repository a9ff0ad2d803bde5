use crate::message::{CameraDescriptor, TimerRecord, TimerState};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Anything held in a keyed store
pub trait Keyed {
    fn key(&self) -> &str;
}

/// A device known to the room (client computer, the front-end itself, ...)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Unique device identifier (e.g. "telephone", "front-end")
    pub id: String,

    /// Whether the device is reachable through the broker
    pub connection: bool,

    /// Component id → last reported value
    pub status: Map<String, Value>,
}

impl Keyed for Device {
    fn key(&self) -> &str {
        &self.id
    }
}

/// A puzzle (rule) of the current room configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Puzzle {
    pub id: String,

    /// Human-readable rule description from the setup
    pub description: String,

    /// Event-status fields reported by the back-end
    pub status: Map<String, Value>,
}

impl Keyed for Puzzle {
    fn key(&self) -> &str {
        &self.id
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    pub id: String,

    /// Remaining time in milliseconds, never negative
    pub duration_ms: u64,

    pub state: TimerState,
}

impl Timer {
    pub fn idle(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            duration_ms: 0,
            state: TimerState::Idle,
        }
    }

    /// Advance by one tick: active timers lose `quantum_ms` (clamped at 0),
    /// and a run-down timer falls back to idle.
    pub fn tick(&mut self, quantum_ms: u64) {
        if self.state == TimerState::Active {
            self.duration_ms = self.duration_ms.saturating_sub(quantum_ms);
        }
        if self.duration_ms == 0 {
            self.state = TimerState::Idle;
        }
    }
}

impl From<TimerRecord> for Timer {
    fn from(record: TimerRecord) -> Self {
        Self {
            id: record.id,
            duration_ms: record.duration,
            state: record.state,
        }
    }
}

impl Keyed for Timer {
    fn key(&self) -> &str {
        &self.id
    }
}

/// Predefined hints for one puzzle
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub puzzle: String,
    pub hints: Vec<String>,
}

impl Keyed for Hint {
    fn key(&self) -> &str {
        &self.puzzle
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Camera {
    pub label: String,
    pub link: String,
}

impl From<&CameraDescriptor> for Camera {
    fn from(descriptor: &CameraDescriptor) -> Self {
        Self {
            label: descriptor.name.clone(),
            link: descriptor.link.clone(),
        }
    }
}
