use super::entity::{Camera, Device, Hint, Puzzle, Timer};
use super::store::{Devices, Hints, Puzzles, Timers};
use crate::message::SetupContents;
use serde::Serialize;
use tracing::info;

/// Id of the room-wide countdown timer
pub const GENERAL_TIMER: &str = "general";

/// Room name shown until the first setup arrives
pub const DEFAULT_ROOM_NAME: &str = "Escape room";

/// Everything the client knows about the room for one session.
///
/// Owned by the session loop; the timer engine and UI consumers never hold
/// a reference to it, they see it through `RoomSnapshot` copies.
#[derive(Clone, Debug)]
pub struct RoomState {
    name: String,
    devices: Devices,
    puzzles: Puzzles,
    timers: Timers,
    hints: Hints,
    cameras: Vec<Camera>,
    config_errors: Vec<String>,
    display_time: String,
    setup_complete: bool,
    ticks: u64,
}

impl RoomState {
    /// Fresh state: no devices, no setup, general timer at 0 and idle
    pub fn new() -> Self {
        let mut timers = Timers::default();
        timers.set(Timer::idle(GENERAL_TIMER));

        Self {
            name: DEFAULT_ROOM_NAME.to_string(),
            devices: Devices::default(),
            puzzles: Puzzles::default(),
            timers,
            hints: Hints::default(),
            cameras: Vec::new(),
            config_errors: Vec::new(),
            display_time: format_millis(0),
            setup_complete: false,
            ticks: 0,
        }
    }

    /// Full reconfiguration: room name, cameras, puzzles and hints are all
    /// replaced from one setup document.
    pub fn apply_setup(&mut self, setup: &SetupContents) {
        self.name = setup.name.clone();
        self.cameras = setup.cameras.iter().map(Camera::from).collect();
        self.puzzles.replace_all(&setup.events);
        self.hints.replace_all(&setup.hints);
        self.setup_complete = true;

        info!(
            room = %self.name,
            cameras = self.cameras.len(),
            puzzles = self.puzzles.len(),
            hints = self.hints.len(),
            "Applied room setup"
        );
    }

    /// Advance every timer by one tick and recompute the display time
    pub fn tick(&mut self, quantum_ms: u64) -> &str {
        self.timers.tick(quantum_ms);
        self.ticks += 1;
        let left = self
            .timers
            .get(GENERAL_TIMER)
            .map(|t| t.duration_ms)
            .unwrap_or(0);
        self.display_time = format_millis(left);
        &self.display_time
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn devices(&self) -> &Devices {
        &self.devices
    }

    pub fn devices_mut(&mut self) -> &mut Devices {
        &mut self.devices
    }

    pub fn puzzles(&self) -> &Puzzles {
        &self.puzzles
    }

    pub fn puzzles_mut(&mut self) -> &mut Puzzles {
        &mut self.puzzles
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn timers_mut(&mut self) -> &mut Timers {
        &mut self.timers
    }

    pub fn hints(&self) -> &Hints {
        &self.hints
    }

    pub fn cameras(&self) -> &[Camera] {
        &self.cameras
    }

    pub fn config_errors(&self) -> &[String] {
        &self.config_errors
    }

    pub fn set_config_errors(&mut self, errors: Vec<String>) {
        self.config_errors = errors;
    }

    pub fn display_time(&self) -> &str {
        &self.display_time
    }

    pub fn setup_complete(&self) -> bool {
        self.setup_complete
    }

    /// Number of ticks applied since this state was created
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Owned copy for UI consumers
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            name: self.name.clone(),
            devices: self.devices.all().cloned().collect(),
            puzzles: self.puzzles.all().cloned().collect(),
            timers: self.timers.all().cloned().collect(),
            hints: self.hints.all().cloned().collect(),
            cameras: self.cameras.clone(),
            config_errors: self.config_errors.clone(),
            display_time: self.display_time.clone(),
            setup_complete: self.setup_complete,
            ticks: self.ticks,
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of the room, in store insertion order
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct RoomSnapshot {
    pub name: String,
    pub devices: Vec<Device>,
    pub puzzles: Vec<Puzzle>,
    pub timers: Vec<Timer>,
    pub hints: Vec<Hint>,
    pub cameras: Vec<Camera>,
    pub config_errors: Vec<String>,
    pub display_time: String,
    pub setup_complete: bool,
    pub ticks: u64,
}

impl RoomSnapshot {
    pub fn device(&self, id: &str) -> Option<&Device> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn timer(&self, id: &str) -> Option<&Timer> {
        self.timers.iter().find(|t| t.id == id)
    }
}

/// Format a millisecond duration as `HH:MM:SS`, rounding partial seconds up
pub fn format_millis(ms: u64) -> String {
    let total_seconds = ms.div_ceil(1000);
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
}
