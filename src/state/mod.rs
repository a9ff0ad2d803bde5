// Entity stores and the per-session room context

mod entity;
mod room;
mod store;

pub use entity::{Camera, Device, Hint, Keyed, Puzzle, Timer};
pub use room::{format_millis, RoomSnapshot, RoomState, DEFAULT_ROOM_NAME, GENERAL_TIMER};
pub use store::{Devices, Hints, Puzzles, Store, Timers};

#[cfg(test)]
mod tests;
