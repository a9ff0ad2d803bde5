use crate::message::Instruction;
use serde_json::Value;

/// Reset this client's own device entry
pub const RESET: &str = "reset";

/// Re-announce this client's connection
pub const STATUS_UPDATE: &str = "status update";

/// Diagnostic round trip
pub const TEST: &str = "test";

/// Ask the back-end for the room setup
pub fn send_setup() -> Instruction {
    Instruction::new("send setup")
}

/// Ask the back-end to re-broadcast all device statuses
pub fn send_status() -> Instruction {
    Instruction::new("send status")
}

/// Send a hint text to the devices listening on `topic`
pub fn hint(value: &str, topic: &str) -> Instruction {
    Instruction::new("hint")
        .with("value", value)
        .with("topic", topic)
}

pub fn reset_all() -> Instruction {
    Instruction::new("reset all")
}

pub fn test_all() -> Instruction {
    Instruction::new("test all")
}

/// Have the back-end validate a configuration; it answers with `config`
pub fn check_config(config: Value) -> Instruction {
    Instruction::new("check config").with("config", config)
}

/// Switch the back-end to a configuration; it answers with `new config`
pub fn use_config(config: Value, file: &str) -> Instruction {
    Instruction::new("use config")
        .with("config", config)
        .with("file", file)
}
