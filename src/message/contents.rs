use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Treat an explicit `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a millisecond count that may be negative or fractional.
/// Negative values clamp to 0, fractions round to the nearest millisecond.
fn clamped_millis<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let ms = f64::deserialize(deserializer)?;
    if !ms.is_finite() || ms <= 0.0 {
        return Ok(0);
    }
    Ok(ms.round() as u64)
}

/// One item of an `instruction` message: `{"instruction": "<name>", ...arguments}`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    pub instruction: String,

    /// Instruction-specific arguments (e.g. `value`, `topic`, `config`)
    #[serde(flatten)]
    pub arguments: Map<String, Value>,
}

impl Instruction {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            instruction: name.into(),
            arguments: Map::new(),
        }
    }

    /// Builder-style argument setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn argument(&self, key: &str) -> Option<&Value> {
        self.arguments.get(key)
    }
}

/// Contents of a `status` message.
///
/// The back-end reports devices as `{id, connection, status}`. Clients
/// report their own components as a flat map, identified by the envelope
/// sender. An object with an `id` key is always a device report.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusContents {
    Device(DeviceStatus),
    Components(Map<String, Value>),
}

impl<'de> Deserialize<'de> for StatusContents {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        if !map.contains_key("id") {
            return Ok(StatusContents::Components(map));
        }
        serde_json::from_value(Value::Object(map))
            .map(StatusContents::Device)
            .map_err(de::Error::custom)
    }
}

/// Device status report, possibly partial
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatus {
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<bool>,

    /// Component id → arbitrary status value
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionContents {
    pub connection: bool,
}

/// One item of an `event status` message: the puzzle id plus the fields
/// that changed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PuzzleStatus {
    pub id: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Timer state as named on the wire
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerState {
    #[default]
    #[serde(rename = "stateIdle")]
    Idle,
    #[serde(rename = "stateActive")]
    Active,
    #[serde(rename = "statePaused")]
    Paused,
    #[serde(rename = "stateFinished", alias = "stateExpired")]
    Finished,
}

/// Full timer record carried by `time` messages
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerRecord {
    pub id: String,

    /// Remaining time in milliseconds
    #[serde(deserialize_with = "clamped_millis")]
    pub duration: u64,

    pub state: TimerState,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CameraDescriptor {
    pub name: String,
    pub link: String,
}

/// Contents of a `setup` message, also the shape of the startup setup document
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupContents {
    /// Room name
    #[serde(default)]
    pub name: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub cameras: Vec<CameraDescriptor>,

    /// Puzzle (rule) id → rule description
    #[serde(default, deserialize_with = "null_as_default")]
    pub events: BTreeMap<String, String>,

    /// Puzzle name → predefined hints
    #[serde(default, deserialize_with = "null_as_default")]
    pub hints: BTreeMap<String, Vec<String>>,
}

/// Result of a configuration check by the back-end
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigReport {
    #[serde(default, deserialize_with = "null_as_default")]
    pub errors: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewConfigNotice {
    pub name: String,
}

/// A device confirming that it carried out an instruction message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Confirmation {
    #[serde(default)]
    pub completed: bool,

    pub instructed: InstructedMessage,
}

/// The instruction message being confirmed
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InstructedMessage {
    #[serde(default, alias = "device_id", skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub contents: Vec<Instruction>,
}
