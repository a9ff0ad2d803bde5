use super::entity::{Device, Hint, Keyed, Puzzle, Timer};
use crate::message::{DeviceStatus, PuzzleStatus, TimerRecord};
use serde_json::Map;
use std::collections::{BTreeMap, HashMap};

/// Keyed collection that iterates in insertion order.
///
/// Overwriting an existing key keeps its position.
#[derive(Clone, Debug)]
pub struct Store<T> {
    entries: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T: Keyed + Clone> Store<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Copy of the entity with this key
    pub fn get(&self, key: &str) -> Option<T> {
        self.index.get(key).map(|&i| self.entries[i].clone())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn get_mut(&mut self, key: &str) -> Option<&mut T> {
        match self.index.get(key) {
            Some(&i) => Some(&mut self.entries[i]),
            None => None,
        }
    }

    /// Insert or overwrite; returns the previous value
    pub fn insert(&mut self, entity: T) -> Option<T> {
        match self.index.get(entity.key()) {
            Some(&i) => Some(std::mem::replace(&mut self.entries[i], entity)),
            None => {
                self.index.insert(entity.key().to_string(), self.entries.len());
                self.entries.push(entity);
                None
            }
        }
    }

    /// Discard every entity and load the given ones
    pub fn replace_all(&mut self, entities: impl IntoIterator<Item = T>) {
        self.entries.clear();
        self.index.clear();
        for entity in entities {
            self.insert(entity);
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub(crate) fn all_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Keyed + Clone> Default for Store<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Devices seen during this session
#[derive(Clone, Debug, Default)]
pub struct Devices {
    store: Store<Device>,
}

impl Devices {
    pub fn get(&self, id: &str) -> Option<Device> {
        self.store.get(id)
    }

    /// Merge a (possibly partial) status report.
    ///
    /// Known devices only get the supplied status fields and, when present,
    /// the connection flag. Unknown devices are created from the report.
    pub fn upsert(&mut self, update: DeviceStatus) {
        match self.store.get_mut(&update.id) {
            Some(device) => {
                for (component, value) in update.status {
                    device.status.insert(component, value);
                }
                if let Some(connection) = update.connection {
                    device.connection = connection;
                }
            }
            None => {
                self.store.insert(Device {
                    id: update.id,
                    connection: update.connection.unwrap_or(false),
                    status: update.status,
                });
            }
        }
    }

    pub fn set_connection_all(&mut self, connection: bool) {
        for device in self.store.all_mut() {
            device.connection = connection;
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Device> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

/// Puzzles of the active room configuration
#[derive(Clone, Debug, Default)]
pub struct Puzzles {
    store: Store<Puzzle>,
}

impl Puzzles {
    pub fn get(&self, id: &str) -> Option<Puzzle> {
        self.store.get(id)
    }

    /// Rebuild the puzzle set from a rule id → description mapping
    pub fn replace_all(&mut self, rules: &BTreeMap<String, String>) {
        self.store
            .replace_all(rules.iter().map(|(id, description)| Puzzle {
                id: id.clone(),
                description: description.clone(),
                status: Map::new(),
            }));
    }

    /// Merge event-status fields into a known puzzle.
    /// Returns false when the puzzle is not part of the current setup.
    pub fn merge(&mut self, update: PuzzleStatus) -> bool {
        match self.store.get_mut(&update.id) {
            Some(puzzle) => {
                for (field, value) in update.fields {
                    puzzle.status.insert(field, value);
                }
                true
            }
            None => false,
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Puzzle> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Timers {
    store: Store<Timer>,
}

impl Timers {
    pub fn get(&self, id: &str) -> Option<Timer> {
        self.store.get(id)
    }

    /// Replace the named timer's record
    pub fn upsert(&mut self, record: TimerRecord) {
        self.store.insert(Timer::from(record));
    }

    pub(crate) fn set(&mut self, timer: Timer) {
        self.store.insert(timer);
    }

    pub(crate) fn tick(&mut self, quantum_ms: u64) {
        for timer in self.store.all_mut() {
            timer.tick(quantum_ms);
        }
    }

    pub fn all(&self) -> impl Iterator<Item = &Timer> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Hints {
    store: Store<Hint>,
}

impl Hints {
    /// Predefined hints for one puzzle
    pub fn for_puzzle(&self, puzzle: &str) -> Option<Vec<String>> {
        self.store.get(puzzle).map(|hint| hint.hints)
    }

    pub fn replace_all(&mut self, hints: &BTreeMap<String, Vec<String>>) {
        self.store
            .replace_all(hints.iter().map(|(puzzle, hints)| Hint {
                puzzle: puzzle.clone(),
                hints: hints.clone(),
            }));
    }

    pub fn all(&self) -> impl Iterator<Item = &Hint> {
        self.store.all()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
