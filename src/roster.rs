use rand::Rng;
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 40;

/// The three fixed recording points, in course order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, strum_macros::Display,
)]
pub enum CheckpointKey {
    Mile1,
    Mile2,
    Mile3,
}

pub const CHECKPOINT_KEYS: [CheckpointKey; 3] = [
    CheckpointKey::Mile1,
    CheckpointKey::Mile2,
    CheckpointKey::Mile3,
];

impl CheckpointKey {
    /// Name used in the persisted wire format ("mile1" etc.)
    pub fn wire_name(&self) -> String {
        self.to_string().to_lowercase()
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "mile1" => Some(CheckpointKey::Mile1),
            "mile2" => Some(CheckpointKey::Mile2),
            "mile3" => Some(CheckpointKey::Mile3),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    Empty,
    TooShort,
    TooLong,
    InvalidCharacters,
    Duplicate,
}

impl fmt::Display for NameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameError::Empty => write!(f, "name cannot be empty"),
            NameError::TooShort => write!(f, "name must be at least {} characters", MIN_NAME_LEN),
            NameError::TooLong => write!(f, "name must be at most {} characters", MAX_NAME_LEN),
            NameError::InvalidCharacters => {
                write!(f, "name may only contain letters, digits, spaces, and -'.")
            }
            NameError::Duplicate => write!(f, "a runner with this name already exists"),
        }
    }
}

impl std::error::Error for NameError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordError {
    TimerNotRunning,
    AlreadyRecorded,
    InvalidElapsedTime,
    UnknownParticipant,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::TimerNotRunning => write!(f, "start the timer before recording splits"),
            RecordError::AlreadyRecorded => write!(f, "this split has already been recorded"),
            RecordError::InvalidElapsedTime => write!(f, "elapsed time must be positive"),
            RecordError::UnknownParticipant => write!(f, "unknown runner"),
        }
    }
}

impl std::error::Error for RecordError {}

/// One timed runner. Splits are write-once per checkpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub id: String,
    pub name: String,
    pub splits: BTreeMap<CheckpointKey, i64>,
}

impl Participant {
    pub fn split(&self, key: CheckpointKey) -> Option<i64> {
        self.splits.get(&key).copied()
    }

    pub fn has_all_splits(&self) -> bool {
        CHECKPOINT_KEYS.iter().all(|k| self.splits.contains_key(k))
    }
}

/// The ordered participant collection plus the split ledger over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    participants: Vec<Participant>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a roster from restored participants, bypassing name
    /// validation (the snapshot codec has already vetted them).
    pub fn from_participants(participants: Vec<Participant>) -> Self {
        Self { participants }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    /// Validate a name and append a new participant with a fresh id.
    /// The collection is untouched on failure.
    pub fn add(&mut self, name: &str) -> Result<Participant, NameError> {
        let name = name.trim();
        validate_name_shape(name)?;
        if self.has_name(name) {
            return Err(NameError::Duplicate);
        }

        let participant = Participant {
            id: self.fresh_id(),
            name: name.to_string(),
            splits: BTreeMap::new(),
        };
        self.participants.push(participant.clone());
        Ok(participant)
    }

    /// Record a split for one runner. Write-once per checkpoint; the caller
    /// passes the clock's current elapsed time, never a chosen value.
    pub fn record(
        &mut self,
        id: &str,
        key: CheckpointKey,
        elapsed_ms: i64,
    ) -> Result<(), RecordError> {
        if elapsed_ms <= 0 {
            return Err(RecordError::InvalidElapsedTime);
        }
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(RecordError::UnknownParticipant)?;
        if participant.splits.contains_key(&key) {
            return Err(RecordError::AlreadyRecorded);
        }
        participant.splits.insert(key, elapsed_ms);
        Ok(())
    }

    /// Clear every participant. Callers pair this with a clock reset.
    pub fn reset_all(&mut self) {
        self.participants.clear();
    }

    fn has_name(&self, candidate: &str) -> bool {
        let lowered = candidate.to_lowercase();
        self.participants
            .iter()
            .any(|p| p.name.to_lowercase() == lowered)
    }

    fn fresh_id(&self) -> String {
        let mut rng = rand::thread_rng();
        loop {
            let id = format!("r{:08x}", rng.gen::<u32>());
            if !self.participants.iter().any(|p| p.id == id) {
                return id;
            }
        }
    }
}

fn validate_name_shape(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return Err(NameError::Empty);
    }
    if name.chars().count() < MIN_NAME_LEN {
        return Err(NameError::TooShort);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(NameError::TooLong);
    }
    let allowed = |c: char| c.is_alphanumeric() || matches!(c, ' ' | '-' | '\'' | '.');
    if !name.chars().all(allowed) {
        return Err(NameError::InvalidCharacters);
    }
    Ok(())
}
