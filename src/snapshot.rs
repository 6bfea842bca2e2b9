use crate::clock::RaceClock;
use crate::roster::{CheckpointKey, Participant, Roster};
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Slot name in the host's key-value store.
pub const SESSION_SLOT_KEY: &str = "cross-country-timer-session";

/// Serialized snapshots beyond this size are refused rather than written.
pub const MAX_SNAPSHOT_BYTES: usize = 5 * 1024 * 1024;

/// Snapshots older than this are discarded on load.
pub const STALE_AFTER_MS: i64 = 24 * 60 * 60 * 1_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    TooLarge(usize),
    Encode(String),
    /// The raw slot value did not parse as the expected JSON shape
    Malformed(String),
    /// Parsed, but a field violates the schema
    Invalid(&'static str),
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::TooLarge(size) => {
                write!(f, "snapshot is {} bytes, over the {} byte cap", size, MAX_SNAPSHOT_BYTES)
            }
            SnapshotError::Encode(e) => write!(f, "could not encode snapshot: {}", e),
            SnapshotError::Malformed(e) => write!(f, "stored session is not valid JSON: {}", e),
            SnapshotError::Invalid(reason) => write!(f, "stored session is invalid: {}", reason),
        }
    }
}

impl std::error::Error for SnapshotError {}

/// Persisted form of the whole session. Field names match the wire contract
/// used by the hosting UI, not Rust conventions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub runners: Vec<WireRunner>,
    #[serde(rename = "timerState")]
    pub timer_state: WireTimer,
    #[serde(rename = "lastSaved")]
    pub last_saved: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireRunner {
    pub id: String,
    pub name: String,
    pub splits: WireSplits,
}

/// Keys outside mile1..mile3 fail the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireSplits {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mile1: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mile2: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mile3: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireTimer {
    #[serde(rename = "isRunning")]
    pub is_running: bool,
    #[serde(rename = "elapsedTime")]
    pub elapsed_time: i64,
    #[serde(rename = "startTime")]
    pub start_time: Option<i64>,
}

impl SessionSnapshot {
    /// Photograph the live state for persistence, stamped with `now`.
    pub fn capture(roster: &Roster, clock: &RaceClock, now: i64) -> Self {
        let runners = roster
            .participants()
            .iter()
            .map(|p| WireRunner {
                id: p.id.clone(),
                name: p.name.clone(),
                splits: WireSplits {
                    mile1: p.split(CheckpointKey::Mile1),
                    mile2: p.split(CheckpointKey::Mile2),
                    mile3: p.split(CheckpointKey::Mile3),
                },
            })
            .collect();

        Self {
            runners,
            timer_state: WireTimer {
                is_running: clock.running(),
                elapsed_time: clock.elapsed_ms(),
                start_time: clock.start_epoch_ms(),
            },
            last_saved: now,
        }
    }

    pub fn encode(&self) -> Result<String, SnapshotError> {
        let raw = serde_json::to_string(self).map_err(|e| SnapshotError::Encode(e.to_string()))?;
        if raw.len() > MAX_SNAPSHOT_BYTES {
            return Err(SnapshotError::TooLarge(raw.len()));
        }
        Ok(raw)
    }

    /// Parse-then-validate. Any structural failure discards the snapshot as
    /// a whole; there is no partial restore.
    pub fn decode(raw: &str) -> Result<Self, SnapshotError> {
        let snapshot: SessionSnapshot =
            serde_json::from_str(raw).map_err(|e| SnapshotError::Malformed(e.to_string()))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    fn validate(&self) -> Result<(), SnapshotError> {
        for runner in &self.runners {
            if runner.name.is_empty() {
                return Err(SnapshotError::Invalid("runner with an empty name"));
            }
        }
        if self.timer_state.elapsed_time < 0 {
            return Err(SnapshotError::Invalid("negative elapsed time"));
        }
        Ok(())
    }

    /// Whether the snapshot is still within the staleness cutoff.
    pub fn is_recent(&self, now: i64) -> bool {
        now - self.last_saved <= STALE_AFTER_MS
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.last_saved).single()
    }

    /// Rebuild the live participant collection from the wire form.
    pub fn to_roster(&self) -> Roster {
        let participants = self
            .runners
            .iter()
            .map(|r| {
                let mut splits = BTreeMap::new();
                if let Some(ms) = r.splits.mile1 {
                    splits.insert(CheckpointKey::Mile1, ms);
                }
                if let Some(ms) = r.splits.mile2 {
                    splits.insert(CheckpointKey::Mile2, ms);
                }
                if let Some(ms) = r.splits.mile3 {
                    splits.insert(CheckpointKey::Mile3, ms);
                }
                Participant {
                    id: r.id.clone(),
                    name: r.name.clone(),
                    splits,
                }
            })
            .collect();
        Roster::from_participants(participants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sample_roster() -> Roster {
        let mut roster = Roster::new();
        let id = roster.add("Jane Smith").unwrap().id;
        roster.record(&id, CheckpointKey::Mile1, 65_000).unwrap();
        roster.add("John Doe").unwrap();
        roster
    }

    #[test]
    fn test_capture_then_roundtrip() {
        let roster = sample_roster();
        let mut clock = RaceClock::new();
        clock.start(0).unwrap();
        clock.tick(70_000).unwrap();

        let snapshot = SessionSnapshot::capture(&roster, &clock, 70_500);
        let raw = snapshot.encode().unwrap();
        let decoded = SessionSnapshot::decode(&raw).unwrap();

        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.last_saved, 70_500);
        assert_eq!(decoded.to_roster(), roster);
        assert!(decoded.timer_state.is_running);
        assert_eq!(decoded.timer_state.elapsed_time, 70_000);
    }

    #[test]
    fn test_wire_field_names_match_contract() {
        let roster = sample_roster();
        let clock = RaceClock::new();
        let raw = SessionSnapshot::capture(&roster, &clock, 1_000).encode().unwrap();

        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert!(value.get("runners").is_some());
        assert!(value.get("timerState").is_some());
        assert_eq!(value["lastSaved"], 1_000);
        assert_eq!(value["timerState"]["isRunning"], false);
        assert_eq!(value["timerState"]["elapsedTime"], 0);
        assert!(value["timerState"]["startTime"].is_null());
        assert_eq!(value["runners"][0]["splits"]["mile1"], 65_000);
        // Unrecorded splits are absent, not null
        assert!(value["runners"][0]["splits"].get("mile2").is_none());
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert_matches!(
            SessionSnapshot::decode("not json at all"),
            Err(SnapshotError::Malformed(_))
        );
    }

    #[test]
    fn test_decode_rejects_missing_fields() {
        assert_matches!(
            SessionSnapshot::decode(r#"{"runners": []}"#),
            Err(SnapshotError::Malformed(_))
        );

        // A runner without a name sinks the whole snapshot
        let raw = r#"{
            "runners": [{"id": "r1", "splits": {}}],
            "timerState": {"isRunning": false, "elapsedTime": 0, "startTime": null},
            "lastSaved": 1000
        }"#;
        assert_matches!(SessionSnapshot::decode(raw), Err(SnapshotError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_empty_name() {
        let raw = r#"{
            "runners": [{"id": "r1", "name": "", "splits": {}}],
            "timerState": {"isRunning": false, "elapsedTime": 0, "startTime": null},
            "lastSaved": 1000
        }"#;
        assert_matches!(SessionSnapshot::decode(raw), Err(SnapshotError::Invalid(_)));
    }

    #[test]
    fn test_decode_rejects_unknown_split_key() {
        let raw = r#"{
            "runners": [{"id": "r1", "name": "Jane", "splits": {"mile4": 1000}}],
            "timerState": {"isRunning": false, "elapsedTime": 0, "startTime": null},
            "lastSaved": 1000
        }"#;
        assert_matches!(SessionSnapshot::decode(raw), Err(SnapshotError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_wrong_types() {
        let raw = r#"{
            "runners": [],
            "timerState": {"isRunning": "yes", "elapsedTime": 0, "startTime": null},
            "lastSaved": 1000
        }"#;
        assert_matches!(SessionSnapshot::decode(raw), Err(SnapshotError::Malformed(_)));
    }

    #[test]
    fn test_decode_rejects_negative_elapsed() {
        let raw = r#"{
            "runners": [],
            "timerState": {"isRunning": false, "elapsedTime": -5, "startTime": null},
            "lastSaved": 1000
        }"#;
        assert_matches!(
            SessionSnapshot::decode(raw),
            Err(SnapshotError::Invalid("negative elapsed time"))
        );
    }

    #[test]
    fn test_decode_accepts_minimal_valid_snapshot() {
        let raw = r#"{
            "runners": [],
            "timerState": {"isRunning": false, "elapsedTime": 0, "startTime": null},
            "lastSaved": 0
        }"#;
        let snapshot = SessionSnapshot::decode(raw).unwrap();
        assert!(snapshot.runners.is_empty());
        assert!(snapshot.to_roster().is_empty());
    }

    #[test]
    fn test_is_recent_cutoff() {
        let roster = Roster::new();
        let clock = RaceClock::new();
        let saved_at = 1_000_000;
        let snapshot = SessionSnapshot::capture(&roster, &clock, saved_at);

        assert!(snapshot.is_recent(saved_at));
        assert!(snapshot.is_recent(saved_at + STALE_AFTER_MS));
        assert!(!snapshot.is_recent(saved_at + STALE_AFTER_MS + 1));
    }

    #[test]
    fn test_saved_at_converts_to_datetime() {
        let roster = Roster::new();
        let clock = RaceClock::new();
        let snapshot = SessionSnapshot::capture(&roster, &clock, 1_700_000_000_000);
        let when = snapshot.saved_at().unwrap();
        assert_eq!(when.timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_encode_rejects_oversized_snapshot() {
        // A roster bloated far past the cap; the names alone exceed 5 MiB
        let participants = (0..200_000)
            .map(|i| Participant {
                id: format!("r{:08x}", i),
                name: format!("Runner Number {:06}", i),
                splits: BTreeMap::new(),
            })
            .collect();
        let roster = Roster::from_participants(participants);
        let clock = RaceClock::new();

        let snapshot = SessionSnapshot::capture(&roster, &clock, 0);
        assert_matches!(snapshot.encode(), Err(SnapshotError::TooLarge(_)));
    }
}
