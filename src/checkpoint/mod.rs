//! Saving and restoring the active configuration.
//!
//! A machine's live configuration is captured as a [`StatePath`]: the
//! chain of active state names, root level first. Paths are stable across
//! process restarts as long as state names and nesting are unchanged;
//! numeric ids never leave the process. The [`Checkpoint`] envelope wraps
//! a path with a format version, a unique id and a timestamp, and encodes
//! to JSON or a compact binary form.
//!
//! Applying a path is transactional in effect: the machine is reset
//! first, and a path that fails to resolve leaves it at its initial
//! configuration with no handlers run.

mod error;

pub use error::CheckpointError;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;
use uuid::Uuid;

use crate::core::{MachineId, StateId};
use crate::engine::StateMachine;

/// Envelope format version written by this build.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Chain of active state names, root level first.
///
/// The text form joins segments with `/`:
///
/// ```rust
/// use statik::StatePath;
///
/// let path: StatePath = "on/high/trim".parse().unwrap();
/// assert_eq!(path.segments(), ["on", "high", "trim"]);
/// assert_eq!(path.to_string(), "on/high/trim");
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatePath {
    segments: Vec<String>,
}

impl StatePath {
    /// Build a path from its segments, root level first.
    pub fn new(segments: Vec<String>) -> Self {
        StatePath { segments }
    }

    /// The segments, root level first.
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Nesting depth covered by the path.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for StatePath {
    type Err = CheckpointError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(CheckpointError::DecodingFailed(
                "empty state path".to_string(),
            ));
        }
        if s.split('/').any(str::is_empty) {
            return Err(CheckpointError::DecodingFailed(format!(
                "state path '{s}' has an empty segment"
            )));
        }
        Ok(StatePath {
            segments: s.split('/').map(str::to_string).collect(),
        })
    }
}

impl Serialize for StatePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StatePath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(D::Error::custom)
    }
}

/// Versioned, timestamped wrapper around a [`StatePath`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Envelope format version; see [`CHECKPOINT_VERSION`].
    pub version: u32,
    /// Unique id of this capture.
    pub id: Uuid,
    /// When the capture was taken.
    pub created_at: DateTime<Utc>,
    /// The captured configuration.
    pub path: StatePath,
}

impl Checkpoint {
    /// Wrap a path in a fresh envelope.
    pub fn new(path: StatePath) -> Self {
        Checkpoint {
            version: CHECKPOINT_VERSION,
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            path,
        }
    }

    /// Encode the envelope as JSON.
    pub fn to_json(&self) -> Result<String, CheckpointError> {
        serde_json::to_string(self).map_err(|e| CheckpointError::EncodingFailed(e.to_string()))
    }

    /// Decode an envelope from JSON.
    pub fn from_json(json: &str) -> Result<Self, CheckpointError> {
        serde_json::from_str(json).map_err(|e| CheckpointError::DecodingFailed(e.to_string()))
    }

    /// Encode the envelope in the compact binary form.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CheckpointError> {
        bincode::serialize(self).map_err(|e| CheckpointError::EncodingFailed(e.to_string()))
    }

    /// Decode an envelope from the compact binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CheckpointError> {
        bincode::deserialize(bytes).map_err(|e| CheckpointError::DecodingFailed(e.to_string()))
    }
}

impl<P> StateMachine<P> {
    /// Capture the active configuration as a path of state names.
    pub fn serialize(&self) -> StatePath {
        let segments = self
            .active_path()
            .into_iter()
            .map(|state| self.states[state.0].name.clone())
            .collect();
        StatePath { segments }
    }

    /// Capture the active configuration in a fresh [`Checkpoint`]
    /// envelope.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint::new(self.serialize())
    }

    /// Resolve `path` against the topology without touching the live
    /// configuration. The path must cover the full chain: one segment per
    /// level, down to a state with no nested machine.
    fn resolve_path(&self, path: &StatePath) -> Result<Vec<(MachineId, StateId)>, CheckpointError> {
        let mut resolved: Vec<(MachineId, StateId)> = Vec::with_capacity(path.depth());
        let mut level = Some(MachineId::ROOT);
        for segment in &path.segments {
            let Some(machine) = level else {
                let leaf = resolved
                    .last()
                    .map(|&(_, state)| self.states[state.0].name.clone())
                    .unwrap_or_default();
                return Err(CheckpointError::PathTooLong { name: leaf });
            };
            let state = self.levels[machine.0]
                .states
                .iter()
                .copied()
                .find(|state| self.states[state.0].name == *segment)
                .ok_or_else(|| CheckpointError::UnknownState {
                    name: segment.clone(),
                    level: self.levels[machine.0].name.clone(),
                })?;
            resolved.push((machine, state));
            level = self.states[state.0].child;
        }
        if let Some(machine) = level {
            return Err(CheckpointError::PathTooShort {
                level: self.levels[machine.0].name.clone(),
            });
        }
        Ok(resolved)
    }
}

impl<P: Clone> StateMachine<P> {
    /// Apply a previously captured path.
    ///
    /// The machine is reset first (clearing any fault and the reentrancy
    /// queue), then the path is resolved and applied without running any
    /// entry or exit handler. On failure the machine is left at its
    /// initial configuration.
    pub fn deserialize(&mut self, path: &StatePath) -> Result<(), CheckpointError> {
        self.reset_now();
        let resolved = self.resolve_path(path)?;
        for level in &mut self.levels {
            level.current = None;
        }
        for (machine, state) in resolved {
            self.levels[machine.0].current = Some(state);
        }
        debug!(path = %path, "configuration restored");
        Ok(())
    }

    /// Apply a checkpoint envelope after checking its format version.
    pub fn restore(&mut self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(CheckpointError::UnsupportedVersion {
                found: checkpoint.version,
                supported: CHECKPOINT_VERSION,
            });
        }
        self.deserialize(&checkpoint.path)
    }
}
