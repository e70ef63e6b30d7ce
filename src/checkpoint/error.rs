//! Errors raised while saving or applying checkpoints.

use thiserror::Error;

/// Error raised when a saved state path or envelope cannot be applied.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CheckpointError {
    /// A path segment names no state on the level it addresses.
    #[error("no state named '{name}' in machine level '{level}'")]
    UnknownState {
        /// The unresolvable segment.
        name: String,
        /// Name of the level the segment addressed.
        level: String,
    },

    /// The path has segments left after reaching a state with no nested
    /// machine.
    #[error("state path continues past leaf state '{name}'")]
    PathTooLong {
        /// The leaf state the extra segment follows.
        name: String,
    },

    /// The path ends before covering a nested machine.
    #[error("state path ends before machine level '{level}'")]
    PathTooShort {
        /// Name of the first uncovered level.
        level: String,
    },

    /// The envelope was written by an incompatible format version.
    #[error("unsupported checkpoint version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version found in the envelope.
        found: u32,
        /// Version this build writes and reads.
        supported: u32,
    },

    /// The envelope could not be encoded.
    #[error("checkpoint encoding failed: {0}")]
    EncodingFailed(String),

    /// The envelope or path could not be decoded.
    #[error("checkpoint decoding failed: {0}")]
    DecodingFailed(String),
}
