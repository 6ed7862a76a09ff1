/// ID types for clip playback commands
use serde::{Deserialize, Serialize};
use std::fmt;

/// Correlation id minted for every issued clip command
///
/// Every asynchronous continuation carries the id it was started for and
/// drops its result when the id is no longer current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandId(u64);

impl CommandId {
    /// Create a command ID from its raw value
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// The id that follows this one
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Get the raw value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cmd-{}", self.0)
    }
}
