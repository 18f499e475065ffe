use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of one technology session
///
/// `Idle -> Acquiring -> Acquired -> Released`, with `Acquiring -> Released`
/// on cancellation or failure. `Released` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Idle,
    Acquiring,
    Acquired,
    Released,
}

impl SessionState {
    /// Holds, or is waiting for, the host technology
    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Acquiring | SessionState::Acquired)
    }

    pub fn can_transition_to(&self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Acquiring) | (Acquiring, Acquired) | (Acquiring, Released) | (Acquired, Released)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::Acquiring => "acquiring",
            SessionState::Acquired => "acquired",
            SessionState::Released => "released",
        };
        f.write_str(name)
    }
}

/// Identifies one `open` call; never reused
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-wide state of the host contactless stack
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlatformStatus {
    NotStarted,
    Started,
    /// Start failed; stays failed until the process restarts
    Failed(String),
}
