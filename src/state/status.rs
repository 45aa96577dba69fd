//! Session status and its allowed transitions
//!
//! ```text
//! unknown → unauthorized            (authorization denied, sink)
//! unknown → failed                  (capture startup error, sink)
//! unknown → running ⇄ unknown       (start / stop)
//! ```

use serde::{Deserialize, Serialize};

/// Overall status of the capture session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Not started yet, or stopped
    #[default]
    Unknown,
    /// Camera access denied
    Unauthorized,
    /// Capture subsystem is running and accepts actions
    Running,
    /// Capture subsystem failed to start
    Failed,
}

impl SessionStatus {
    /// Only a running session executes mode, device and capture actions
    pub fn accepts_actions(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Sinks stay put until the process restarts
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::Failed)
    }

    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        match self {
            Self::Unknown => matches!(next, Self::Unauthorized | Self::Running | Self::Failed),
            Self::Running => matches!(next, Self::Unknown),
            Self::Unauthorized | Self::Failed => false,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Unknown => write!(f, "Unknown"),
            SessionStatus::Unauthorized => write!(f, "Unauthorized"),
            SessionStatus::Running => write!(f, "Running"),
            SessionStatus::Failed => write!(f, "Failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_status() {
        assert_eq!(SessionStatus::default(), SessionStatus::Unknown);
        assert!(!SessionStatus::default().accepts_actions());
    }

    #[test]
    fn test_unknown_transitions() {
        let status = SessionStatus::Unknown;
        assert!(status.can_transition_to(SessionStatus::Unauthorized));
        assert!(status.can_transition_to(SessionStatus::Running));
        assert!(status.can_transition_to(SessionStatus::Failed));
    }

    #[test]
    fn test_sinks_never_leave() {
        for sink in [SessionStatus::Unauthorized, SessionStatus::Failed] {
            assert!(sink.is_terminal());
            for next in [
                SessionStatus::Unknown,
                SessionStatus::Running,
                SessionStatus::Unauthorized,
                SessionStatus::Failed,
            ] {
                assert!(!sink.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_running_only_stops() {
        let status = SessionStatus::Running;
        assert!(status.accepts_actions());
        assert!(status.can_transition_to(SessionStatus::Unknown));
        assert!(!status.can_transition_to(SessionStatus::Failed));
    }
}
