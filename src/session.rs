//! Recording session lifecycle.
//!
//! A session is Idle until started and Recording until stopped. The session
//! id may only be replaced while Idle; every stop hands out a fresh id for
//! the next recording.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether notifications are currently being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    Recording,
}

impl SessionState {
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionState::Recording)
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Recording => write!(f, "recording"),
        }
    }
}

/// Errors from session control operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The session id cannot change while recording.
    #[error("session is recording; stop it before changing the session id")]
    Busy,
    /// `start` was called while already recording.
    #[error("session is already recording")]
    AlreadyRecording,
    /// The requested session id is empty.
    #[error("invalid session id: {0:?}")]
    InvalidId(String),
}

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,
    pub state: SessionState,
    pub tick: u32,
    pub pending_events: usize,
}

/// The control surface exposed to operators.
pub trait SessionControl: Send + Sync {
    /// Replace the session id. Only valid while Idle.
    fn set_session_id(&self, value: &str) -> Result<(), SessionError>;

    /// Current session id.
    fn session_id(&self) -> String;

    /// Idle -> Recording.
    fn start(&self) -> Result<(), SessionError>;

    /// Recording -> Idle. No-op while Idle.
    fn stop(&self);

    fn status(&self) -> SessionStatus;
}

/// Generate a new opaque session id.
pub fn new_session_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validate an operator-supplied session id.
pub fn validate_session_id(value: &str) -> Result<String, SessionError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SessionError::InvalidId(value.to_string()));
    }
    Ok(trimmed.to_string())
}
