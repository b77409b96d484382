//! Status events broadcast by [`crate::CaptureEngine`].

use serde::{Deserialize, Serialize};

/// Emitted whenever the engine changes state.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatusEvent {
    pub status: EngineStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Capture engine lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// Constructed, not yet started.
    Idle,
    /// Stream open, slices flowing.
    Capturing,
    /// Stopped cleanly.
    Stopped,
    /// Setup failed or the stream died.
    Error,
}

impl EngineStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, EngineStatus::Stopped | EngineStatus::Error)
    }
}
