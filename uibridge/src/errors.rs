use thiserror::Error;

#[derive(Error, Debug)]
pub enum AutomationError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Match index out of range: {0}")]
    IndexOutOfRange(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No UI snapshot available: {0}")]
    NoSnapshot(String),

    #[error("Gesture timed out: {0}")]
    GestureTimeout(String),

    #[error("Gesture cancelled: {0}")]
    GestureCancelled(String),

    #[error("Action rejected by platform: {0}")]
    ActionRejected(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Stale element handle: {0}")]
    StaleHandle(String),

    #[error("Platform-specific error: {0}")]
    PlatformError(String),
}
