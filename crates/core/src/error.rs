use crate::session::SessionStatus;
use thiserror::Error;

/// Classified speech-capture failures.
///
/// `PermissionDenied` and `Unsupported` are terminal for the session: the
/// capture adapter refuses to rebind until the error is explicitly cleared,
/// and auto-restart is suppressed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("speech engine network error")]
    Network,
    #[error("microphone access denied")]
    PermissionDenied,
    #[error("speech recognition is not available on this platform")]
    Unsupported,
    #[error("speech capture failed: {0}")]
    Unknown(String),
}

impl CaptureError {
    /// Terminal errors block re-enable until explicitly cleared by the user.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureError::PermissionDenied | CaptureError::Unsupported)
    }
}

/// Failures of the text-to-speech path. Never fatal to a session: the
/// orchestrator logs these and continues text-only.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("speech synthesis request failed: {0}")]
    Synthesis(String),
    #[error("synthesis returned an empty audio payload")]
    EmptyPayload,
    #[error("failed to decode audio payload")]
    Decode(#[from] base64::DecodeError),
    #[error("audio sink rejected samples: {0}")]
    Sink(String),
}

/// Failures of the generation service (resume analysis, question generation,
/// interview scoring). Malformed or partial responses are hard failures of
/// the individual call; the caller decides whether to retry.
#[derive(Debug, Error)]
pub enum InterviewerError {
    #[error("request to the generation service failed")]
    Request(#[from] reqwest::Error),
    #[error("generation service returned no content")]
    EmptyResponse,
    #[error("missing prompt template: {0}")]
    MissingPrompt(&'static str),
    #[error("malformed response from the generation service: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: f32 },
    #[error("generation service produced no questions")]
    NoQuestions,
}

/// Rejected or failed session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("a session needs at least one question")]
    NoQuestions,
    #[error("operation rejected while the session is {0:?}")]
    Busy(SessionStatus),
    #[error("the session has been torn down")]
    TornDown,
    #[error("voice capture unavailable: {0}")]
    Capture(#[from] CaptureError),
    #[error("scoring failed: {0}")]
    Scoring(#[source] InterviewerError),
}
