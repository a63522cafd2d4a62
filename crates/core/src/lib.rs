pub mod capture;
pub mod error;
pub mod interviewer;
pub mod playback;
pub mod report;
pub mod resume;
pub mod session;
pub mod transcript;

pub use error::{CaptureError, InterviewerError, PlaybackError, SessionError};
pub use report::{AnalysisReport, ResumeInsights, SuggestedCourse};
pub use resume::{InterviewStage, ResumeInput};
pub use session::{InterviewSession, SessionStatus, SubmitOutcome};
pub use transcript::{Speaker, Transcript, TranscriptEntry};
