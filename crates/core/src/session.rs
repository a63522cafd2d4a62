use crate::capture::{CaptureAdapter, CaptureUpdate, RecognitionBackend};
use crate::error::{CaptureError, SessionError};
use crate::interviewer::Interviewer;
use crate::playback::Speaker;
use crate::report::AnalysisReport;
use crate::resume::ResumeInput;
use crate::transcript::{Transcript, TranscriptEntry};

/// Discriminated session status. `Thinking` covers the TTS synthesis window,
/// `Scoring` the final analysis call; the two busy windows are mutually
/// exclusive and never concurrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    AwaitingAnswer,
    Recording,
    Thinking,
    Scoring,
    Complete,
}

/// Result of a successful `submit_answer`.
#[derive(Debug)]
pub enum SubmitOutcome {
    /// Moved on to the question at this index.
    Advanced(usize),
    /// The question sequence is exhausted and scoring succeeded.
    Completed(Box<AnalysisReport>),
}

/// The interview session state machine.
///
/// Drives question progression over a fixed question sequence, owns the
/// transcript and the answer buffer, and decides when to invoke the capture
/// and playback adapters and when to hand off to scoring. All transitions are
/// applied from a single event loop; the busy statuses are set before any
/// suspension point, so a queued duplicate command is rejected instead of
/// re-entering an outstanding call.
pub struct InterviewSession<B: RecognitionBackend + 'static> {
    questions: Vec<String>,
    resume: ResumeInput,
    job_description: String,
    current_idx: usize,
    status: SessionStatus,
    transcript: Transcript,
    answer_buffer: String,
    timer_seconds: u64,
    capture: CaptureAdapter<B>,
    live: bool,
}

impl<B: RecognitionBackend + 'static> InterviewSession<B> {
    pub fn new(
        questions: Vec<String>,
        resume: ResumeInput,
        job_description: String,
        capture: CaptureAdapter<B>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }
        Ok(Self {
            questions,
            resume,
            job_description,
            current_idx: 0,
            status: SessionStatus::Idle,
            transcript: Transcript::new(),
            answer_buffer: String::new(),
            timer_seconds: 0,
            capture,
            live: true,
        })
    }

    /// Opens the session: speaks question 0 and waits for the first answer.
    pub async fn start<P: Speaker>(&mut self, playback: &P) -> Result<(), SessionError> {
        self.ensure_live()?;
        if self.status != SessionStatus::Idle {
            return Err(SessionError::Busy(self.status));
        }
        self.speak_question(playback).await;
        Ok(())
    }

    /// Flips between `AwaitingAnswer` and `Recording`. Returns whether the
    /// session is now recording.
    ///
    /// Entering `Recording` clears a transient capture error and rebinds the
    /// adapter; a terminal error (`PermissionDenied`, `Unsupported`) keeps
    /// rejecting voice until explicitly cleared. Leaving `Recording` stops
    /// the adapter but preserves the accumulated buffer.
    pub async fn toggle_recording(&mut self) -> Result<bool, SessionError> {
        self.ensure_live()?;
        match self.status {
            SessionStatus::Recording => {
                self.capture.disable();
                self.status = SessionStatus::AwaitingAnswer;
                Ok(false)
            }
            SessionStatus::AwaitingAnswer => {
                if let Some(error) = self.capture.error() {
                    if !error.is_terminal() {
                        self.capture.clear_error();
                    }
                }
                self.capture.enable().await?;
                self.status = SessionStatus::Recording;
                Ok(true)
            }
            other => Err(SessionError::Busy(other)),
        }
    }

    /// Finalizes the current answer and advances, or hands the transcript to
    /// scoring when the question sequence is exhausted.
    ///
    /// A failed scoring call rolls back to `AwaitingAnswer` at the same
    /// index, so retry is a plain resubmission.
    pub async fn submit_answer<I, P>(
        &mut self,
        interviewer: &I,
        playback: &P,
    ) -> Result<SubmitOutcome, SessionError>
    where
        I: Interviewer,
        P: Speaker,
    {
        self.ensure_live()?;
        match self.status {
            SessionStatus::AwaitingAnswer | SessionStatus::Recording => {}
            other => return Err(SessionError::Busy(other)),
        }

        // Submitting always silences the microphone, even mid-utterance.
        self.capture.disable();
        self.status = SessionStatus::AwaitingAnswer;

        let answer = self.answer_buffer.trim().to_owned();
        self.answer_buffer.clear();
        if !answer.is_empty() {
            self.transcript.push_user(answer);
        }

        if self.current_idx + 1 < self.questions.len() {
            self.current_idx += 1;
            self.speak_question(playback).await;
            Ok(SubmitOutcome::Advanced(self.current_idx))
        } else {
            self.status = SessionStatus::Scoring;
            let scored = interviewer
                .score_interview(self.transcript.entries(), &self.resume, &self.job_description)
                .await;
            match scored {
                Ok(report) => {
                    self.status = SessionStatus::Complete;
                    Ok(SubmitOutcome::Completed(Box::new(report)))
                }
                Err(error) => {
                    self.status = SessionStatus::AwaitingAnswer;
                    Err(SessionError::Scoring(error))
                }
            }
        }
    }

    /// Overwrites the answer buffer directly, bypassing voice capture.
    pub fn manual_text_input(&mut self, text: &str) -> Result<(), SessionError> {
        self.ensure_live()?;
        match self.status {
            SessionStatus::Thinking | SessionStatus::Scoring | SessionStatus::Complete => {
                Err(SessionError::Busy(self.status))
            }
            _ => {
                self.answer_buffer = text.to_owned();
                Ok(())
            }
        }
    }

    /// Applies an update from the capture adapter. Final chunks are committed
    /// to the answer buffer only while `Recording`; interim text is left to
    /// the host to display.
    pub fn apply_capture_update(&mut self, update: CaptureUpdate) {
        if !self.live {
            return;
        }
        match update {
            CaptureUpdate::Final(text) => {
                if self.status != SessionStatus::Recording {
                    return;
                }
                let chunk = text.trim();
                if chunk.is_empty() {
                    return;
                }
                if !self.answer_buffer.is_empty() {
                    self.answer_buffer.push(' ');
                }
                self.answer_buffer.push_str(chunk);
            }
            CaptureUpdate::Interim(_) => {}
            CaptureUpdate::Error(error) => {
                tracing::warn!("voice capture error: {error}");
                self.capture.note_error(error);
                if self.status == SessionStatus::Recording {
                    self.status = SessionStatus::AwaitingAnswer;
                }
            }
            CaptureUpdate::Stopped => {
                if self.status == SessionStatus::Recording {
                    self.status = SessionStatus::AwaitingAnswer;
                }
            }
        }
    }

    /// One wall-clock second elapsed. Counts regardless of status while the
    /// session is open.
    pub fn tick(&mut self) {
        if self.live {
            self.timer_seconds += 1;
        }
    }

    /// Marks the session dead and releases the capture binding. Every later
    /// event application is a no-op, so in-flight async completions cannot
    /// mutate a torn-down session.
    pub fn teardown(&mut self) {
        self.live = false;
        self.capture.disable();
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn current_index(&self) -> usize {
        self.current_idx
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn current_question(&self) -> &str {
        &self.questions[self.current_idx]
    }

    pub fn transcript(&self) -> &[TranscriptEntry] {
        self.transcript.entries()
    }

    pub fn answer_buffer(&self) -> &str {
        &self.answer_buffer
    }

    pub fn timer_seconds(&self) -> u64 {
        self.timer_seconds
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_enabled()
    }

    pub fn capture_error(&self) -> Option<&CaptureError> {
        self.capture.error()
    }

    /// Explicit user remediation ("retry voice"): clears any capture error,
    /// including terminal ones.
    pub fn clear_capture_error(&mut self) {
        self.capture.clear_error();
    }

    async fn speak_question<P: Speaker>(&mut self, playback: &P) {
        let question = self.questions[self.current_idx].clone();
        self.transcript.push_ai(question.clone());
        self.status = SessionStatus::Thinking;
        if let Err(error) = playback.speak(&question).await {
            // TTS is cosmetic: the question is on screen either way.
            tracing::warn!("question playback failed: {error}");
        }
        self.status = SessionStatus::AwaitingAnswer;
    }

    fn ensure_live(&self) -> Result<(), SessionError> {
        if self.live {
            Ok(())
        } else {
            Err(SessionError::TornDown)
        }
    }

    #[cfg(test)]
    pub(crate) fn set_status_for_test(&mut self, status: SessionStatus) {
        self.status = status;
    }
}
