mod audio_io;
mod config;
mod prompt_loader;
mod recognition;

use crate::config::Config;
use crate::recognition::LiveRecognition;
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use interview_core::capture::{
    CaptureAdapter, CaptureUpdate, RecognitionBackend, UnsupportedRecognition,
};
use interview_core::error::{CaptureError, SessionError};
use interview_core::interviewer::{GeminiInterviewer, Interviewer};
use interview_core::playback::{SilentSpeaker, Speaker, SpeechPlayback};
use interview_core::report::AnalysisReport;
use interview_core::resume::{InterviewStage, ResumeInput};
use interview_core::session::{InterviewSession, SubmitOutcome};
use interview_native_utils::device;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::time::{Duration, Instant, interval_at};
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "interview", about = "Voice-driven AI mock interview in your terminal")]
struct Cli {
    /// Path to the resume: PDF or plain text
    resume: PathBuf,
    /// Path to the job description text file
    job_description: PathBuf,
    /// Interview stage the questions should target
    #[arg(long, value_enum, default_value_t = StageArg::Behavioral)]
    stage: StageArg,
    /// Disable voice entirely: no playback, answers typed only
    #[arg(long)]
    text_only: bool,
    /// Input device name (defaults to the system microphone)
    #[arg(long)]
    input_device: Option<String>,
    /// Output device name (defaults to the system speakers)
    #[arg(long)]
    output_device: Option<String>,
    /// Directory holding the LLM prompt templates
    #[arg(long, default_value = "prompts")]
    prompts_dir: PathBuf,
    /// List audio devices and exit
    #[arg(long)]
    list_devices: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StageArg {
    Behavioral,
    Technical,
    SystemDesign,
    CultureFit,
    CaseStudy,
}

impl From<StageArg> for InterviewStage {
    fn from(stage: StageArg) -> Self {
        match stage {
            StageArg::Behavioral => InterviewStage::Behavioral,
            StageArg::Technical => InterviewStage::Technical,
            StageArg::SystemDesign => InterviewStage::SystemDesign,
            StageArg::CultureFit => InterviewStage::CultureFit,
            StageArg::CaseStudy => InterviewStage::CaseStudy,
        }
    }
}

const COMMANDS_HELP: &str =
    "Commands: Enter = submit answer | r = record/stop | t <answer> = type answer | retry-voice | q = quit";

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();

    if args.list_devices {
        println!("{}", device::describe_devices()?);
        return Ok(());
    }

    // --- 4. Load Prompts ---
    let prompts =
        prompt_loader::load_prompts(&args.prompts_dir).context("Failed to load LLM prompts")?;
    tracing::info!("Loaded {} prompts successfully.", prompts.len());

    // --- 5. Initialize API Client ---
    let interviewer = Arc::new(GeminiInterviewer::new(
        config.gemini_api_key.clone(),
        config.models.clone(),
        prompts,
    ));

    // --- 6. Session Setup ---
    let resume = load_resume(&args.resume)?;
    let job_description = fs::read_to_string(&args.job_description)
        .with_context(|| {
            format!(
                "Failed to read job description: {}",
                args.job_description.display()
            )
        })?
        .trim()
        .to_string();

    let stage = InterviewStage::from(args.stage);
    tracing::info!("Analyzing resume and generating {} questions...", stage.label());
    // Setup failures are retryable: fix the inputs or connectivity and rerun.
    let (insights, questions) = tokio::try_join!(
        interviewer.analyze_resume(&resume, &job_description),
        interviewer.generate_questions(&resume, &job_description, stage),
    )
    .context("Interview setup failed; verify your inputs and try again")?;

    tracing::info!(
        "ATS match score {:.0}/100, ~{:.0} years of experience, {} skills extracted",
        insights.match_score,
        insights.experience_years,
        insights.extracted_skills.len()
    );
    tracing::info!("Fit summary: {}", insights.summary);
    for gap in &insights.gaps {
        tracing::info!("Gap: {gap}");
    }
    tracing::info!("Prepared {} questions.", questions.len());

    // --- 7. Run the Interview ---
    let report = if args.text_only {
        let (updates_tx, updates_rx) = mpsc::channel(8);
        let capture = CaptureAdapter::new(UnsupportedRecognition, updates_tx);
        let session = InterviewSession::new(questions, resume, job_description, capture)?;
        run_session(session, interviewer.as_ref(), &SilentSpeaker, updates_rx).await?
    } else {
        // The cpal streams stay alive for the whole session and stop when
        // these bindings drop, whatever the exit path.
        let (_output_stream, sink) = audio_io::build_output(args.output_device.clone())?;
        let playback = SpeechPlayback::new(interviewer.clone(), sink);

        let (_input_stream, mic_tx, mic_rate) = audio_io::build_input(args.input_device.clone())?;
        let backend = LiveRecognition::new(
            config.gemini_api_key.clone(),
            config.live_model.clone(),
            mic_tx,
            mic_rate,
        );
        let (updates_tx, updates_rx) = mpsc::channel(64);
        let capture = CaptureAdapter::new(backend, updates_tx);
        let session = InterviewSession::new(questions, resume, job_description, capture)?;
        run_session(session, interviewer.as_ref(), &playback, updates_rx).await?
    };

    match report {
        Some(report) => print_report(&report)?,
        None => tracing::info!("Session abandoned before scoring."),
    }
    Ok(())
}

fn load_resume(path: &Path) -> Result<ResumeInput> {
    let is_pdf = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read resume: {}", path.display()))?;
        Ok(ResumeInput::document(&bytes, "application/pdf"))
    } else {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read resume: {}", path.display()))?;
        Ok(ResumeInput::text(text.trim()))
    }
}

/// The single serialized event-application point: timer ticks, capture
/// updates, and user commands all mutate the session from this loop and
/// nowhere else.
async fn run_session<B, I, P>(
    mut session: InterviewSession<B>,
    interviewer: &I,
    playback: &P,
    mut capture_updates: mpsc::Receiver<CaptureUpdate>,
) -> Result<Option<AnalysisReport>>
where
    B: RecognitionBackend + 'static,
    I: Interviewer,
    P: Speaker,
{
    println!("{COMMANDS_HELP}");
    session.start(playback).await?;
    print_question(&session);

    let mut ticker = interval_at(
        Instant::now() + Duration::from_secs(1),
        Duration::from_secs(1),
    );
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = ticker.tick() => session.tick(),
            update = capture_updates.recv() => {
                if let Some(update) = update {
                    apply_capture_update(&mut session, update);
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("stdin closed unexpectedly")? else {
                    session.teardown();
                    return Ok(None);
                };
                match parse_command(&line) {
                    Command::Submit => match session.submit_answer(interviewer, playback).await {
                        Ok(SubmitOutcome::Advanced(_)) => print_question(&session),
                        Ok(SubmitOutcome::Completed(report)) => {
                            session.teardown();
                            return Ok(Some(*report));
                        }
                        Err(SessionError::Scoring(e)) => {
                            println!("! Scoring failed: {e}. Press Enter to resubmit.");
                        }
                        Err(SessionError::Busy(status)) => print_busy(status),
                        Err(e) => return Err(e.into()),
                    },
                    Command::Record => match session.toggle_recording().await {
                        Ok(true) => println!("* Recording: speak your answer, `r` stops."),
                        Ok(false) => println!("* Recording stopped; your answer so far is kept."),
                        Err(SessionError::Capture(e)) => print_capture_remediation(&e),
                        Err(SessionError::Busy(status)) => print_busy(status),
                        Err(e) => return Err(e.into()),
                    },
                    Command::Type(text) => match session.manual_text_input(&text) {
                        Ok(()) => println!("Answer noted. Press Enter to submit it."),
                        Err(SessionError::Busy(status)) => print_busy(status),
                        Err(e) => return Err(e.into()),
                    },
                    Command::RetryVoice => {
                        session.clear_capture_error();
                        println!("Voice error cleared: press `r` to record.");
                    }
                    Command::Quit => {
                        session.teardown();
                        return Ok(None);
                    }
                    Command::Help => println!("{COMMANDS_HELP}"),
                }
            }
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Submit,
    Record,
    Type(String),
    RetryVoice,
    Quit,
    Help,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if let Some(answer) = line.strip_prefix("t ") {
        return Command::Type(answer.trim().to_string());
    }
    match line {
        "" | "s" | "submit" => Command::Submit,
        "r" | "record" => Command::Record,
        "retry-voice" => Command::RetryVoice,
        "q" | "quit" => Command::Quit,
        _ => Command::Help,
    }
}

fn apply_capture_update<B: RecognitionBackend + 'static>(
    session: &mut InterviewSession<B>,
    update: CaptureUpdate,
) {
    match &update {
        // Interim text is display-only; it is never committed to the answer.
        CaptureUpdate::Interim(text) => println!("  ... {text}"),
        CaptureUpdate::Final(_) => {}
        CaptureUpdate::Error(e) => print_capture_remediation(e),
        CaptureUpdate::Stopped => println!("* Voice capture stopped."),
    }
    let was_final = matches!(update, CaptureUpdate::Final(_));
    session.apply_capture_update(update);
    if was_final {
        println!("  > {}", session.answer_buffer());
    }
}

fn print_busy(status: interview_core::session::SessionStatus) {
    println!("! The interviewer is busy ({status:?}); try again in a moment.");
}

fn print_capture_remediation(error: &CaptureError) {
    match error {
        CaptureError::Unsupported => {
            println!("! Voice is unavailable here: answer with `t <your answer>`.");
        }
        CaptureError::PermissionDenied => {
            println!(
                "! Microphone access denied. `retry-voice` to try again, or answer with `t <your answer>`."
            );
        }
        _ => {
            println!(
                "! Voice capture failed: {error}. `retry-voice` to retry, or answer with `t <your answer>`."
            );
        }
    }
}

fn print_question<B: RecognitionBackend + 'static>(session: &InterviewSession<B>) {
    println!();
    println!(
        "Q{}/{} [{}]  \"{}\"",
        session.current_index() + 1,
        session.total_questions(),
        format_time(session.timer_seconds()),
        session.current_question()
    );
}

fn format_time(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

fn print_report(report: &AnalysisReport) -> Result<()> {
    println!();
    println!("Interview complete. Overall score: {:.0}/100", report.overall_score);
    println!(
        "  STAR compliance {:.0}/100 | behavioral {:.0}/100 | technical {:.0}/100",
        report.star_compliance, report.behavioral_score, report.technical_score
    );
    println!("  {}", report.feedback);
    for strength in &report.key_strengths {
        println!("  + {strength}");
    }
    for area in &report.improvement_areas {
        println!("  - {area}");
    }
    for course in &report.suggested_courses {
        println!("  > {} ({}): {}", course.title, course.provider, course.url);
    }
    println!();
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}
