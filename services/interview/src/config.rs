//! Application Configuration Module
//!
//! Centralizes configuration for the interview service: everything is loaded
//! from environment variables into a single struct passed through the
//! application.

use interview_core::interviewer::GeminiModels;
use secrecy::SecretString;
use std::env;
use tracing::Level;

// --- Application Constants ---

/// The size of each audio chunk sent from the microphone input stream.
pub const INPUT_CHUNK_SIZE: usize = 1024;
/// The size of each audio chunk for the audio output stream.
pub const OUTPUT_CHUNK_SIZE: usize = 1024;
/// Capacity of the playback ring buffer, in seconds of device-rate audio.
/// Sized so a whole synthesized question fits without dropping samples.
pub const OUTPUT_BUFFER_SECS: usize = 30;

/// Holds all configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: SecretString,
    pub models: GeminiModels,
    pub live_model: String,
    pub log_level: Level,
}

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid log level provided for RUST_LOG: {0}")]
    InvalidLogLevel(String),
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    // *   `GEMINI_API_KEY`: Your secret key for the Gemini API. Required.
    // *   `INSIGHT_MODEL`, `QUESTION_MODEL`, `SCORING_MODEL`, `TTS_MODEL`,
    //     `TTS_VOICE`, `LIVE_MODEL`: (Optional) model overrides.
    // *   `RUST_LOG`: (Optional) The logging level. Defaults to "INFO".
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file. Useful for local development, ignored if absent.
        dotenvy::dotenv().ok();

        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map(SecretString::from)
            .map_err(|_| ConfigError::MissingVar("GEMINI_API_KEY must be set".to_string()))?;

        let defaults = GeminiModels::default();
        let models = GeminiModels {
            insight: env_or("INSIGHT_MODEL", &defaults.insight),
            question: env_or("QUESTION_MODEL", &defaults.question),
            scoring: env_or("SCORING_MODEL", &defaults.scoring),
            tts: env_or("TTS_MODEL", &defaults.tts),
            tts_voice: env_or("TTS_VOICE", &defaults.tts_voice),
        };
        let live_model = env_or("LIVE_MODEL", "gemini-2.0-flash-live-001");

        let log_level_str = env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str
            .parse::<Level>()
            .map_err(|_| ConfigError::InvalidLogLevel(log_level_str))?;

        Ok(Self {
            gemini_api_key,
            models,
            live_model,
            log_level,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}
