use crate::error::{InterviewerError, PlaybackError};
use crate::playback::SpeechSynthesizer;
use crate::report::{AnalysisReport, ResumeInsights};
use crate::resume::{InterviewStage, ResumeInput};
use crate::transcript::TranscriptEntry;
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;

const GENERATE_CONTENT_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: CandidateContent,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPart {
    pub text: Option<String>,
    pub inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

// The `Interviewer` trait is the contract for the generation service behind
// session setup and final scoring. The session orchestrator depends on this
// abstraction rather than a concrete client, so unit tests drive the state
// machine with `mockall`'s `MockInterviewer` instead of live network calls.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Interviewer: Send + Sync {
    /// Analyzes the resume against the job description (ATS score, skills,
    /// experience, gaps).
    async fn analyze_resume(
        &self,
        resume: &ResumeInput,
        job_description: &str,
    ) -> Result<ResumeInsights, InterviewerError>;

    /// Generates the ordered question sequence for the session.
    async fn generate_questions(
        &self,
        resume: &ResumeInput,
        job_description: &str,
        stage: InterviewStage,
    ) -> Result<Vec<String>, InterviewerError>;

    /// Scores the completed interview transcript. One-shot: retry, if
    /// desired, is the caller's resubmission.
    async fn score_interview(
        &self,
        transcript: &[TranscriptEntry],
        resume: &ResumeInput,
        job_description: &str,
    ) -> Result<AnalysisReport, InterviewerError>;
}

/// Model names used for each call, overridable from configuration.
#[derive(Debug, Clone)]
pub struct GeminiModels {
    pub insight: String,
    pub question: String,
    pub scoring: String,
    pub tts: String,
    pub tts_voice: String,
}

impl Default for GeminiModels {
    fn default() -> Self {
        Self {
            insight: "gemini-3-flash-preview".to_string(),
            question: "gemini-3-pro-preview".to_string(),
            scoring: "gemini-3-pro-preview".to_string(),
            tts: "gemini-2.5-flash-preview-tts".to_string(),
            tts_voice: "Kore".to_string(),
        }
    }
}

pub struct GeminiInterviewer {
    client: Client,
    api_key: SecretString,
    models: GeminiModels,
    prompts: HashMap<String, String>,
}

impl GeminiInterviewer {
    pub fn new(api_key: SecretString, models: GeminiModels, prompts: HashMap<String, String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            models,
            prompts,
        }
    }

    fn prompt(&self, key: &'static str) -> Result<&str, InterviewerError> {
        self.prompts
            .get(key)
            .map(String::as_str)
            .ok_or(InterviewerError::MissingPrompt(key))
    }

    async fn generate(
        &self,
        model: &str,
        body: Value,
    ) -> Result<GenerateContentResponse, InterviewerError> {
        let url = format!("{GENERATE_CONTENT_BASE}/{model}:generateContent");
        let resp = self
            .client
            .post(url)
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json::<GenerateContentResponse>()
            .await?;
        Ok(resp)
    }
}

/// Extracts the first text part from a generation response.
pub fn first_text(resp: &GenerateContentResponse) -> Result<&str, InterviewerError> {
    resp.candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .and_then(|p| p.text.as_deref())
        .ok_or(InterviewerError::EmptyResponse)
}

/// Extracts the first inline audio payload from a generation response.
pub fn first_audio(resp: &GenerateContentResponse) -> Option<&str> {
    resp.candidates
        .first()
        .and_then(|c| c.content.parts.first())
        .and_then(|p| p.inline_data.as_ref())
        .map(|d| d.data.as_str())
}

/// Parses the question-generation output: a strict JSON array of strings.
/// Blank entries are dropped; an empty result is a generation failure.
pub fn parse_questions(raw: &str) -> Result<Vec<String>, InterviewerError> {
    let questions: Vec<String> = serde_json::from_str(raw)?;
    let questions: Vec<String> = questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .collect();
    if questions.is_empty() {
        return Err(InterviewerError::NoQuestions);
    }
    Ok(questions)
}

fn insights_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "score": { "type": "NUMBER", "description": "ATS match score out of 100" },
            "extractedSkills": { "type": "ARRAY", "items": { "type": "STRING" } },
            "experienceYears": { "type": "NUMBER" },
            "summary": { "type": "STRING" },
            "gaps": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["score", "extractedSkills", "experienceYears", "summary", "gaps"]
    })
}

fn questions_schema() -> Value {
    json!({ "type": "ARRAY", "items": { "type": "STRING" } })
}

fn report_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "overallScore": { "type": "NUMBER" },
            "starCompliance": { "type": "NUMBER" },
            "behavioralScore": { "type": "NUMBER" },
            "technicalScore": { "type": "NUMBER" },
            "feedback": { "type": "STRING" },
            "keyStrengths": { "type": "ARRAY", "items": { "type": "STRING" } },
            "improvementAreas": { "type": "ARRAY", "items": { "type": "STRING" } },
            "suggestedCourses": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "title": { "type": "STRING" },
                        "provider": { "type": "STRING" },
                        "url": { "type": "STRING" }
                    }
                }
            }
        },
        "required": [
            "overallScore", "starCompliance", "behavioralScore", "technicalScore",
            "feedback", "keyStrengths", "improvementAreas", "suggestedCourses"
        ]
    })
}

#[async_trait]
impl Interviewer for GeminiInterviewer {
    async fn analyze_resume(
        &self,
        resume: &ResumeInput,
        job_description: &str,
    ) -> Result<ResumeInsights, InterviewerError> {
        let prompt = self
            .prompt("resume_analysis")?
            .replace("{job_description}", job_description);
        let body = json!({
            "contents": [{ "parts": [resume.as_part(), { "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": insights_schema()
            }
        });

        let resp = self.generate(&self.models.insight, body).await?;
        let insights: ResumeInsights = serde_json::from_str(first_text(&resp)?)?;
        insights.validate()?;
        Ok(insights)
    }

    async fn generate_questions(
        &self,
        resume: &ResumeInput,
        job_description: &str,
        stage: InterviewStage,
    ) -> Result<Vec<String>, InterviewerError> {
        let prompt = self
            .prompt("question_generation")?
            .replace("{job_description}", job_description)
            .replace("{stage}", stage.label());
        let body = json!({
            "contents": [{ "parts": [resume.as_part(), { "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": questions_schema()
            }
        });

        let resp = self.generate(&self.models.question, body).await?;
        parse_questions(first_text(&resp)?)
    }

    async fn score_interview(
        &self,
        transcript: &[TranscriptEntry],
        resume: &ResumeInput,
        job_description: &str,
    ) -> Result<AnalysisReport, InterviewerError> {
        let transcript_json = serde_json::to_string(transcript)?;
        let prompt = self
            .prompt("interview_scoring")?
            .replace("{job_description}", job_description)
            .replace("{transcript}", &transcript_json);
        let body = json!({
            "contents": [{ "parts": [resume.as_part(), { "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": report_schema()
            }
        });

        let resp = self.generate(&self.models.scoring, body).await?;
        let report: AnalysisReport = serde_json::from_str(first_text(&resp)?)?;
        report.validate()?;
        Ok(report)
    }
}

#[async_trait]
impl SpeechSynthesizer for GeminiInterviewer {
    async fn synthesize(&self, text: &str) -> Result<String, PlaybackError> {
        let prompt = self
            .prompt("speech_style")
            .map_err(|e| PlaybackError::Synthesis(e.to_string()))?
            .replace("{text}", text);
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": self.models.tts_voice }
                    }
                }
            }
        });

        let resp = self
            .generate(&self.models.tts, body)
            .await
            .map_err(|e| PlaybackError::Synthesis(e.to_string()))?;
        first_audio(&resp)
            .map(str::to_owned)
            .ok_or(PlaybackError::EmptyPayload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn test_prompts() -> HashMap<String, String> {
        HashMap::from([
            (
                "question_generation".to_string(),
                "Generate questions for a {stage} interview.\n\nJob Description: {job_description}"
                    .to_string(),
            ),
            ("speech_style".to_string(), "Say this professionally: {text}".to_string()),
        ])
    }

    #[test]
    fn prompt_lookup_reports_missing_templates() {
        let interviewer = GeminiInterviewer::new(
            SecretString::from("test-key".to_string()),
            GeminiModels::default(),
            test_prompts(),
        );
        assert!(interviewer.prompt("question_generation").is_ok());
        let err = interviewer.prompt("interview_scoring").unwrap_err();
        assert!(matches!(
            err,
            InterviewerError::MissingPrompt("interview_scoring")
        ));
    }

    #[test]
    fn parse_questions_drops_blank_entries() {
        let raw = r#"["Tell me about yourself", "   ", "Describe a challenge"]"#;
        let questions = parse_questions(raw).unwrap();
        assert_eq!(questions.len(), 2);
        assert_eq!(questions[1], "Describe a challenge");
    }

    #[test]
    fn parse_questions_rejects_empty_output() {
        assert!(matches!(
            parse_questions("[]"),
            Err(InterviewerError::NoQuestions)
        ));
        assert!(matches!(
            parse_questions(r#"["  "]"#),
            Err(InterviewerError::NoQuestions)
        ));
    }

    #[test]
    fn parse_questions_rejects_non_array_output() {
        assert!(matches!(
            parse_questions(r#"{"question": "hm"}"#),
            Err(InterviewerError::Malformed(_))
        ));
    }

    #[test]
    fn first_text_on_empty_response_is_an_error() {
        let resp: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert!(matches!(
            first_text(&resp),
            Err(InterviewerError::EmptyResponse)
        ));
    }

    #[test]
    fn first_audio_reads_inline_data() {
        let raw = r#"{
            "candidates": [{
                "content": { "parts": [{ "inlineData": { "mimeType": "audio/pcm", "data": "AAAA" } }] }
            }]
        }"#;
        let resp: GenerateContentResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(first_audio(&resp), Some("AAAA"));
    }

    // This is an integration test that makes a live call to the Gemini API.
    // It is ignored by default so `cargo test` runs without an API key.
    // To run it, use `cargo test -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn test_generate_questions_live() {
        dotenvy::dotenv_override().ok();
        let api_key = env::var("GEMINI_API_KEY").expect("GEMINI_API_KEY not set");
        let mut prompts = test_prompts();
        prompts.insert(
            "question_generation".to_string(),
            "Based on this candidate's resume and the job description, generate 5 highly \
             relevant and challenging {stage} interview questions.\n\nJob Description: {job_description}"
                .to_string(),
        );
        let interviewer = GeminiInterviewer::new(
            SecretString::from(api_key),
            GeminiModels::default(),
            prompts,
        );

        let resume = ResumeInput::text("Five years as a backend engineer working on Rust services.");
        let questions = interviewer
            .generate_questions(&resume, "Senior Rust engineer", InterviewStage::Technical)
            .await
            .expect("question generation failed");
        println!("Questions: {:?}", questions);
        assert!(!questions.is_empty());
    }
}
