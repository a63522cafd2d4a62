use base64::Engine;
use serde_json::{Value, json};

/// Candidate resume material handed to the generation service: either plain
/// text or an uploaded document forwarded verbatim with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeInput {
    Text(String),
    Document { data: String, mime_type: String },
}

impl ResumeInput {
    pub fn text(content: impl Into<String>) -> Self {
        ResumeInput::Text(content.into())
    }

    /// Wraps raw document bytes, base64-encoding them for the wire.
    pub fn document(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        ResumeInput::Document {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            mime_type: mime_type.into(),
        }
    }

    /// Renders the resume as a content part of a generation request.
    pub fn as_part(&self) -> Value {
        match self {
            ResumeInput::Text(text) => json!({ "text": format!("Resume Content: {text}") }),
            ResumeInput::Document { data, mime_type } => json!({
                "inlineData": { "mimeType": mime_type, "data": data }
            }),
        }
    }
}

/// The flavor of interview to generate questions for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterviewStage {
    #[default]
    Behavioral,
    Technical,
    SystemDesign,
    CultureFit,
    CaseStudy,
}

impl InterviewStage {
    pub fn label(&self) -> &'static str {
        match self {
            InterviewStage::Behavioral => "Behavioral",
            InterviewStage::Technical => "Technical",
            InterviewStage::SystemDesign => "System Design",
            InterviewStage::CultureFit => "Culture Fit",
            InterviewStage::CaseStudy => "Case Study",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_resume_renders_as_text_part() {
        let part = ResumeInput::text("10 years of Rust").as_part();
        assert_eq!(part["text"], "Resume Content: 10 years of Rust");
    }

    #[test]
    fn document_resume_renders_as_inline_data() {
        let resume = ResumeInput::document(b"%PDF-1.4", "application/pdf");
        let part = resume.as_part();
        assert_eq!(part["inlineData"]["mimeType"], "application/pdf");
        // "%PDF-1.4" base64-encoded
        assert_eq!(part["inlineData"]["data"], "JVBERi0xLjQ=");
    }
}
