use serde::Serialize;

/// Who produced a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Speaker {
    #[serde(rename = "AI")]
    Ai,
    #[serde(rename = "USER")]
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
}

/// Append-only record of spoken/typed turns. Owned and mutated exclusively by
/// the session orchestrator: an AI entry is appended when a question is
/// spoken, a USER entry when an answer is finalized.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ai(&mut self, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            speaker: Speaker::Ai,
            text: text.into(),
        });
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.entries.push(TranscriptEntry {
            speaker: Speaker::User,
            text: text.into(),
        });
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of AI turns, i.e. questions spoken so far.
    pub fn ai_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.speaker == Speaker::Ai)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_append_order() {
        let mut transcript = Transcript::new();
        transcript.push_ai("Tell me about yourself");
        transcript.push_user("I am a plumber");
        transcript.push_ai("Describe a challenge");

        let entries = transcript.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].speaker, Speaker::Ai);
        assert_eq!(entries[1].speaker, Speaker::User);
        assert_eq!(entries[1].text, "I am a plumber");
        assert_eq!(transcript.ai_count(), 2);
    }

    #[test]
    fn serializes_speaker_tags() {
        let mut transcript = Transcript::new();
        transcript.push_ai("Q");
        transcript.push_user("A");
        let json = serde_json::to_value(transcript.entries()).unwrap();
        assert_eq!(json[0]["speaker"], "AI");
        assert_eq!(json[1]["speaker"], "USER");
    }
}
