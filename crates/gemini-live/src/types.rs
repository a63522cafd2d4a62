// Outgoing messages
#[derive(serde::Serialize)]
pub struct SetupRequest {
    pub setup: SessionSetup,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSetup {
    pub model: String,
    pub language_code: String,
    pub input_audio_transcription: InputTranscriptionConfig,
}

/// Empty marker object; its presence enables interim and final input
/// transcription events.
#[derive(serde::Serialize, Default)]
pub struct InputTranscriptionConfig {}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioRequest {
    pub realtime_input: RealtimeInput,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeInput {
    pub media_chunks: Vec<MediaChunk>,
}

#[derive(serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaChunk {
    pub mime_type: String,
    pub data: String,
}

// Incoming messages
#[derive(serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    pub setup_complete: Option<SetupComplete>,
    pub server_content: Option<LiveServerContent>,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct SetupComplete {}

#[derive(serde::Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct LiveServerContent {
    pub input_transcription: Option<ServerTranscription>,
    pub turn_complete: Option<bool>,
}

#[derive(serde::Deserialize, Debug, Clone)]
pub struct ServerTranscription {
    pub text: String,
    pub finished: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_request_uses_camel_case_keys() {
        let req = SetupRequest {
            setup: SessionSetup {
                model: "models/test".to_string(),
                language_code: "en-US".to_string(),
                input_audio_transcription: InputTranscriptionConfig::default(),
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["setup"]["model"], "models/test");
        assert_eq!(json["setup"]["languageCode"], "en-US");
        assert!(json["setup"]["inputAudioTranscription"].is_object());
    }

    #[test]
    fn server_message_parses_transcription() {
        let raw = r#"{
            "serverContent": {
                "inputTranscription": { "text": "hello there", "finished": true },
                "turnComplete": false
            }
        }"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        let content = msg.server_content.unwrap();
        let transcription = content.input_transcription.unwrap();
        assert_eq!(transcription.text, "hello there");
        assert_eq!(transcription.finished, Some(true));
        assert_eq!(content.turn_complete, Some(false));
    }

    #[test]
    fn server_message_parses_setup_complete() {
        let msg: ServerMessage = serde_json::from_str(r#"{"setupComplete": {}}"#).unwrap();
        assert!(msg.setup_complete.is_some());
        assert!(msg.server_content.is_none());
    }
}
