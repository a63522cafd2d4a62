use crate::types::{
    AudioRequest, InputTranscriptionConfig, MediaChunk, RealtimeInput, ServerMessage,
    SessionSetup, SetupRequest,
};
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, WebSocketStream, connect_async, tungstenite::protocol::Message,
};

type WsWriter =
    futures_util::stream::SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = futures_util::stream::SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

const LIVE_ENDPOINT: &str = "wss://generativelanguage.googleapis.com/ws/google.ai.generativelanguage.v1beta.GenerativeService.BidiGenerateContent";

/// Mime type for raw microphone audio chunks sent upstream.
const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// A client for the Gemini live speech-recognition WebSocket API.
pub struct GeminiLiveClient {
    sender: LiveSender,
    receiver: LiveReceiver,
}

/// Write half of a live connection.
pub struct LiveSender {
    write: WsWriter,
}

/// Read half of a live connection.
pub struct LiveReceiver {
    read: WsReader,
}

/// Establishes a connection to the Gemini live service.
pub async fn connect(api_key: &str) -> Result<GeminiLiveClient> {
    let url = format!("{LIVE_ENDPOINT}?key={api_key}");
    let (ws_stream, _) = connect_async(url)
        .await
        .context("Failed to connect to Gemini live WebSocket")?;

    tracing::info!("Connected to Gemini live WebSocket.");
    let (write, read) = ws_stream.split();
    Ok(GeminiLiveClient {
        sender: LiveSender { write },
        receiver: LiveReceiver { read },
    })
}

impl GeminiLiveClient {
    /// Sends the initial session configuration.
    pub async fn send_setup(&mut self, model: &str, language_code: &str) -> Result<()> {
        self.sender.send_setup(model, language_code).await
    }

    /// Splits the client so audio can be written while events are read.
    pub fn split(self) -> (LiveSender, LiveReceiver) {
        (self.sender, self.receiver)
    }
}

impl LiveSender {
    /// Sends the initial session configuration.
    pub async fn send_setup(&mut self, model: &str, language_code: &str) -> Result<()> {
        let req = SetupRequest {
            setup: SessionSetup {
                model: format!("models/{model}"),
                language_code: language_code.to_string(),
                input_audio_transcription: InputTranscriptionConfig::default(),
            },
        };
        let json = serde_json::to_string(&req)?;
        self.write
            .send(Message::Text(json))
            .await
            .context("Failed to send setup message")
    }

    /// Sends a base64-encoded chunk of PCM16 microphone audio.
    pub async fn send_audio_chunk(&mut self, base64_pcm: String) -> Result<()> {
        let req = AudioRequest {
            realtime_input: RealtimeInput {
                media_chunks: vec![MediaChunk {
                    mime_type: PCM_MIME_TYPE.to_string(),
                    data: base64_pcm,
                }],
            },
        };
        let json = serde_json::to_string(&req)?;
        self.write
            .send(Message::Text(json))
            .await
            .context("Failed to send audio chunk")
    }

    /// Closes the connection; the read half will observe the close frame.
    pub async fn close(&mut self) -> Result<()> {
        self.write
            .send(Message::Close(None))
            .await
            .context("Failed to send close frame")
    }
}

impl LiveReceiver {
    /// Reads the next event from the server. Returns `None` once the
    /// connection has closed.
    pub async fn next_event(&mut self) -> Result<Option<ServerMessage>> {
        while let Some(msg) = self.read.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    let event: ServerMessage = serde_json::from_str(&text)
                        .context("Failed to deserialize server event")?;
                    return Ok(Some(event));
                }
                Ok(Message::Binary(bytes)) => {
                    // The live API also frames JSON as binary messages.
                    let event: ServerMessage = serde_json::from_slice(&bytes)
                        .context("Failed to deserialize binary server event")?;
                    return Ok(Some(event));
                }
                Ok(Message::Close(_)) => {
                    tracing::info!("Gemini live WebSocket connection closed.");
                    return Ok(None);
                }
                Err(e) => {
                    tracing::error!("Error reading from Gemini live WebSocket: {}", e);
                    return Err(e.into());
                }
                _ => { /* Ignore Ping/Pong */ }
            }
        }
        Ok(None)
    }
}
