//! Live speech recognition backed by the Gemini live WebSocket API.
//!
//! Each capture binding opens its own WebSocket session, taps the shared
//! microphone broadcast, and forwards interim/final transcription events to
//! the capture adapter. Dropping the binding tears the session down and
//! releases the exclusive microphone claim.

use async_trait::async_trait;
use interview_core::capture::{CaptureBinding, RecognitionBackend, RecognitionEvent};
use interview_core::error::CaptureError;
use interview_native_utils::audio::{self, RECOGNIZER_SAMPLE_RATE};
use rubato::Resampler;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};

use crate::config::INPUT_CHUNK_SIZE;

pub struct LiveRecognition {
    api_key: SecretString,
    model: String,
    mic: broadcast::Sender<Vec<f32>>,
    mic_sample_rate: f64,
    bound: Arc<AtomicBool>,
}

/// Exclusive claim on the capture pipeline; released on drop, on every exit
/// path of the upstream task.
struct MicClaim {
    bound: Arc<AtomicBool>,
}

impl Drop for MicClaim {
    fn drop(&mut self) {
        self.bound.store(false, Ordering::SeqCst);
    }
}

impl LiveRecognition {
    pub fn new(
        api_key: SecretString,
        model: String,
        mic: broadcast::Sender<Vec<f32>>,
        mic_sample_rate: f64,
    ) -> Self {
        Self {
            api_key,
            model,
            mic,
            mic_sample_rate,
            bound: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait]
impl RecognitionBackend for LiveRecognition {
    async fn bind(&self) -> Result<CaptureBinding, CaptureError> {
        // A just-dropped binding releases its claim from a cancelled task, so
        // give it a moment before treating the pipeline as taken.
        let mut attempts = 0u32;
        while self
            .bound
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            attempts += 1;
            if attempts > 50 {
                return Err(CaptureError::Unknown(
                    "a live capture binding already exists".to_string(),
                ));
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let claim = MicClaim {
            bound: self.bound.clone(),
        };

        let mut client = gemini_live::connect(self.api_key.expose_secret())
            .await
            .map_err(|e| {
                tracing::warn!("live recognition connect failed: {e:#}");
                CaptureError::Network
            })?;
        client
            .send_setup(&self.model, "en-US")
            .await
            .map_err(|e| {
                tracing::warn!("live recognition setup failed: {e:#}");
                CaptureError::Network
            })?;
        let (mut live_tx, mut live_rx) = client.split();

        let (events_tx, events_rx) = mpsc::channel(64);
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let mut mic_rx = self.mic.subscribe();
        let mic_rate = self.mic_sample_rate;
        let upstream_events = events_tx.clone();

        // Upstream: microphone samples -> resample to 16 kHz -> base64 PCM16.
        tokio::spawn(async move {
            let _claim = claim;
            let mut resampler =
                match audio::create_resampler(mic_rate, RECOGNIZER_SAMPLE_RATE, INPUT_CHUNK_SIZE) {
                    Ok(resampler) => resampler,
                    Err(e) => {
                        tracing::error!("failed to create capture resampler: {e:#}");
                        let _ = upstream_events
                            .send(RecognitionEvent::Error(CaptureError::Unknown(
                                "capture resampler unavailable".to_string(),
                            )))
                            .await;
                        return;
                    }
                };
            let mut pending: Vec<f32> = Vec::new();
            'stream: loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break 'stream,
                    chunk = mic_rx.recv() => match chunk {
                        Ok(samples) => {
                            pending.extend(samples);
                            while pending.len() >= INPUT_CHUNK_SIZE {
                                let frame: Vec<f32> = pending.drain(..INPUT_CHUNK_SIZE).collect();
                                let resampled = match resampler.process(&[frame.as_slice()], None) {
                                    Ok(mut out) => out.pop().unwrap_or_default(),
                                    Err(e) => {
                                        tracing::warn!("capture resample failed: {e}");
                                        continue;
                                    }
                                };
                                let encoded = audio::encode_pcm16(&resampled);
                                if live_tx.send_audio_chunk(encoded).await.is_err() {
                                    let _ = upstream_events
                                        .send(RecognitionEvent::Error(CaptureError::Network))
                                        .await;
                                    break 'stream;
                                }
                            }
                        }
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("microphone stream lagged by {n} chunks");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            // The hardware stream is gone mid-session.
                            let _ = upstream_events
                                .send(RecognitionEvent::Error(CaptureError::PermissionDenied))
                                .await;
                            break 'stream;
                        }
                    }
                }
            }
            let _ = live_tx.close().await;
        });

        // Downstream: transcription events from the recognition service.
        tokio::spawn(async move {
            loop {
                match live_rx.next_event().await {
                    Ok(Some(message)) => {
                        let Some(content) = message.server_content else {
                            continue;
                        };
                        if let Some(transcription) = content.input_transcription {
                            let event = if transcription.finished.unwrap_or(false) {
                                RecognitionEvent::Final(transcription.text)
                            } else {
                                RecognitionEvent::Interim(transcription.text)
                            };
                            if events_tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        // Closed without an error frame; the capture adapter
                        // decides whether to restart.
                        let _ = events_tx.send(RecognitionEvent::Ended).await;
                        return;
                    }
                    Err(e) => {
                        tracing::warn!("live recognition stream error: {e:#}");
                        let _ = events_tx
                            .send(RecognitionEvent::Error(CaptureError::Network))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(CaptureBinding::with_shutdown(events_rx, shutdown_tx))
    }
}
