use crate::error::PlaybackError;
use async_trait::async_trait;
use interview_native_utils::audio;
#[cfg(test)]
use mockall::automock;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// External text-to-speech capability: text in, base64 PCM16 payload out.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<String, PlaybackError>;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str) -> Result<String, PlaybackError> {
        (**self).synthesize(text).await
    }
}

/// What the session orchestrator sees of the playback adapter.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), PlaybackError>;
}

/// Destination for decoded audio samples. Implementations enqueue and return;
/// audible playback continues on the audio thread.
pub trait AudioSink: Send {
    fn play(&mut self, samples: &[f32]) -> Result<(), PlaybackError>;
}

/// Converts question text into audible speech: synthesis request, PCM16
/// decode, then hand-off to the sink. Playback is fire-and-forget once the
/// sink accepts the samples; the busy flag covers only the request + decode
/// window.
pub struct SpeechPlayback<S, K> {
    synthesizer: S,
    sink: Mutex<K>,
    busy: Arc<AtomicBool>,
}

impl<S, K> SpeechPlayback<S, K> {
    pub fn new(synthesizer: S, sink: K) -> Self {
        Self {
            synthesizer,
            sink: Mutex::new(sink),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Shared handle to the busy flag, for UIs that render a "speaking" state.
    pub fn busy_flag(&self) -> Arc<AtomicBool> {
        self.busy.clone()
    }
}

#[async_trait]
impl<S, K> Speaker for SpeechPlayback<S, K>
where
    S: SpeechSynthesizer,
    K: AudioSink,
{
    async fn speak(&self, text: &str) -> Result<(), PlaybackError> {
        // Concurrent speak calls queue on the sink lock: audio for question
        // i+1 must not overlap question i.
        let mut sink = self.sink.lock().await;
        self.busy.store(true, Ordering::SeqCst);
        let result = request_and_play(&self.synthesizer, &mut *sink, text).await;
        self.busy.store(false, Ordering::SeqCst);
        result
    }
}

async fn request_and_play<S, K>(
    synthesizer: &S,
    sink: &mut K,
    text: &str,
) -> Result<(), PlaybackError>
where
    S: SpeechSynthesizer,
    K: AudioSink,
{
    let payload = synthesizer.synthesize(text).await?;
    if payload.trim().is_empty() {
        return Err(PlaybackError::EmptyPayload);
    }
    let samples = audio::decode_pcm16(payload.trim())?;
    if samples.is_empty() {
        return Err(PlaybackError::EmptyPayload);
    }
    sink.play(&samples)
}

/// Speaker for text-only sessions: accepts every request and plays nothing.
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, _text: &str) -> Result<(), PlaybackError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct VecSink {
        samples: Arc<std::sync::Mutex<Vec<f32>>>,
    }

    impl AudioSink for VecSink {
        fn play(&mut self, samples: &[f32]) -> Result<(), PlaybackError> {
            self.samples.lock().unwrap().extend_from_slice(samples);
            Ok(())
        }
    }

    fn vec_sink() -> (VecSink, Arc<std::sync::Mutex<Vec<f32>>>) {
        let samples = Arc::new(std::sync::Mutex::new(Vec::new()));
        (
            VecSink {
                samples: samples.clone(),
            },
            samples,
        )
    }

    #[tokio::test]
    async fn decoded_samples_reach_the_sink() {
        let payload = audio::encode_pcm16(&[0.0, 0.5, -0.5]);
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(move |_| Ok(payload.clone()));

        let (sink, samples) = vec_sink();
        let playback = SpeechPlayback::new(synthesizer, sink);

        playback.speak("Tell me about yourself").await.unwrap();

        let samples = samples.lock().unwrap();
        assert_eq!(samples.len(), 3);
        assert!((samples[1] - 0.5).abs() < 0.001);
        assert!(!playback.is_busy(), "busy flag must clear after the request");
    }

    #[tokio::test]
    async fn empty_payload_is_a_playback_error() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().returning(|_| Ok(String::new()));

        let (sink, samples) = vec_sink();
        let playback = SpeechPlayback::new(synthesizer, sink);

        let err = playback.speak("anything").await.unwrap_err();
        assert!(matches!(err, PlaybackError::EmptyPayload));
        assert!(samples.lock().unwrap().is_empty());
        assert!(!playback.is_busy());
    }

    #[tokio::test]
    async fn undecodable_payload_is_a_playback_error() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_| Ok("not base64 !!!".to_string()));

        let (sink, _) = vec_sink();
        let playback = SpeechPlayback::new(synthesizer, sink);

        let err = playback.speak("anything").await.unwrap_err();
        assert!(matches!(err, PlaybackError::Decode(_)));
        assert!(!playback.is_busy());
    }

    #[tokio::test]
    async fn synthesis_failure_clears_busy_flag() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_| Err(PlaybackError::Synthesis("boom".to_string())));

        let (sink, _) = vec_sink();
        let playback = SpeechPlayback::new(synthesizer, sink);

        assert!(playback.speak("anything").await.is_err());
        assert!(!playback.is_busy());
    }
}
