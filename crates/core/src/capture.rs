use crate::error::CaptureError;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{mpsc, oneshot};

/// Maximum automatic rebinds per enable cycle. Platforms silently time out
/// long-running recognition sessions, so a spontaneous drop is restarted; the
/// cap keeps a dead backend from looping forever.
pub const AUTO_RESTART_LIMIT: u32 = 5;

/// Events emitted by a bound recognition stream.
#[derive(Debug, Clone)]
pub enum RecognitionEvent {
    /// Provisional transcription, subject to revision. Display only.
    Interim(String),
    /// Committed transcription chunk.
    Final(String),
    /// The stream terminated with a classified error.
    Error(CaptureError),
    /// The stream terminated without reporting an error.
    Ended,
}

/// Updates the capture adapter delivers to the session event loop.
#[derive(Debug, Clone)]
pub enum CaptureUpdate {
    Interim(String),
    Final(String),
    Error(CaptureError),
    /// Capture stopped and will not restart on its own.
    Stopped,
}

/// A live recognition stream. Dropping the binding signals the backend to
/// stop and release the microphone.
pub struct CaptureBinding {
    events: mpsc::Receiver<RecognitionEvent>,
    _shutdown: Option<oneshot::Sender<()>>,
}

impl CaptureBinding {
    pub fn new(events: mpsc::Receiver<RecognitionEvent>) -> Self {
        Self {
            events,
            _shutdown: None,
        }
    }

    /// Binding whose drop fires a shutdown signal to the backend tasks.
    pub fn with_shutdown(events: mpsc::Receiver<RecognitionEvent>, shutdown: oneshot::Sender<()>) -> Self {
        Self {
            events,
            _shutdown: Some(shutdown),
        }
    }

    async fn next(&mut self) -> Option<RecognitionEvent> {
        self.events.recv().await
    }
}

/// Platform speech-recognition capability: continuous mode, interim and final
/// results. Binding acquires the microphone; at most one live binding exists
/// at a time.
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn bind(&self) -> Result<CaptureBinding, CaptureError>;
}

/// Backend for platforms without a recognition capability. Every bind fails,
/// which forces the session into manual text input.
pub struct UnsupportedRecognition;

#[async_trait]
impl RecognitionBackend for UnsupportedRecognition {
    async fn bind(&self) -> Result<CaptureBinding, CaptureError> {
        Err(CaptureError::Unsupported)
    }
}

/// Wraps a recognition backend into a single accumulating capture channel
/// with restart-on-drop and typed error classification.
///
/// Final text chunks are forwarded as [`CaptureUpdate`]s to the owning
/// session's event loop; the adapter itself never touches the answer buffer.
pub struct CaptureAdapter<B: RecognitionBackend> {
    backend: Arc<B>,
    updates: mpsc::Sender<CaptureUpdate>,
    enabled: Arc<AtomicBool>,
    error: Option<CaptureError>,
    pump: Option<tokio::task::JoinHandle<()>>,
}

impl<B: RecognitionBackend + 'static> CaptureAdapter<B> {
    pub fn new(backend: B, updates: mpsc::Sender<CaptureUpdate>) -> Self {
        Self {
            backend: Arc::new(backend),
            updates,
            enabled: Arc::new(AtomicBool::new(false)),
            error: None,
            pump: None,
        }
    }

    /// Last classified capture error, if any. A pending error blocks
    /// [`enable`](Self::enable) until cleared.
    pub fn error(&self) -> Option<&CaptureError> {
        self.error.as_ref()
    }

    /// Records an error reported through the update channel. Stops any
    /// auto-restart by withdrawing the enabled intent.
    pub fn note_error(&mut self, error: CaptureError) {
        self.enabled.store(false, Ordering::SeqCst);
        self.reset();
        self.error = Some(error);
    }

    pub fn clear_error(&mut self) {
        self.error = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Binds the backend and starts forwarding recognition events. Any stale
    /// binding is torn down first. Rejected while an error is pending.
    pub async fn enable(&mut self) -> Result<(), CaptureError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        self.reset();
        self.enabled.store(true, Ordering::SeqCst);

        let binding = match self.backend.bind().await {
            Ok(binding) => binding,
            Err(error) => {
                self.enabled.store(false, Ordering::SeqCst);
                self.error = Some(error.clone());
                return Err(error);
            }
        };

        self.pump = Some(tokio::spawn(pump(
            binding,
            self.backend.clone(),
            self.enabled.clone(),
            self.updates.clone(),
        )));
        Ok(())
    }

    /// Stops capture and releases the microphone binding. The accumulated
    /// answer text lives in the session and is untouched.
    pub fn disable(&mut self) {
        self.enabled.store(false, Ordering::SeqCst);
        self.reset();
    }

    fn reset(&mut self) {
        if let Some(pump) = self.pump.take() {
            // Aborting drops the binding, which releases the backend stream.
            pump.abort();
        }
    }
}

impl<B: RecognitionBackend> Drop for CaptureAdapter<B> {
    fn drop(&mut self) {
        self.enabled.store(false, Ordering::SeqCst);
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

async fn pump<B: RecognitionBackend + 'static>(
    mut binding: CaptureBinding,
    backend: Arc<B>,
    enabled: Arc<AtomicBool>,
    updates: mpsc::Sender<CaptureUpdate>,
) {
    let mut restarts = 0u32;
    loop {
        match binding.next().await {
            Some(RecognitionEvent::Interim(text)) => {
                if updates.send(CaptureUpdate::Interim(text)).await.is_err() {
                    return;
                }
            }
            Some(RecognitionEvent::Final(text)) => {
                if updates.send(CaptureUpdate::Final(text)).await.is_err() {
                    return;
                }
            }
            Some(RecognitionEvent::Error(error)) => {
                tracing::warn!("recognition stream failed: {error}");
                let _ = updates.send(CaptureUpdate::Error(error)).await;
                return;
            }
            Some(RecognitionEvent::Ended) | None => {
                // Spontaneous termination without an error. Rebind while the
                // caller still wants capture, at most once per termination.
                if enabled.load(Ordering::SeqCst) && restarts < AUTO_RESTART_LIMIT {
                    restarts += 1;
                    tracing::debug!(restarts, "recognition stream dropped, restarting");
                    // Release the dead stream first; backends hold an
                    // exclusive microphone claim until the binding drops.
                    drop(binding);
                    match backend.bind().await {
                        Ok(next) => {
                            binding = next;
                            continue;
                        }
                        Err(error) => {
                            let _ = updates.send(CaptureUpdate::Error(error)).await;
                            return;
                        }
                    }
                }
                let _ = updates.send(CaptureUpdate::Stopped).await;
                return;
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    /// Scripted outcome for one `bind()` call.
    pub(crate) enum BindScript {
        Fail(CaptureError),
        /// Emit the listed events, then drop the stream (silent termination).
        Emit(Vec<RecognitionEvent>),
        /// Stay open; the test injects events through `senders`.
        Open,
    }

    pub(crate) struct FakeBackend {
        scripts: Mutex<VecDeque<BindScript>>,
        pub(crate) binds: Arc<AtomicUsize>,
        pub(crate) senders: Arc<Mutex<Vec<mpsc::Sender<RecognitionEvent>>>>,
    }

    impl FakeBackend {
        pub(crate) fn new(scripts: Vec<BindScript>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                binds: Arc::new(AtomicUsize::new(0)),
                senders: Arc::new(Mutex::new(Vec::new())),
            }
        }

        pub(crate) fn handles(
            &self,
        ) -> (Arc<AtomicUsize>, Arc<Mutex<Vec<mpsc::Sender<RecognitionEvent>>>>) {
            (self.binds.clone(), self.senders.clone())
        }
    }

    #[async_trait]
    impl RecognitionBackend for FakeBackend {
        async fn bind(&self) -> Result<CaptureBinding, CaptureError> {
            self.binds.fetch_add(1, Ordering::SeqCst);
            let script = self
                .scripts
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(BindScript::Open);
            match script {
                BindScript::Fail(error) => Err(error),
                BindScript::Emit(events) => {
                    let (tx, rx) = mpsc::channel(16);
                    tokio::spawn(async move {
                        for event in events {
                            if tx.send(event).await.is_err() {
                                return;
                            }
                        }
                    });
                    Ok(CaptureBinding::new(rx))
                }
                BindScript::Open => {
                    let (tx, rx) = mpsc::channel(16);
                    self.senders.lock().unwrap().push(tx);
                    Ok(CaptureBinding::new(rx))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fake::{BindScript, FakeBackend};
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    async fn wait_until(mut condition: impl FnMut() -> bool) {
        for _ in 0..100 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    fn adapter_with(
        scripts: Vec<BindScript>,
    ) -> (
        CaptureAdapter<FakeBackend>,
        mpsc::Receiver<CaptureUpdate>,
        Arc<AtomicUsize>,
        Arc<std::sync::Mutex<Vec<mpsc::Sender<RecognitionEvent>>>>,
    ) {
        let backend = FakeBackend::new(scripts);
        let (binds, senders) = backend.handles();
        let (tx, rx) = mpsc::channel(32);
        (CaptureAdapter::new(backend, tx), rx, binds, senders)
    }

    #[tokio::test]
    async fn forwards_interim_and_final_results() {
        let (mut adapter, mut updates, _, senders) = adapter_with(vec![BindScript::Open]);
        adapter.enable().await.unwrap();

        let sender = senders.lock().unwrap()[0].clone();
        sender
            .send(RecognitionEvent::Interim("hel".to_string()))
            .await
            .unwrap();
        sender
            .send(RecognitionEvent::Final("hello".to_string()))
            .await
            .unwrap();

        assert!(matches!(
            updates.recv().await,
            Some(CaptureUpdate::Interim(t)) if t == "hel"
        ));
        assert!(matches!(
            updates.recv().await,
            Some(CaptureUpdate::Final(t)) if t == "hello"
        ));
    }

    #[tokio::test]
    async fn silent_drop_restarts_while_enabled() {
        let (mut adapter, mut updates, binds, senders) = adapter_with(vec![
            BindScript::Emit(vec![RecognitionEvent::Final("first".to_string())]),
            BindScript::Open,
        ]);
        adapter.enable().await.unwrap();

        assert!(matches!(
            updates.recv().await,
            Some(CaptureUpdate::Final(t)) if t == "first"
        ));

        // The scripted stream drops after emitting; the pump must rebind.
        wait_until(|| binds.load(Ordering::SeqCst) == 2).await;

        let sender = senders.lock().unwrap()[0].clone();
        sender
            .send(RecognitionEvent::Final("second".to_string()))
            .await
            .unwrap();
        assert!(matches!(
            updates.recv().await,
            Some(CaptureUpdate::Final(t)) if t == "second"
        ));
    }

    #[tokio::test]
    async fn classified_error_suppresses_restart() {
        let (mut adapter, mut updates, binds, _) = adapter_with(vec![BindScript::Emit(vec![
            RecognitionEvent::Error(CaptureError::PermissionDenied),
        ])]);
        adapter.enable().await.unwrap();

        let update = updates.recv().await.unwrap();
        let CaptureUpdate::Error(error) = update else {
            panic!("expected an error update, got {update:?}");
        };
        assert_eq!(error, CaptureError::PermissionDenied);
        adapter.note_error(error);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(binds.load(Ordering::SeqCst), 1, "no rebind after an error");

        // Re-enable is rejected until the error is explicitly cleared.
        assert_eq!(
            adapter.enable().await.unwrap_err(),
            CaptureError::PermissionDenied
        );
        adapter.clear_error();
        adapter.enable().await.unwrap();
        assert_eq!(binds.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn restart_attempts_are_capped() {
        // Every binding drops immediately; the pump may rebind at most
        // AUTO_RESTART_LIMIT times before giving up.
        let scripts = (0..(AUTO_RESTART_LIMIT + 3))
            .map(|_| BindScript::Emit(vec![]))
            .collect();
        let (mut adapter, mut updates, binds, _) = adapter_with(scripts);
        adapter.enable().await.unwrap();

        assert!(matches!(updates.recv().await, Some(CaptureUpdate::Stopped)));
        assert_eq!(binds.load(Ordering::SeqCst), 1 + AUTO_RESTART_LIMIT as usize);
    }

    #[tokio::test]
    async fn bind_failure_is_recorded() {
        let (mut adapter, _updates, _, _) =
            adapter_with(vec![BindScript::Fail(CaptureError::Unsupported)]);
        assert_eq!(
            adapter.enable().await.unwrap_err(),
            CaptureError::Unsupported
        );
        assert_eq!(adapter.error(), Some(&CaptureError::Unsupported));
        assert!(!adapter.is_enabled());
    }

    #[tokio::test]
    async fn disable_releases_the_binding() {
        let (mut adapter, _updates, binds, senders) = adapter_with(vec![BindScript::Open]);
        adapter.enable().await.unwrap();
        assert!(adapter.is_enabled());

        adapter.disable();
        assert!(!adapter.is_enabled());

        // The pump is gone: its receiver closes and no rebind happens.
        wait_until(|| senders.lock().unwrap()[0].is_closed()).await;
        assert_eq!(binds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn enable_resets_a_stale_binding() {
        let (mut adapter, _updates, binds, senders) =
            adapter_with(vec![BindScript::Open, BindScript::Open]);
        adapter.enable().await.unwrap();
        adapter.enable().await.unwrap();

        assert_eq!(binds.load(Ordering::SeqCst), 2);
        wait_until(|| senders.lock().unwrap()[0].is_closed()).await;
        assert!(!senders.lock().unwrap()[1].is_closed());
    }
}
