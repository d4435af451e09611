//! Test doubles for the external collaborators.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore, broadcast};

use tempfile::TempDir;

use crate::common::error::{DeliveryError, TranscodeError};
use crate::config::AppConfig;
use crate::config::settings::DEFAULT_CHECKPOINTS;
use crate::infrastructure::messaging::{MenuOption, MessageHandle, Messenger};
use crate::infrastructure::messaging::ChannelMessenger;
use crate::infrastructure::transcoder::Transcoder;
use crate::modules::job::{JobEvent, JobKind, JobStatus};
use crate::modules::session::{OwnerId, Quality, SessionStore};
use crate::state::AppState;
use crate::workers::progress::MessengerProgressReporter;
use crate::workers::scheduler::{Scheduler, SchedulerSettings};

#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    Menu { text: String, options: Vec<String> },
    Progress(u8),
    Result { kind: JobKind, path: PathBuf, existed: bool },
    Error(String),
    Notice(String),
}

#[derive(Default)]
pub struct RecordingMessenger {
    sent: Mutex<Vec<(OwnerId, Sent)>>,
    unreachable: AtomicBool,
    fail_results: AtomicBool,
}

impl RecordingMessenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn set_fail_results(&self, fail: bool) {
        self.fail_results.store(fail, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<(OwnerId, Sent)> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, owner: OwnerId) -> Vec<Sent> {
        self.sent
            .lock()
            .iter()
            .filter(|(o, _)| *o == owner)
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn progress_for(&self, owner: OwnerId) -> Vec<u8> {
        self.sent_to(owner)
            .into_iter()
            .filter_map(|s| match s {
                Sent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn errors_for(&self, owner: OwnerId) -> Vec<String> {
        self.sent_to(owner)
            .into_iter()
            .filter_map(|s| match s {
                Sent::Error(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    pub fn notices_for(&self, owner: OwnerId) -> Vec<String> {
        self.sent_to(owner)
            .into_iter()
            .filter_map(|s| match s {
                Sent::Notice(m) => Some(m),
                _ => None,
            })
            .collect()
    }

    fn record(&self, owner: OwnerId, sent: Sent) -> Result<(), DeliveryError> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unreachable(owner));
        }
        self.sent.lock().push((owner, sent));
        Ok(())
    }
}

#[async_trait]
impl Messenger for RecordingMessenger {
    async fn send_menu(
        &self,
        owner: OwnerId,
        text: &str,
        options: &[MenuOption],
    ) -> Result<(), DeliveryError> {
        let options = options.iter().map(|o| o.data.clone()).collect();
        self.record(
            owner,
            Sent::Menu {
                text: text.to_string(),
                options,
            },
        )
    }

    async fn send_progress(
        &self,
        owner: OwnerId,
        _handle: MessageHandle,
        percent: u8,
    ) -> Result<(), DeliveryError> {
        self.record(owner, Sent::Progress(percent))
    }

    async fn send_result(
        &self,
        owner: OwnerId,
        kind: JobKind,
        artifact: &Path,
    ) -> Result<(), DeliveryError> {
        if self.fail_results.load(Ordering::SeqCst) {
            return Err(DeliveryError::Unreachable(owner));
        }
        self.record(
            owner,
            Sent::Result {
                kind,
                path: artifact.to_path_buf(),
                existed: artifact.exists(),
            },
        )
    }

    async fn send_error(&self, owner: OwnerId, message: &str) -> Result<(), DeliveryError> {
        self.record(owner, Sent::Error(message.to_string()))
    }

    async fn send_notice(&self, owner: OwnerId, text: &str) -> Result<(), DeliveryError> {
        self.record(owner, Sent::Notice(text.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TranscodeCall {
    pub kind: JobKind,
    pub input: PathBuf,
    pub output: PathBuf,
    pub quality: Option<Quality>,
}

/// Writes a small output file instead of encoding.
///
/// Inputs whose file name contains `broken` fail, `hang` never returns.
/// With a gate, every call waits for one permit before finishing.
#[derive(Default)]
pub struct FakeTranscoder {
    calls: Mutex<Vec<TranscodeCall>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    gate: Option<Arc<Semaphore>>,
    pub started: Notify,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let transcoder = Self {
            gate: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (transcoder, gate)
    }

    pub fn calls(&self) -> Vec<TranscodeCall> {
        self.calls.lock().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn run(&self, call: TranscodeCall) -> Result<PathBuf, TranscodeError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.calls.lock().push(call.clone());
        self.started.notify_one();

        let result = self.produce(&call).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn produce(&self, call: &TranscodeCall) -> Result<PathBuf, TranscodeError> {
        if let Some(gate) = &self.gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        let name = call
            .input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if name.contains("hang") {
            std::future::pending::<()>().await;
        }
        if !call.input.exists() {
            return Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: format!("{name}: No such file or directory"),
            });
        }
        if name.contains("broken") {
            // partial output left behind, like a real encoder would
            let _ = tokio::fs::write(&call.output, b"partial").await;
            return Err(TranscodeError::Failed {
                status: "exit status: 1".to_string(),
                stderr: "Invalid data found when processing input".to_string(),
            });
        }

        tokio::fs::write(&call.output, b"transcoded")
            .await
            .map_err(TranscodeError::Spawn)?;
        Ok(call.output.clone())
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn compress(
        &self,
        input: &Path,
        output: &Path,
        quality: Quality,
    ) -> Result<PathBuf, TranscodeError> {
        self.run(TranscodeCall {
            kind: JobKind::Compress,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            quality: Some(quality),
        })
        .await
    }

    async fn extract_audio(&self, input: &Path, output: &Path) -> Result<PathBuf, TranscodeError> {
        self.run(TranscodeCall {
            kind: JobKind::ExtractAudio,
            input: input.to_path_buf(),
            output: output.to_path_buf(),
            quality: None,
        })
        .await
    }
}

/// Writes a fake upload into `dir`.
pub async fn upload(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    tokio::fs::write(&path, b"video").await.unwrap();
    path
}

/// Waits for the next event matching `status`, failing the test after 5s.
pub async fn wait_for_status(
    rx: &mut broadcast::Receiver<JobEvent>,
    status: JobStatus,
) -> JobEvent {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let event = rx.recv().await.unwrap();
            if event.status == status {
                return event;
            }
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for a {status} event"))
}

/// Collects events until `count` terminal ones were seen.
pub async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<JobEvent>,
    count: usize,
) -> Vec<JobEvent> {
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut events = Vec::new();
        let mut terminal = 0;
        while terminal < count {
            let event = rx.recv().await.unwrap();
            if event.status.is_terminal() {
                terminal += 1;
            }
            events.push(event);
        }
        events
    })
    .await
    .expect("timed out waiting for terminal events")
}

/// Application state over a temp work dir with recording doubles.
///
/// The scheduler worker is not spawned, so submitted jobs stay queued.
pub struct TestApp {
    pub state: AppState,
    pub messenger: Arc<RecordingMessenger>,
    pub transcoder: Arc<FakeTranscoder>,
    dir: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_messenger(Arc::new(RecordingMessenger::new()))
    }

    pub fn with_messenger(messenger: Arc<RecordingMessenger>) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path());
        let transcoder = Arc::new(FakeTranscoder::new());
        let progress = Arc::new(MessengerProgressReporter::new(messenger.clone()));
        let scheduler = Scheduler::new(
            transcoder.clone(),
            messenger.clone(),
            progress,
            SchedulerSettings::from_config(&config),
        );
        let sessions = SessionStore::new(config.default_quality);
        let state = AppState::new(
            config,
            sessions,
            scheduler,
            messenger.clone(),
            ChannelMessenger::new(),
        );

        Self {
            state,
            messenger,
            transcoder,
            dir,
        }
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }
}

pub fn test_config(work_dir: &Path) -> AppConfig {
    AppConfig {
        server_port: 0,
        work_dir: work_dir.to_path_buf(),
        default_quality: Quality::P720,
        progress_checkpoints: DEFAULT_CHECKPOINTS.to_vec(),
        progress_step: Duration::ZERO,
        transcode_timeout: None,
        session_ttl: Some(Duration::from_secs(3600)),
        session_sweep_interval: Duration::from_secs(60),
        ffmpeg_bin: "ffmpeg".to_string(),
        max_upload_bytes: 1024 * 1024,
    }
}
