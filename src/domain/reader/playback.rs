use super::error::ReaderServiceError;
use super::model::SectionStatus;
use super::service::{ReaderService, ReaderServiceApi, ResumePoint};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const BUSY_POLL_INTERVAL: Duration = Duration::from_millis(25);

/// State of the auto-advance queue
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum QueueState {
    #[default]
    Idle,
    /// Sleeping before the next section is prepared
    Waiting { next: usize },
    Generating { next: usize },
    /// Stopped after a failure; nothing is retried until the user acts
    Halted { section: usize, message: String },
}

#[derive(Debug, Default)]
struct PlaybackState {
    active: Option<usize>,
    autoplay: bool,
    queue: QueueState,
    notice: Option<String>,
}

impl PlaybackState {
    fn is_preparing(&self, next: usize) -> bool {
        matches!(self.queue, QueueState::Generating { next: n } if n == next)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaybackStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_section: Option<usize>,
    /// True when the active section was started by auto-advance rather than the user
    pub autoplay: bool,
    pub queue: QueueState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// Single shared player: at most one section is active at a time.
pub struct PlaybackService {
    reader: Arc<ReaderService>,
    state: Mutex<PlaybackState>,
    auto_next_delay: Duration,
}

impl PlaybackService {
    pub fn new(reader: Arc<ReaderService>, auto_next_delay: Duration) -> Self {
        Self {
            reader,
            state: Mutex::new(PlaybackState::default()),
            auto_next_delay,
        }
    }

    pub async fn status(&self) -> PlaybackStatus {
        let state = self.state.lock().await;
        PlaybackStatus {
            active_section: state.active,
            autoplay: state.autoplay,
            queue: state.queue.clone(),
            notice: state.notice.clone(),
        }
    }

    /// User started playing a section; it replaces whatever was active
    pub async fn play(&self, index: usize) -> Result<PlaybackStatus, ReaderServiceError> {
        if self.reader.section_status(index).await? != SectionStatus::Ready {
            return Err(ReaderServiceError::NotReady(index));
        }

        {
            let mut state = self.state.lock().await;
            if let Some(previous) = state.active.replace(index) {
                if previous != index {
                    tracing::debug!(previous = previous, section_index = index, "Switching active section");
                }
            }
            state.autoplay = false;
            state.queue = QueueState::Idle;
        }

        tracing::info!(section_index = index, "Playback started");
        Ok(self.status().await)
    }

    /// Player reached the end of a section. With auto-next on, the following
    /// section is prepared in the background after the configured delay.
    pub async fn ended(self: &Arc<Self>, index: usize) -> Result<PlaybackStatus, ReaderServiceError> {
        let section_count = self.reader.section_count().await?;
        if index >= section_count {
            return Err(ReaderServiceError::SectionNotFound(index));
        }
        let auto_next = self.reader.settings().await.auto_next;
        let next = index + 1;

        {
            let mut state = self.state.lock().await;
            if state.active == Some(index) {
                state.active = None;
            }
            state.autoplay = false;

            if !auto_next || next >= section_count {
                state.queue = QueueState::Idle;
                tracing::info!(section_index = index, auto_next = auto_next, "Playback ended");
                drop(state);
                return Ok(self.status().await);
            }
            state.queue = QueueState::Waiting { next };
        }

        let epoch = self.reader.epoch().await;
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.advance(next, epoch).await;
        });

        tracing::info!(section_index = index, next = next, "Auto-advance scheduled");
        Ok(self.status().await)
    }

    async fn advance(&self, next: usize, epoch: u64) {
        tokio::time::sleep(self.auto_next_delay).await;

        if self.reader.epoch().await != epoch || !self.claim(next).await {
            tracing::debug!(next = next, "Auto-advance cancelled");
            return;
        }

        let outcome = self.prepare(next, epoch).await;

        if self.reader.epoch().await != epoch {
            return;
        }

        let mut state = self.state.lock().await;
        if !state.is_preparing(next) {
            // the user took over in the meantime
            return;
        }
        match outcome {
            Ok(()) => {
                state.active = Some(next);
                state.autoplay = true;
                state.queue = QueueState::Idle;
                tracing::info!(section_index = next, "Auto-advanced to next section");
            }
            Err(ReaderServiceError::Stale) => {
                state.queue = QueueState::Idle;
            }
            Err(e) => {
                let message = format!("Could not prepare section {}: {}", next + 1, e);
                tracing::warn!(section_index = next, error = %e, "Auto-advance halted");
                state.queue = QueueState::Halted {
                    section: next,
                    message: message.clone(),
                };
                state.notice = Some(message);
            }
        }
    }

    /// Move the queue from waiting to generating, unless `play` got there first
    async fn claim(&self, next: usize) -> bool {
        let mut state = self.state.lock().await;
        if !matches!(state.queue, QueueState::Waiting { next: n } if n == next) {
            return false;
        }
        state.queue = QueueState::Generating { next };
        true
    }

    /// Bring the next section to ready. A section already being generated by
    /// another request is awaited, and if that attempt fails it is not retried.
    async fn prepare(&self, next: usize, epoch: u64) -> Result<(), ReaderServiceError> {
        let mut waited = false;
        loop {
            if self.reader.epoch().await != epoch {
                return Err(ReaderServiceError::Stale);
            }
            if !self.state.lock().await.is_preparing(next) {
                return Ok(());
            }

            match self.reader.section_status(next).await? {
                SectionStatus::Ready => return Ok(()),
                status if status.is_busy() => {
                    waited = true;
                    tokio::time::sleep(BUSY_POLL_INTERVAL).await;
                }
                SectionStatus::Error if waited => {
                    let message = self
                        .reader
                        .section(next)
                        .await?
                        .error
                        .unwrap_or_else(|| "generation failed".to_string());
                    return Err(ReaderServiceError::Dependency(message));
                }
                _ => match self.reader.generate_section(next).await {
                    Ok(_) => return Ok(()),
                    // someone else started it between our check and the call
                    Err(ReaderServiceError::Busy(_)) => {}
                    Err(e) => return Err(e),
                },
            }
        }
    }

    pub async fn dismiss_notice(&self) -> PlaybackStatus {
        self.state.lock().await.notice = None;
        self.status().await
    }

    /// Forget the active section and any pending advance, e.g. after a reset
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        *state = PlaybackState::default();
    }

    pub async fn resume(&self) -> Result<Option<ResumePoint>, ReaderServiceError> {
        self.reader.resume_point().await
    }
}
