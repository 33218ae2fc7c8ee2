use super::error::ReaderServiceError;
use super::model::{
    LastPlayed, ProgressRequest, ReaderSettings, Section, SectionRecord, SectionResponse,
    SectionStatus, SessionRecord, SessionResponse, UpdateSettingsRequest, UpdateViewRequest,
    ViewState, Voice, MAX_PLAYBACK_RATE, MIN_PLAYBACK_RATE,
};
use crate::domain::audio::{AudioDecoder, WavAudio};
use crate::domain::text::{decode_text_file, split};
use crate::infrastructure::repositories::{
    ReflowRepository, SessionRepository, SpeechPayload, SpeechRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use moka::future::Cache;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};

const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
pub struct ReaderOptions {
    pub max_section_chars: usize,
    pub page_generation_delay: Duration,
    pub bulk_download_delay: Duration,
    pub reflow_cache_enabled: bool,
}

/// Where playback stopped last time, shown as a "continue listening" banner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResumePoint {
    pub section_index: usize,
    pub time_secs: f64,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

/// A file produced by a download or export
#[derive(Debug, Clone)]
pub struct Download<T> {
    pub file_name: String,
    pub content: T,
}

struct Document {
    file_name: String,
    original_text: String,
    sections: Vec<Section>,
}

#[derive(Default)]
struct ReaderState {
    document: Option<Document>,
    settings: ReaderSettings,
    last_played: Option<LastPlayed>,
    view: ViewState,
    /// Bumped whenever the document is replaced or reset; in-flight work
    /// started under an older epoch drops its result.
    epoch: u64,
}

impl ReaderState {
    fn document(&self) -> Result<&Document, ReaderServiceError> {
        self.document.as_ref().ok_or(ReaderServiceError::NoSession)
    }

    fn section(&self, index: usize) -> Result<&Section, ReaderServiceError> {
        self.document()?
            .sections
            .get(index)
            .ok_or(ReaderServiceError::SectionNotFound(index))
    }

    fn section_mut(&mut self, index: usize) -> Result<&mut Section, ReaderServiceError> {
        self.document
            .as_mut()
            .ok_or(ReaderServiceError::NoSession)?
            .sections
            .get_mut(index)
            .ok_or(ReaderServiceError::SectionNotFound(index))
    }

    fn to_record(&self) -> Option<SessionRecord> {
        let document = self.document.as_ref()?;
        Some(SessionRecord {
            file_name: document.file_name.clone(),
            original_text: document.original_text.clone(),
            sections: document
                .sections
                .iter()
                .map(|s| SectionRecord {
                    index: s.index,
                    content: s.content.clone(),
                    progress: s.progress,
                })
                .collect(),
            settings: self.settings.clone(),
            last_played: self.last_played,
            saved_at: Utc::now(),
        })
    }

    fn to_response(&self) -> Result<SessionResponse, ReaderServiceError> {
        let document = self.document()?;
        Ok(SessionResponse {
            file_name: document.file_name.clone(),
            section_count: document.sections.len(),
            sections: document.sections.iter().map(SectionResponse::from).collect(),
            settings: self.settings.clone(),
            last_played: self.last_played,
        })
    }
}

pub struct ReaderService {
    state: RwLock<ReaderState>,
    /// Held from snapshot to write so saves land in state order
    persist_lock: Mutex<()>,
    reflow_repo: Arc<dyn ReflowRepository>,
    speech_repo: Arc<dyn SpeechRepository>,
    session_repo: Arc<SessionRepository>,
    decoder: Arc<AudioDecoder>,
    reflow_cache: Option<Cache<String, String>>,
    options: ReaderOptions,
}

impl ReaderService {
    pub fn new(
        reflow_repo: Arc<dyn ReflowRepository>,
        speech_repo: Arc<dyn SpeechRepository>,
        session_repo: Arc<SessionRepository>,
        decoder: Arc<AudioDecoder>,
        options: ReaderOptions,
    ) -> Self {
        let reflow_cache = if options.reflow_cache_enabled {
            Some(
                Cache::builder()
                    .max_capacity(500)
                    .time_to_idle(Duration::from_secs(60 * 60))
                    .build(),
            )
        } else {
            None
        };

        Self {
            state: RwLock::new(ReaderState::default()),
            persist_lock: Mutex::new(()),
            reflow_repo,
            speech_repo,
            session_repo,
            decoder,
            reflow_cache,
            options,
        }
    }

    pub fn reflow_provider(&self) -> &'static str {
        self.reflow_repo.provider()
    }

    pub fn speech_provider(&self) -> &'static str {
        self.speech_repo.provider()
    }
}

#[async_trait]
pub trait ReaderServiceApi: Send + Sync {
    /// Decode and split an uploaded file, replacing whatever was loaded
    async fn load_file(
        &self,
        file_name: String,
        bytes: &[u8],
    ) -> Result<SessionResponse, ReaderServiceError>;

    async fn session(&self) -> Result<SessionResponse, ReaderServiceError>;

    /// Drop the document, its audio and both persisted records
    async fn reset(&self) -> Result<(), ReaderServiceError>;

    /// Reload persisted state at startup. Every section comes back pending.
    async fn restore(&self) -> Result<bool, ReaderServiceError>;

    async fn section(&self, index: usize) -> Result<SectionResponse, ReaderServiceError>;

    async fn section_count(&self) -> Result<usize, ReaderServiceError>;

    async fn section_status(&self, index: usize) -> Result<SectionStatus, ReaderServiceError>;

    /// Reflow then synthesize one section. Calling it on a failed section is the manual retry.
    async fn generate_section(&self, index: usize) -> Result<SectionResponse, ReaderServiceError>;

    /// Generate every section of a page that has no audio yet, one request at a time
    async fn generate_page(&self, page: usize) -> Result<Vec<SectionResponse>, ReaderServiceError>;

    async fn section_audio(
        &self,
        index: usize,
    ) -> Result<Download<Arc<WavAudio>>, ReaderServiceError>;

    async fn section_text(&self, index: usize) -> Result<Download<String>, ReaderServiceError>;

    async fn original_text(&self) -> Result<Download<String>, ReaderServiceError>;

    async fn settings(&self) -> ReaderSettings;

    async fn update_settings(
        &self,
        request: UpdateSettingsRequest,
    ) -> Result<ReaderSettings, ReaderServiceError>;

    async fn view(&self) -> ViewState;

    async fn update_view(&self, request: UpdateViewRequest)
        -> Result<ViewState, ReaderServiceError>;

    async fn record_progress(
        &self,
        index: usize,
        request: ProgressRequest,
    ) -> Result<SectionResponse, ReaderServiceError>;

    async fn resume_point(&self) -> Result<Option<ResumePoint>, ReaderServiceError>;

    /// Write every ready section's WAV into `dir`, pausing between files
    async fn export_ready_audio(&self, dir: &Path) -> Result<Vec<PathBuf>, ReaderServiceError>;

    async fn epoch(&self) -> u64;
}

#[async_trait]
impl ReaderServiceApi for ReaderService {
    async fn load_file(
        &self,
        file_name: String,
        bytes: &[u8],
    ) -> Result<SessionResponse, ReaderServiceError> {
        let file_name = sanitize_file_name(&file_name);
        let text = decode_text_file(bytes)?;
        let chunks = split(&text, self.options.max_section_chars)?;

        if chunks.is_empty() {
            return Err(ReaderServiceError::Invalid(
                "file contains no readable text".to_string(),
            ));
        }

        tracing::info!(
            file_name = %file_name,
            file_size = bytes.len(),
            text_length = text.chars().count(),
            section_count = chunks.len(),
            max_section_chars = self.options.max_section_chars,
            "File loaded and split into sections"
        );

        let sections = chunks
            .into_iter()
            .enumerate()
            .map(|(index, content)| Section::new(index, content, file_name.clone()))
            .collect();

        let response = {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.document = Some(Document {
                file_name,
                original_text: text,
                sections,
            });
            state.last_played = None;
            state.view.current_page = 0;
            state.to_response()?
        };

        self.persist().await?;
        self.persist_view().await?;
        Ok(response)
    }

    async fn session(&self) -> Result<SessionResponse, ReaderServiceError> {
        self.state.read().await.to_response()
    }

    async fn reset(&self) -> Result<(), ReaderServiceError> {
        let _guard = self.persist_lock.lock().await;
        {
            let mut state = self.state.write().await;
            state.epoch += 1;
            state.document = None;
            state.last_played = None;
            state.view = ViewState::default();
        }
        self.session_repo.clear().await?;
        tracing::info!("Reader session reset");
        Ok(())
    }

    async fn restore(&self) -> Result<bool, ReaderServiceError> {
        let view = self.session_repo.load_view().await?;
        let record = self.session_repo.load_session().await?;

        let mut state = self.state.write().await;
        if let Some(view) = view {
            state.view = view;
        }

        let Some(record) = record else {
            state.view.current_page = 0;
            return Ok(false);
        };

        let sections: Vec<Section> = record
            .sections
            .into_iter()
            .enumerate()
            .map(|(position, saved)| {
                if saved.index != position {
                    tracing::warn!(
                        stored_index = saved.index,
                        position = position,
                        "Stored section index out of order, renumbering"
                    );
                }
                let mut section = Section::new(position, saved.content, record.file_name.clone());
                section.progress = saved.progress;
                section
            })
            .collect();

        tracing::info!(
            file_name = %record.file_name,
            section_count = sections.len(),
            saved_at = %record.saved_at,
            "Restored reader session"
        );

        state.epoch += 1;
        state.settings = record.settings;
        state.last_played = record
            .last_played
            .filter(|last| last.section_index < sections.len());
        let last_page = state.view.page_count(sections.len()).saturating_sub(1);
        state.view.current_page = state.view.current_page.min(last_page);
        state.document = Some(Document {
            file_name: record.file_name,
            original_text: record.original_text,
            sections,
        });
        Ok(true)
    }

    async fn section(&self, index: usize) -> Result<SectionResponse, ReaderServiceError> {
        let state = self.state.read().await;
        Ok(SectionResponse::from(state.section(index)?))
    }

    async fn section_count(&self) -> Result<usize, ReaderServiceError> {
        Ok(self.state.read().await.document()?.sections.len())
    }

    async fn section_status(&self, index: usize) -> Result<SectionStatus, ReaderServiceError> {
        Ok(self.state.read().await.section(index)?.status)
    }

    async fn generate_section(&self, index: usize) -> Result<SectionResponse, ReaderServiceError> {
        // 1. Claim the section
        let (epoch, content, voice) = {
            let mut state = self.state.write().await;
            let epoch = state.epoch;
            let voice = state.settings.voice;
            let section = state.section_mut(index)?;
            if section.status.is_busy() {
                return Err(ReaderServiceError::Busy(index));
            }
            section.status = SectionStatus::Analyzing;
            section.error = None;
            (epoch, section.content.clone(), voice)
        };

        tracing::info!(
            section_index = index,
            voice = %voice,
            text_length = content.chars().count(),
            "Section generation started"
        );

        // 2. Reflow into readable paragraphs
        let reflowed = match self.reflow_cached(&content).await {
            Ok(text) => text,
            Err(e) => return Err(self.fail(epoch, index, "reflow", e).await),
        };

        {
            let mut state = self.state.write().await;
            if state.epoch != epoch {
                return Err(ReaderServiceError::Stale);
            }
            let section = state.section_mut(index)?;
            section.reflowed = Some(reflowed.clone());
            section.status = SectionStatus::Generating;
        }

        // 3. Synthesize and encode
        let audio = match self.synthesize(&reflowed, voice).await {
            Ok(audio) => audio,
            Err(e) => return Err(self.fail(epoch, index, "synthesis", e).await),
        };

        // 4. Publish
        let mut state = self.state.write().await;
        if state.epoch != epoch {
            tracing::debug!(section_index = index, "Discarding audio from a previous session");
            return Err(ReaderServiceError::Stale);
        }
        let section = state.section_mut(index)?;
        tracing::info!(
            section_index = index,
            duration_secs = audio.duration_secs,
            audio_size_bytes = audio.bytes.len(),
            "Section ready"
        );
        section.audio = Some(Arc::new(audio));
        section.status = SectionStatus::Ready;
        Ok(SectionResponse::from(&*section))
    }

    async fn generate_page(&self, page: usize) -> Result<Vec<SectionResponse>, ReaderServiceError> {
        let indices: Vec<usize> = {
            let state = self.state.read().await;
            let document = state.document()?;
            let range = state.view.page_range(page, document.sections.len());
            range
                .filter(|&i| {
                    let section = &document.sections[i];
                    !section.is_ready() && !section.status.is_busy()
                })
                .collect()
        };

        tracing::info!(page = page, section_count = indices.len(), "Generating page");

        let mut results = Vec::with_capacity(indices.len());
        for (position, index) in indices.iter().copied().enumerate() {
            if position > 0 {
                tokio::time::sleep(self.options.page_generation_delay).await;
            }
            match self.generate_section(index).await {
                Ok(section) => results.push(section),
                Err(ReaderServiceError::Stale) => return Err(ReaderServiceError::Stale),
                Err(ReaderServiceError::Busy(_)) => {}
                Err(e) => {
                    tracing::warn!(section_index = index, error = %e, "Page generation continues past failed section");
                    results.push(self.section(index).await?);
                }
            }
        }

        Ok(results)
    }

    async fn section_audio(
        &self,
        index: usize,
    ) -> Result<Download<Arc<WavAudio>>, ReaderServiceError> {
        let state = self.state.read().await;
        let section = state.section(index)?;
        let audio = section
            .audio
            .clone()
            .ok_or(ReaderServiceError::NotReady(index))?;
        Ok(Download {
            file_name: section.download_name("wav"),
            content: audio,
        })
    }

    async fn section_text(&self, index: usize) -> Result<Download<String>, ReaderServiceError> {
        let state = self.state.read().await;
        let section = state.section(index)?;
        Ok(Download {
            file_name: section.download_name("txt"),
            content: section.content.clone(),
        })
    }

    async fn original_text(&self) -> Result<Download<String>, ReaderServiceError> {
        let state = self.state.read().await;
        let document = state.document()?;
        Ok(Download {
            file_name: document.file_name.clone(),
            content: document.original_text.clone(),
        })
    }

    async fn settings(&self) -> ReaderSettings {
        self.state.read().await.settings.clone()
    }

    async fn update_settings(
        &self,
        request: UpdateSettingsRequest,
    ) -> Result<ReaderSettings, ReaderServiceError> {
        if let Some(rate) = request.playback_rate {
            if !rate.is_finite() || !(MIN_PLAYBACK_RATE..=MAX_PLAYBACK_RATE).contains(&rate) {
                return Err(ReaderServiceError::Invalid(format!(
                    "playback_rate must be between {} and {}",
                    MIN_PLAYBACK_RATE, MAX_PLAYBACK_RATE
                )));
            }
        }

        let settings = {
            let mut state = self.state.write().await;
            if let Some(voice) = request.voice {
                state.settings.voice = voice;
            }
            if let Some(rate) = request.playback_rate {
                state.settings.playback_rate = rate;
            }
            if let Some(auto_next) = request.auto_next {
                state.settings.auto_next = auto_next;
            }
            state.settings.clone()
        };

        tracing::info!(
            voice = %settings.voice,
            playback_rate = settings.playback_rate,
            auto_next = settings.auto_next,
            "Settings updated"
        );

        self.persist().await?;
        Ok(settings)
    }

    async fn view(&self) -> ViewState {
        self.state.read().await.view
    }

    async fn update_view(
        &self,
        request: UpdateViewRequest,
    ) -> Result<ViewState, ReaderServiceError> {
        if let Some(size) = request.page_size {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(ReaderServiceError::Invalid(format!(
                    "page_size must be between 1 and {}",
                    MAX_PAGE_SIZE
                )));
            }
        }

        let view = {
            let mut state = self.state.write().await;
            let section_count = state.document.as_ref().map_or(0, |d| d.sections.len());
            if let Some(size) = request.page_size {
                state.view.page_size = size;
            }
            if let Some(page) = request.current_page {
                state.view.current_page = page;
            }
            let last_page = state.view.page_count(section_count).saturating_sub(1);
            state.view.current_page = state.view.current_page.min(last_page);
            state.view
        };

        self.persist_view().await?;
        Ok(view)
    }

    async fn record_progress(
        &self,
        index: usize,
        request: ProgressRequest,
    ) -> Result<SectionResponse, ReaderServiceError> {
        let percent = if request.percent.is_finite() {
            request.percent.clamp(0.0, 100.0)
        } else {
            0.0
        };
        let time_secs = if request.time_secs.is_finite() {
            request.time_secs.max(0.0)
        } else {
            0.0
        };

        let response = {
            let mut state = self.state.write().await;
            let section = state.section_mut(index)?;
            section.progress = Some(percent);
            let response = SectionResponse::from(&*section);
            state.last_played = Some(LastPlayed {
                section_index: index,
                time_secs,
            });
            response
        };

        self.persist().await?;
        Ok(response)
    }

    async fn resume_point(&self) -> Result<Option<ResumePoint>, ReaderServiceError> {
        let state = self.state.read().await;
        let Some(last) = state.last_played else {
            return Ok(None);
        };
        let section = state.section(last.section_index)?;
        Ok(Some(ResumePoint {
            section_index: last.section_index,
            time_secs: last.time_secs,
            status: section.status,
            progress: section.progress,
        }))
    }

    async fn export_ready_audio(&self, dir: &Path) -> Result<Vec<PathBuf>, ReaderServiceError> {
        let ready: Vec<(String, Arc<WavAudio>)> = {
            let state = self.state.read().await;
            state
                .document()?
                .sections
                .iter()
                .filter(|s| s.is_ready())
                .filter_map(|s| s.audio.clone().map(|a| (s.download_name("wav"), a)))
                .collect()
        };

        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ReaderServiceError::Other(e.into()))?;

        let mut written = Vec::with_capacity(ready.len());
        for (position, (file_name, audio)) in ready.into_iter().enumerate() {
            if position > 0 {
                tokio::time::sleep(self.options.bulk_download_delay).await;
            }
            let path = dir.join(&file_name);
            tokio::fs::write(&path, &audio.bytes)
                .await
                .map_err(|e| ReaderServiceError::Other(e.into()))?;
            tracing::debug!(path = %path.display(), "Exported section audio");
            written.push(path);
        }

        tracing::info!(
            dir = %dir.display(),
            file_count = written.len(),
            "Exported ready audio"
        );
        Ok(written)
    }

    async fn epoch(&self) -> u64 {
        self.state.read().await.epoch
    }
}

impl ReaderService {
    async fn reflow_cached(&self, content: &str) -> Result<String, String> {
        if let Some(cache) = &self.reflow_cache {
            if let Some(cached) = cache.get(content).await {
                tracing::debug!(text_length = content.len(), "Reflow cache hit");
                return Ok(cached);
            }
        }

        let reflowed = self.reflow_repo.reflow(content).await?;

        if let Some(cache) = &self.reflow_cache {
            cache.insert(content.to_string(), reflowed.clone()).await;
        }
        Ok(reflowed)
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<WavAudio, String> {
        let speech = self.speech_repo.synthesize(text, voice).await?;
        let pcm = match &speech.payload {
            SpeechPayload::Base64(data) => self.decoder.decode_base64_pcm(data, speech.format),
            SpeechPayload::Pcm(bytes) => self.decoder.decode_pcm(bytes, speech.format),
        }
        .map_err(|e| e.to_string())?;
        self.decoder.to_wav(&pcm).map_err(|e| e.to_string())
    }

    /// Record a failed step on the section and build the error to return
    async fn fail(&self, epoch: u64, index: usize, step: &str, message: String) -> ReaderServiceError {
        tracing::error!(section_index = index, step = step, error = %message, "Section generation failed");

        let mut state = self.state.write().await;
        if state.epoch != epoch {
            return ReaderServiceError::Stale;
        }
        if let Ok(section) = state.section_mut(index) {
            section.status = SectionStatus::Error;
            section.error = Some(message.clone());
        }
        ReaderServiceError::Dependency(format!("{} failed: {}", step, message))
    }

    async fn persist(&self) -> Result<(), ReaderServiceError> {
        let _guard = self.persist_lock.lock().await;
        let record = self.state.read().await.to_record();
        if let Some(record) = record {
            self.session_repo.save_session(&record).await?;
        }
        Ok(())
    }

    async fn persist_view(&self) -> Result<(), ReaderServiceError> {
        let _guard = self.persist_lock.lock().await;
        let view = self.state.read().await.view;
        self.session_repo.save_view(&view).await?;
        Ok(())
    }
}

/// Keep only the final path component of an uploaded name
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("").trim();
    if base.is_empty() || base == "." || base == ".." {
        "untitled.txt".to_string()
    } else {
        base.to_string()
    }
}
