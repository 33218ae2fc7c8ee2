use crate::domain::audio::WavAudio;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SectionStatus {
    Pending,
    Analyzing,
    Generating,
    Ready,
    Error,
}

impl SectionStatus {
    pub fn is_busy(&self) -> bool {
        matches!(self, SectionStatus::Analyzing | SectionStatus::Generating)
    }
}

impl std::fmt::Display for SectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionStatus::Pending => write!(f, "pending"),
            SectionStatus::Analyzing => write!(f, "analyzing"),
            SectionStatus::Generating => write!(f, "generating"),
            SectionStatus::Ready => write!(f, "ready"),
            SectionStatus::Error => write!(f, "error"),
        }
    }
}

/// Voices offered to the reader. Each speech provider maps these to its own voice ids.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Voice {
    #[default]
    Kore,
    Puck,
    Charon,
    Fenrir,
    Zephyr,
}

impl Voice {
    pub const ALL: [Voice; 5] = [Voice::Kore, Voice::Puck, Voice::Charon, Voice::Fenrir, Voice::Zephyr];

    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Kore => "Kore",
            Voice::Puck => "Puck",
            Voice::Charon => "Charon",
            Voice::Fenrir => "Fenrir",
            Voice::Zephyr => "Zephyr",
        }
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One section of the loaded file and everything generated for it.
#[derive(Debug, Clone)]
pub struct Section {
    pub index: usize,
    pub content: String,
    pub status: SectionStatus,
    pub reflowed: Option<String>,
    pub audio: Option<Arc<WavAudio>>,
    pub progress: Option<f32>,
    pub file_name: String,
    pub error: Option<String>,
}

impl Section {
    pub fn new(index: usize, content: String, file_name: String) -> Self {
        Self {
            index,
            content,
            status: SectionStatus::Pending,
            reflowed: None,
            audio: None,
            progress: None,
            file_name,
            error: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == SectionStatus::Ready && self.audio.is_some()
    }

    /// Name used for downloads: `<file stem>_<1-based index>.<extension>`
    pub fn download_name(&self, extension: &str) -> String {
        let stem = std::path::Path::new(&self.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("section");
        format!("{}_{:03}.{}", stem, self.index + 1, extension)
    }
}

pub const MIN_PLAYBACK_RATE: f32 = 0.5;
pub const MAX_PLAYBACK_RATE: f32 = 2.0;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReaderSettings {
    pub voice: Voice,
    pub playback_rate: f32,
    pub auto_next: bool,
}

impl Default for ReaderSettings {
    fn default() -> Self {
        Self {
            voice: Voice::default(),
            playback_rate: 1.0,
            auto_next: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct LastPlayed {
    pub section_index: usize,
    pub time_secs: f64,
}

pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Pagination of the section list; persisted apart from the session itself.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ViewState {
    pub current_page: usize,
    pub page_size: usize,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            current_page: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl ViewState {
    pub fn page_count(&self, section_count: usize) -> usize {
        section_count.div_ceil(self.page_size.max(1))
    }

    /// Section indices shown on `page`, clipped to `section_count`.
    pub fn page_range(&self, page: usize, section_count: usize) -> std::ops::Range<usize> {
        let size = self.page_size.max(1);
        let start = page.saturating_mul(size).min(section_count);
        let end = start.saturating_add(size).min(section_count);
        start..end
    }
}

/// What survives a restart: text, settings and progress. Audio never does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub file_name: String,
    pub original_text: String,
    pub sections: Vec<SectionRecord>,
    pub settings: ReaderSettings,
    pub last_played: Option<LastPlayed>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionRecord {
    pub index: usize,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
}

/// API view of a section
#[derive(Debug, Serialize, Deserialize)]
pub struct SectionResponse {
    pub index: usize,
    pub content: String,
    pub status: SectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflowed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<f32>,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&Section> for SectionResponse {
    fn from(section: &Section) -> Self {
        Self {
            index: section.index,
            content: section.content.clone(),
            status: section.status,
            reflowed: section.reflowed.clone(),
            audio_url: section
                .audio
                .as_ref()
                .map(|_| format!("/api/sections/{}/audio", section.index)),
            duration_secs: section.audio.as_ref().map(|a| a.duration_secs),
            progress: section.progress,
            file_name: section.file_name.clone(),
            error: section.error.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub file_name: String,
    pub section_count: usize,
    pub sections: Vec<SectionResponse>,
    pub settings: ReaderSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_played: Option<LastPlayed>,
}

/// PATCH /api/settings
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice: Option<Voice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub playback_rate: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_next: Option<bool>,
}

/// PATCH /api/view
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct UpdateViewRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<usize>,
}

/// PUT /api/sections/:index/progress
#[derive(Debug, Serialize, Deserialize)]
pub struct ProgressRequest {
    pub time_secs: f64,
    pub percent: f32,
}
