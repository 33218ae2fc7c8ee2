pub mod error;
pub mod model;
pub mod playback;
pub mod service;

pub use error::ReaderServiceError;
pub use model::{
    LastPlayed, ProgressRequest, ReaderSettings, Section, SectionRecord, SectionResponse,
    SectionStatus, SessionRecord, SessionResponse, UpdateSettingsRequest, UpdateViewRequest,
    ViewState, Voice,
};
pub use playback::{PlaybackService, PlaybackStatus, QueueState};
pub use service::{Download, ReaderOptions, ReaderService, ReaderServiceApi, ResumePoint};
