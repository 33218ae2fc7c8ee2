use axum::{
    body::{Body, Bytes},
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use super::attachment;
use crate::{
    domain::reader::{
        PlaybackService, ReaderService, ReaderServiceApi, ReaderSettings, ResumePoint,
        SessionResponse, UpdateSettingsRequest, UpdateViewRequest, ViewState,
    },
    error::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub file_name: String,
}

pub struct SessionController {
    reader: Arc<ReaderService>,
    playback: Arc<PlaybackService>,
}

impl SessionController {
    pub fn new(reader: Arc<ReaderService>, playback: Arc<PlaybackService>) -> Self {
        Self { reader, playback }
    }

    /// POST /api/session?file_name=... - Load a text file, replacing the current document
    pub async fn upload(
        State(controller): State<Arc<SessionController>>,
        Query(query): Query<UploadQuery>,
        body: Bytes,
    ) -> AppResult<(StatusCode, Json<SessionResponse>)> {
        if query.file_name.trim().is_empty() {
            return Err(AppError::BadRequest("file_name is required".to_string()));
        }

        let session = controller.reader.load_file(query.file_name, &body).await?;
        controller.playback.stop().await;

        tracing::info!(
            file_name = %session.file_name,
            sections = session.section_count,
            bytes = body.len(),
            "Document loaded"
        );

        Ok((StatusCode::CREATED, Json(session)))
    }

    /// GET /api/session - Current document snapshot
    pub async fn get_session(
        State(controller): State<Arc<SessionController>>,
    ) -> AppResult<Json<SessionResponse>> {
        Ok(Json(controller.reader.session().await?))
    }

    /// DELETE /api/session - Discard the document and the saved records
    pub async fn reset(State(controller): State<Arc<SessionController>>) -> AppResult<StatusCode> {
        controller.playback.stop().await;
        controller.reader.reset().await?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// GET /api/session/text - Download the full decoded text
    pub async fn download_original(
        State(controller): State<Arc<SessionController>>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let download = controller.reader.original_text().await?;
        attachment(
            &download.file_name,
            "text/plain; charset=utf-8",
            download.content,
        )
    }

    /// GET /api/session/resume - Last played point, if any
    pub async fn resume(
        State(controller): State<Arc<SessionController>>,
    ) -> AppResult<Json<Option<ResumePoint>>> {
        Ok(Json(controller.playback.resume().await?))
    }

    /// GET /api/settings
    pub async fn get_settings(
        State(controller): State<Arc<SessionController>>,
    ) -> Json<ReaderSettings> {
        Json(controller.reader.settings().await)
    }

    /// PATCH /api/settings - Voice, playback rate and auto-next
    pub async fn update_settings(
        State(controller): State<Arc<SessionController>>,
        Json(request): Json<UpdateSettingsRequest>,
    ) -> AppResult<Json<ReaderSettings>> {
        Ok(Json(controller.reader.update_settings(request).await?))
    }

    /// GET /api/view
    pub async fn get_view(State(controller): State<Arc<SessionController>>) -> Json<ViewState> {
        Json(controller.reader.view().await)
    }

    /// PATCH /api/view - Current page and page size
    pub async fn update_view(
        State(controller): State<Arc<SessionController>>,
        Json(request): Json<UpdateViewRequest>,
    ) -> AppResult<Json<ViewState>> {
        Ok(Json(controller.reader.update_view(request).await?))
    }
}
