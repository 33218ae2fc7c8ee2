use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::{
    domain::reader::{PlaybackService, PlaybackStatus},
    error::AppResult,
};

pub struct PlaybackController {
    playback: Arc<PlaybackService>,
}

impl PlaybackController {
    pub fn new(playback: Arc<PlaybackService>) -> Self {
        Self { playback }
    }

    /// GET /api/playback
    pub async fn status(State(controller): State<Arc<PlaybackController>>) -> Json<PlaybackStatus> {
        Json(controller.playback.status().await)
    }

    /// POST /api/playback/{index}/play - Make a section the active one
    pub async fn play(
        State(controller): State<Arc<PlaybackController>>,
        Path(index): Path<usize>,
    ) -> AppResult<Json<PlaybackStatus>> {
        Ok(Json(controller.playback.play(index).await?))
    }

    /// POST /api/playback/{index}/ended - Player finished a section; may queue the next one
    pub async fn ended(
        State(controller): State<Arc<PlaybackController>>,
        Path(index): Path<usize>,
    ) -> AppResult<Json<PlaybackStatus>> {
        Ok(Json(controller.playback.ended(index).await?))
    }

    /// DELETE /api/playback/notice
    pub async fn dismiss_notice(
        State(controller): State<Arc<PlaybackController>>,
    ) -> Json<PlaybackStatus> {
        Json(controller.playback.dismiss_notice().await)
    }
}
