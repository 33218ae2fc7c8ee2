use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

use super::attachment;
use crate::{
    domain::reader::{ProgressRequest, ReaderService, ReaderServiceApi, SectionResponse},
    error::AppResult,
};

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub directory: String,
    pub files: Vec<String>,
}

pub struct SectionController {
    reader: Arc<ReaderService>,
    export_dir: PathBuf,
}

impl SectionController {
    pub fn new(reader: Arc<ReaderService>, export_dir: PathBuf) -> Self {
        Self { reader, export_dir }
    }

    /// GET /api/sections/{index}
    pub async fn get_section(
        State(controller): State<Arc<SectionController>>,
        Path(index): Path<usize>,
    ) -> AppResult<Json<SectionResponse>> {
        Ok(Json(controller.reader.section(index).await?))
    }

    /// POST /api/sections/{index}/generate - Generate, or retry a failed section
    pub async fn generate(
        State(controller): State<Arc<SectionController>>,
        Path(index): Path<usize>,
    ) -> AppResult<Json<SectionResponse>> {
        Ok(Json(controller.reader.generate_section(index).await?))
    }

    /// GET /api/sections/{index}/audio - WAV download
    pub async fn download_audio(
        State(controller): State<Arc<SectionController>>,
        Path(index): Path<usize>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let download = controller.reader.section_audio(index).await?;
        attachment(
            &download.file_name,
            "audio/wav",
            download.content.bytes.clone(),
        )
    }

    /// GET /api/sections/{index}/text - Section text download
    pub async fn download_text(
        State(controller): State<Arc<SectionController>>,
        Path(index): Path<usize>,
    ) -> AppResult<(StatusCode, HeaderMap, Body)> {
        let download = controller.reader.section_text(index).await?;
        attachment(
            &download.file_name,
            "text/plain; charset=utf-8",
            download.content,
        )
    }

    /// PUT /api/sections/{index}/progress - Record how far playback got
    pub async fn record_progress(
        State(controller): State<Arc<SectionController>>,
        Path(index): Path<usize>,
        Json(request): Json<ProgressRequest>,
    ) -> AppResult<Json<SectionResponse>> {
        Ok(Json(controller.reader.record_progress(index, request).await?))
    }

    /// POST /api/pages/{page}/generate - Generate a page one section at a time
    pub async fn generate_page(
        State(controller): State<Arc<SectionController>>,
        Path(page): Path<usize>,
    ) -> AppResult<Json<Vec<SectionResponse>>> {
        Ok(Json(controller.reader.generate_page(page).await?))
    }

    /// POST /api/exports/audio - Write every ready section into the export directory
    pub async fn export_audio(
        State(controller): State<Arc<SectionController>>,
    ) -> AppResult<Json<ExportResponse>> {
        let written = controller
            .reader
            .export_ready_audio(&controller.export_dir)
            .await?;

        let files = written
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();

        Ok(Json(ExportResponse {
            directory: controller.export_dir.display().to_string(),
            files,
        }))
    }
}
