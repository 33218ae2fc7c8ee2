pub mod request_id;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::controllers::{
    health, playback::PlaybackController, section::SectionController, session::SessionController,
};
use crate::domain::reader::ReaderService;
use crate::infrastructure::config::Config;

pub use request_id::{request_id_middleware, RequestId, X_REQUEST_ID};

/// Build the application router. Shared by `main` and the e2e tests.
pub fn create_router(
    reader: Arc<ReaderService>,
    session_controller: Arc<SessionController>,
    section_controller: Arc<SectionController>,
    playback_controller: Arc<PlaybackController>,
    max_upload_bytes: usize,
) -> Router {
    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::health_ready))
        .with_state(reader);

    let session_routes = Router::new()
        .route(
            "/api/session",
            post(SessionController::upload)
                .get(SessionController::get_session)
                .delete(SessionController::reset),
        )
        .route("/api/session/text", get(SessionController::download_original))
        .route("/api/session/resume", get(SessionController::resume))
        .route(
            "/api/settings",
            get(SessionController::get_settings).patch(SessionController::update_settings),
        )
        .route(
            "/api/view",
            get(SessionController::get_view).patch(SessionController::update_view),
        )
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(session_controller);

    let section_routes = Router::new()
        .route("/api/sections/:index", get(SectionController::get_section))
        .route(
            "/api/sections/:index/generate",
            post(SectionController::generate),
        )
        .route("/api/sections/:index/audio", get(SectionController::download_audio))
        .route("/api/sections/:index/text", get(SectionController::download_text))
        .route(
            "/api/sections/:index/progress",
            put(SectionController::record_progress),
        )
        .route("/api/pages/:page/generate", post(SectionController::generate_page))
        .route("/api/exports/audio", post(SectionController::export_audio))
        .with_state(section_controller);

    let playback_routes = Router::new()
        .route("/api/playback", get(PlaybackController::status))
        .route("/api/playback/:index/play", post(PlaybackController::play))
        .route("/api/playback/:index/ended", post(PlaybackController::ended))
        .route("/api/playback/notice", delete(PlaybackController::dismiss_notice))
        .with_state(playback_controller);

    Router::new()
        .merge(health_routes)
        .merge(session_routes)
        .merge(section_routes)
        .merge(playback_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_id_middleware))
                .layer(CorsLayer::permissive()),
        )
}

/// Start the HTTP server with all routes configured
pub async fn start_http_server(
    config: Arc<Config>,
    reader: Arc<ReaderService>,
    session_controller: Arc<SessionController>,
    section_controller: Arc<SectionController>,
    playback_controller: Arc<PlaybackController>,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(
        reader,
        session_controller,
        section_controller,
        playback_controller,
        config.max_upload_bytes,
    );

    let listener =
        tokio::net::TcpListener::bind(format!("{}:{}", config.host, config.port)).await?;

    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
