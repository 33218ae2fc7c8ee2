use std::sync::Arc;
use text_reader::controllers::{
    playback::PlaybackController, section::SectionController, session::SessionController,
};
use text_reader::domain::audio::AudioDecoder;
use text_reader::domain::reader::{PlaybackService, ReaderOptions, ReaderService, ReaderServiceApi};
use text_reader::infrastructure::config::{AiProvider, Config, LogFormat, SpeechProvider};
use text_reader::infrastructure::http::start_http_server;
use text_reader::infrastructure::repositories::{
    GeminiRepository, OpenAiRepository, PollySpeechRepository, ReflowRepository, SessionRepository,
    SpeechRepository,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config);

    tracing::info!(
        ai_provider = ?config.ai_provider,
        speech_provider = ?config.speech_provider,
        development = config.is_development(),
        "Starting text reader on {}:{}",
        config.host,
        config.port
    );

    let config = Arc::new(config);

    // === DEPENDENCY INJECTION SETUP ===
    // 1. Provider clients, built only for the providers in use
    let gemini_repo = (config.ai_provider == AiProvider::Gemini
        || config.speech_provider == SpeechProvider::Gemini)
        .then(|| {
            Arc::new(GeminiRepository::new(
                config.gemini_base_url.clone(),
                config.gemini_api_key.clone(),
                config.gemini_text_model.clone(),
                config.gemini_tts_model.clone(),
            ))
        });

    let openai_repo = (config.ai_provider == AiProvider::OpenAi
        || config.speech_provider == SpeechProvider::OpenAi)
        .then(|| {
            let openai_config = async_openai::config::OpenAIConfig::new()
                .with_api_key(config.openai_api_key.clone());
            Arc::new(OpenAiRepository::new(
                Arc::new(async_openai::Client::with_config(openai_config)),
                config.openai_text_model.clone(),
                config.openai_tts_model.clone(),
            ))
        });

    let reflow_repo: Arc<dyn ReflowRepository> = match config.ai_provider {
        AiProvider::Gemini => gemini_repo.clone().ok_or("Gemini client not configured")?,
        AiProvider::OpenAi => openai_repo.clone().ok_or("OpenAI client not configured")?,
    };

    let speech_repo: Arc<dyn SpeechRepository> = match config.speech_provider {
        SpeechProvider::Gemini => gemini_repo.ok_or("Gemini client not configured")?,
        SpeechProvider::OpenAi => openai_repo.ok_or("OpenAI client not configured")?,
        SpeechProvider::Polly => {
            tracing::info!("Initializing AWS Polly client with region: {}", config.aws_region);

            let has_access_key = std::env::var("AWS_ACCESS_KEY_ID").is_ok();
            if !has_access_key {
                tracing::warn!("AWS credentials not found in environment variables. Will attempt to use other credential providers");
            }

            let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
                .region(aws_config::Region::new(config.aws_region.clone()))
                .load()
                .await;
            let polly_client = Arc::new(aws_sdk_polly::Client::new(&aws_config));
            Arc::new(PollySpeechRepository::new(polly_client))
        }
    };

    tracing::info!(
        reflow = reflow_repo.provider(),
        speech = speech_repo.provider(),
        "Providers initialized"
    );

    // 2. Persistence
    let session_repo = Arc::new(SessionRepository::new(config.state_dir.clone()));

    // 3. Services
    let reader = Arc::new(ReaderService::new(
        reflow_repo,
        speech_repo,
        session_repo,
        AudioDecoder::shared(),
        ReaderOptions {
            max_section_chars: config.max_section_chars,
            page_generation_delay: config.page_generation_delay(),
            bulk_download_delay: config.bulk_download_delay(),
            reflow_cache_enabled: config.reflow_cache_enabled,
        },
    ));

    match reader.restore().await {
        Ok(true) => tracing::info!("Previous session restored"),
        Ok(false) => tracing::info!("No previous session to restore"),
        Err(e) => tracing::warn!(error = %e, "Failed to restore previous session"),
    }

    let playback = Arc::new(PlaybackService::new(reader.clone(), config.auto_next_delay()));

    // 4. Controllers
    let session_controller = Arc::new(SessionController::new(reader.clone(), playback.clone()));
    let section_controller = Arc::new(SectionController::new(
        reader.clone(),
        config.export_dir.clone(),
    ));
    let playback_controller = Arc::new(PlaybackController::new(playback));

    start_http_server(
        config,
        reader,
        session_controller,
        section_controller,
        playback_controller,
    )
    .await?;

    Ok(())
}

fn init_logging(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "text_reader=debug,tower_http=debug".into());

    if config.log_format == LogFormat::Json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }
}
