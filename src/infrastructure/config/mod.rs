use crate::domain::text::DEFAULT_MAX_CHARS;
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub environment: Environment,
    pub log_format: LogFormat,
    // AI providers
    pub ai_provider: AiProvider,
    pub speech_provider: SpeechProvider,
    pub gemini_api_key: String,
    pub gemini_base_url: String,
    pub gemini_text_model: String,
    pub gemini_tts_model: String,
    pub openai_api_key: String,
    pub openai_text_model: String,
    pub openai_tts_model: String,
    pub aws_region: String,
    // Reader
    pub max_section_chars: usize,
    pub max_upload_bytes: usize,
    pub auto_next_delay_ms: u64,
    pub page_generation_delay_ms: u64,
    pub bulk_download_delay_ms: u64,
    pub reflow_cache_enabled: bool,
    pub state_dir: PathBuf,
    pub export_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Provider for the reflow (text generation) step
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AiProvider {
    Gemini,
    OpenAi,
}

/// Provider for speech synthesis
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProvider {
    Gemini,
    OpenAi,
    Polly,
}

impl AiProvider {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "gemini" => Ok(AiProvider::Gemini),
            "openai" => Ok(AiProvider::OpenAi),
            other => Err(format!("unknown AI_PROVIDER '{}'", other)),
        }
    }
}

impl SpeechProvider {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_lowercase().as_str() {
            "gemini" => Ok(SpeechProvider::Gemini),
            "openai" => Ok(SpeechProvider::OpenAi),
            "polly" => Ok(SpeechProvider::Polly),
            other => Err(format!("unknown SPEECH_PROVIDER '{}'", other)),
        }
    }
}

impl From<AiProvider> for SpeechProvider {
    fn from(provider: AiProvider) -> Self {
        match provider {
            AiProvider::Gemini => SpeechProvider::Gemini,
            AiProvider::OpenAi => SpeechProvider::OpenAi,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        dotenvy::dotenv().ok();

        let ai_provider =
            AiProvider::parse(&env::var("AI_PROVIDER").unwrap_or_else(|_| "gemini".to_string()))?;
        let speech_provider = match env::var("SPEECH_PROVIDER") {
            Ok(value) => SpeechProvider::parse(&value)?,
            Err(_) => ai_provider.into(),
        };

        let uses_gemini =
            ai_provider == AiProvider::Gemini || speech_provider == SpeechProvider::Gemini;
        let uses_openai =
            ai_provider == AiProvider::OpenAi || speech_provider == SpeechProvider::OpenAi;

        let config = Config {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "production" => Environment::Production,
                    _ => Environment::Development,
                })?,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .parse::<String>()
                .map(|s| match s.as_str() {
                    "json" => LogFormat::Json,
                    _ => LogFormat::Pretty,
                })?,
            ai_provider,
            speech_provider,
            gemini_api_key: if uses_gemini {
                env::var("GEMINI_API_KEY")?
            } else {
                env::var("GEMINI_API_KEY").unwrap_or_default()
            },
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| crate::infrastructure::repositories::GEMINI_BASE_URL.to_string()),
            gemini_text_model: env::var("GEMINI_TEXT_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash".to_string()),
            gemini_tts_model: env::var("GEMINI_TTS_MODEL")
                .unwrap_or_else(|_| "gemini-2.5-flash-preview-tts".to_string()),
            openai_api_key: if uses_openai {
                env::var("OPENAI_API_KEY")?
            } else {
                env::var("OPENAI_API_KEY").unwrap_or_default()
            },
            openai_text_model: env::var("OPENAI_TEXT_MODEL")
                .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            openai_tts_model: env::var("OPENAI_TTS_MODEL").unwrap_or_else(|_| "tts-1".to_string()),
            aws_region: env::var("AWS_REGION").unwrap_or_else(|_| "ap-northeast-2".to_string()),
            max_section_chars: env::var("MAX_SECTION_CHARS")
                .unwrap_or_else(|_| DEFAULT_MAX_CHARS.to_string())
                .parse()?,
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .unwrap_or_else(|_| (50 * 1024 * 1024).to_string())
                .parse()?,
            auto_next_delay_ms: env::var("AUTO_NEXT_DELAY_MS")
                .unwrap_or_else(|_| "1500".to_string())
                .parse()?,
            page_generation_delay_ms: env::var("PAGE_GENERATION_DELAY_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()?,
            bulk_download_delay_ms: env::var("BULK_DOWNLOAD_DELAY_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()?,
            reflow_cache_enabled: env::var("REFLOW_CACHE_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse::<String>()
                .map(|s| s.to_lowercase() == "true")
                .unwrap_or(true),
            state_dir: env::var("STATE_DIR")
                .unwrap_or_else(|_| "./.reader-state".to_string())
                .into(),
            export_dir: env::var("EXPORT_DIR")
                .unwrap_or_else(|_| "./exports".to_string())
                .into(),
        };

        if config.max_section_chars == 0 {
            return Err("MAX_SECTION_CHARS must be at least 1".into());
        }

        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.environment == Environment::Development
    }

    pub fn auto_next_delay(&self) -> Duration {
        Duration::from_millis(self.auto_next_delay_ms)
    }

    pub fn page_generation_delay(&self) -> Duration {
        Duration::from_millis(self.page_generation_delay_ms)
    }

    pub fn bulk_download_delay(&self) -> Duration {
        Duration::from_millis(self.bulk_download_delay_ms)
    }
}
