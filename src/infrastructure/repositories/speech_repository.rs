use crate::domain::audio::PcmFormat;
use crate::domain::reader::Voice;
use async_trait::async_trait;
use axum::body::Bytes;

/// Audio as it comes back from a provider, before decoding.
#[derive(Debug, Clone)]
pub enum SpeechPayload {
    /// Base64 text wrapping little-endian 16-bit PCM
    Base64(String),
    /// Little-endian 16-bit PCM bytes
    Pcm(Bytes),
}

#[derive(Debug, Clone)]
pub struct RawSpeech {
    pub payload: SpeechPayload,
    pub format: PcmFormat,
}

/// Repository for speech synthesis.
/// Abstracts the underlying TTS provider (Gemini, OpenAI, AWS Polly)
///
/// Implementations are responsible for:
/// - Handling provider-specific text length limitations
/// - Concatenating raw PCM from several requests when the text is split
/// - Mapping the reader's [`Voice`] to a provider voice
#[async_trait]
pub trait SpeechRepository: Send + Sync {
    /// Short provider name used in logs and health output
    fn provider(&self) -> &'static str;

    /// Synthesize text to raw 16-bit PCM
    ///
    /// # Errors
    /// Returns error if synthesis fails or the provider returned no audio
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<RawSpeech, String>;
}
