use super::speech_repository::{RawSpeech, SpeechPayload, SpeechRepository};
use crate::domain::audio::PcmFormat;
use crate::domain::reader::Voice;
use crate::domain::text::split;
use async_trait::async_trait;
use aws_sdk_polly::{
    types::{Engine, OutputFormat, VoiceId},
    Client as PollyClient,
};
use axum::body::Bytes;
use std::sync::Arc;

/// AWS Polly has a limit of 3000 characters per request
const MAX_BATCH_SIZE: usize = 3000;

/// Polly PCM output: signed 16-bit little-endian mono at the requested rate
const PCM_FORMAT: PcmFormat = PcmFormat::mono(16000);

/// AWS Polly implementation of the speech repository
pub struct PollySpeechRepository {
    polly_client: Arc<PollyClient>,
}

impl PollySpeechRepository {
    pub fn new(polly_client: Arc<PollyClient>) -> Self {
        Self { polly_client }
    }

    /// Select the Polly neural voice for a reader voice
    fn polly_voice(voice: Voice) -> &'static str {
        match voice {
            Voice::Kore => "Seoyeon",
            Voice::Puck => "Matthew",
            Voice::Charon => "Stephen",
            Voice::Fenrir => "Gregory",
            Voice::Zephyr => "Ruth",
        }
    }

    /// Call AWS Polly to synthesize a single text batch
    async fn call_polly(&self, text: &str, voice: Voice) -> Result<Vec<u8>, String> {
        let voice_name = Self::polly_voice(voice);
        let voice_id = VoiceId::from(voice_name);
        let engine = Engine::Neural;

        tracing::info!(
            voice = voice_name,
            engine = ?engine,
            output_format = "Pcm",
            text_length = text.len(),
            "Calling AWS Polly synthesize_speech"
        );

        let result = self
            .polly_client
            .synthesize_speech()
            .text(text)
            .voice_id(voice_id)
            .output_format(OutputFormat::Pcm)
            .sample_rate(PCM_FORMAT.sample_rate.to_string())
            .engine(engine.clone())
            .send()
            .await
            .map_err(|e| {
                tracing::error!(
                    error = ?e,
                    error_display = %e,
                    voice = voice_name,
                    engine = ?engine,
                    text_length = text.len(),
                    "AWS Polly synthesize_speech failed"
                );
                format!("AWS Polly error: {}", e)
            })?;

        let audio_stream = result.audio_stream.collect().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to collect audio stream from Polly response");
            format!("Failed to read audio stream: {}", e)
        })?;

        Ok(audio_stream.into_bytes().to_vec())
    }
}

#[async_trait]
impl SpeechRepository for PollySpeechRepository {
    fn provider(&self) -> &'static str {
        "polly"
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<RawSpeech, String> {
        let start_time = std::time::Instant::now();

        let batches = split(text, MAX_BATCH_SIZE).map_err(|e| e.to_string())?;
        tracing::info!(
            batch_count = batches.len(),
            text_length = text.len(),
            "Text split into batches"
        );

        let mut merged_audio = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            let audio_data = self.call_polly(batch, voice).await?;
            merged_audio.extend(audio_data);
            tracing::debug!(
                batch_index = index,
                total_audio_size = merged_audio.len(),
                "Batch synthesized and merged"
            );
        }

        if merged_audio.is_empty() {
            return Err("AWS Polly returned no audio payload".to_string());
        }

        tracing::info!(
            provider = "polly",
            voice = %voice,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.chars().count(),
            batch_count = batches.len(),
            audio_size_bytes = merged_audio.len(),
            "TTS synthesis completed"
        );

        Ok(RawSpeech {
            payload: SpeechPayload::Pcm(Bytes::from(merged_audio)),
            format: PCM_FORMAT,
        })
    }
}
