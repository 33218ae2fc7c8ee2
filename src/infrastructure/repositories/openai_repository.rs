use super::reflow_repository::{ReflowRepository, REFLOW_INSTRUCTION};
use super::speech_repository::{RawSpeech, SpeechPayload, SpeechRepository};
use crate::domain::audio::PcmFormat;
use crate::domain::reader::Voice;
use crate::domain::text::split;
use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, CreateSpeechRequest, SpeechModel, SpeechResponseFormat,
        Voice as OpenAiVoice,
    },
    Client,
};
use async_trait::async_trait;
use axum::body::Bytes;
use std::sync::Arc;

/// OpenAI has a limit of 4096 characters per speech request
const MAX_BATCH_SIZE: usize = 4096;

/// OpenAI `pcm` output is 24 kHz, 16-bit signed little-endian, mono
const PCM_FORMAT: PcmFormat = PcmFormat::mono(24000);

/// Select the OpenAI voice closest in character to each reader voice
fn openai_voice(voice: Voice) -> OpenAiVoice {
    match voice {
        Voice::Kore => OpenAiVoice::Nova,
        Voice::Puck => OpenAiVoice::Fable,
        Voice::Charon => OpenAiVoice::Onyx,
        Voice::Fenrir => OpenAiVoice::Echo,
        Voice::Zephyr => OpenAiVoice::Shimmer,
    }
}

/// OpenAI implementation of the reflow (chat) and speech (TTS) repositories
pub struct OpenAiRepository {
    client: Arc<Client<OpenAIConfig>>,
    text_model: String,
    tts_model: String,
}

impl OpenAiRepository {
    pub fn new(client: Arc<Client<OpenAIConfig>>, text_model: String, tts_model: String) -> Self {
        Self {
            client,
            text_model,
            tts_model,
        }
    }

    /// Call OpenAI TTS API to synthesize a single text batch
    async fn call_openai(&self, text: &str, voice: Voice) -> Result<Bytes, String> {
        tracing::info!(
            model = %self.tts_model,
            voice = %voice,
            text_length = text.len(),
            "Calling OpenAI TTS API"
        );

        let model = match self.tts_model.as_str() {
            "tts-1" => SpeechModel::Tts1,
            "tts-1-hd" => SpeechModel::Tts1Hd,
            other => SpeechModel::Other(other.to_string()),
        };

        let request = CreateSpeechRequest {
            model,
            input: text.to_string(),
            voice: openai_voice(voice),
            response_format: Some(SpeechResponseFormat::Pcm),
            speed: None,
        };

        let response = self.client.audio().speech(request).await.map_err(|e| {
            tracing::error!(
                error = %e,
                model = %self.tts_model,
                voice = %voice,
                text_length = text.len(),
                "OpenAI TTS API call failed"
            );
            format!("OpenAI TTS error: {}", e)
        })?;

        Ok(response.bytes)
    }
}

#[async_trait]
impl ReflowRepository for OpenAiRepository {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn reflow(&self, text: &str) -> Result<String, String> {
        let start_time = std::time::Instant::now();

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(REFLOW_INSTRUCTION)
                .build()
                .map_err(|e| e.to_string())?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| e.to_string())?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(self.text_model.as_str())
            .messages(messages)
            .build()
            .map_err(|e| e.to_string())?;

        let response = self.client.chat().create(request).await.map_err(|e| {
            tracing::error!(error = %e, model = %self.text_model, "OpenAI chat call failed");
            format!("OpenAI chat error: {}", e)
        })?;

        let reflowed = response
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| "OpenAI returned no text".to_string())?;

        tracing::info!(
            provider = "openai",
            model = %self.text_model,
            latency_ms = start_time.elapsed().as_millis(),
            input_length = text.len(),
            output_length = reflowed.len(),
            "Reflow completed"
        );

        Ok(reflowed)
    }
}

#[async_trait]
impl SpeechRepository for OpenAiRepository {
    fn provider(&self) -> &'static str {
        "openai"
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<RawSpeech, String> {
        let start_time = std::time::Instant::now();

        let batches = split(text, MAX_BATCH_SIZE).map_err(|e| e.to_string())?;
        tracing::info!(
            batch_count = batches.len(),
            text_length = text.len(),
            "Text split into batches"
        );

        // raw PCM concatenates cleanly, unlike MP3
        let mut merged_audio = Vec::new();
        for (index, batch) in batches.iter().enumerate() {
            let audio_data = self.call_openai(batch, voice).await?;
            merged_audio.extend_from_slice(&audio_data);
            tracing::debug!(
                batch_index = index,
                total_audio_size = merged_audio.len(),
                "Batch synthesized and merged"
            );
        }

        if merged_audio.is_empty() {
            return Err("OpenAI returned no audio payload".to_string());
        }

        tracing::info!(
            provider = "openai",
            model = %self.tts_model,
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
