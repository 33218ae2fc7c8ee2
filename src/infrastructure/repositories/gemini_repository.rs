use super::reflow_repository::{ReflowRepository, REFLOW_INSTRUCTION};
use super::speech_repository::{RawSpeech, SpeechPayload, SpeechRepository};
use crate::domain::audio::PcmFormat;
use crate::domain::reader::Voice;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Gemini TTS returns 24 kHz mono L16 unless the mime type says otherwise
const DEFAULT_SAMPLE_RATE: u32 = 24000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig<'a> {
    response_modalities: Vec<&'a str>,
    speech_config: SpeechConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig<'a> {
    voice_config: VoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig<'a> {
    prebuilt_voice_config: PrebuiltVoiceConfig<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig<'a> {
    voice_name: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    text: Option<String>,
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    #[serde(default)]
    mime_type: String,
    data: String,
}

impl GenerateContentResponse {
    fn text(&self) -> Option<String> {
        let text: String = self
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }

    fn into_audio(self) -> Option<InlineData> {
        self.candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .filter_map(|p| p.inline_data)
            .find(|d| !d.data.is_empty())
    }
}

/// Read the sample rate out of a mime type such as `audio/L16;codec=pcm;rate=24000`
fn sample_rate_from_mime(mime_type: &str) -> u32 {
    mime_type
        .split(';')
        .filter_map(|param| param.trim().strip_prefix("rate="))
        .find_map(|rate| rate.parse().ok())
        .unwrap_or(DEFAULT_SAMPLE_RATE)
}

/// Gemini implementation of both the reflow and speech repositories.
/// Talks to the REST `generateContent` endpoint directly.
pub struct GeminiRepository {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    text_model: String,
    tts_model: String,
}

impl GeminiRepository {
    pub fn new(base_url: String, api_key: String, text_model: String, tts_model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            text_model,
            tts_model,
        }
    }

    async fn generate(
        &self,
        model: &str,
        request: &GenerateContentRequest<'_>,
    ) -> Result<GenerateContentResponse, String> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);

        let response = self
            .http
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, model = model, "Gemini request failed");
                format!("Gemini request failed: {}", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                status = status.as_u16(),
                model = model,
                body = %body,
                "Gemini returned an error status"
            );
            return Err(format!("Gemini error (HTTP {}): {}", status.as_u16(), body));
        }

        response
            .json::<GenerateContentResponse>()
            .await
            .map_err(|e| format!("Gemini response could not be parsed: {}", e))
    }
}

#[async_trait]
impl ReflowRepository for GeminiRepository {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn reflow(&self, text: &str) -> Result<String, String> {
        let start_time = std::time::Instant::now();
        let request = GenerateContentRequest {
            system_instruction: Some(Content {
                parts: vec![TextPart {
                    text: REFLOW_INSTRUCTION,
                }],
            }),
            contents: vec![Content {
                parts: vec![TextPart { text }],
            }],
            generation_config: None,
        };

        let response = self.generate(&self.text_model, &request).await?;
        let reflowed = response
            .text()
            .ok_or_else(|| "Gemini returned no text".to_string())?;

        tracing::info!(
            provider = "gemini",
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
impl SpeechRepository for GeminiRepository {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    async fn synthesize(&self, text: &str, voice: Voice) -> Result<RawSpeech, String> {
        let start_time = std::time::Instant::now();
        let request = GenerateContentRequest {
            system_instruction: None,
            contents: vec![Content {
                parts: vec![TextPart { text }],
            }],
            generation_config: Some(GenerationConfig {
                response_modalities: vec!["AUDIO"],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: voice.as_str(),
                        },
                    },
                },
            }),
        };

        let response = self.generate(&self.tts_model, &request).await?;
        let audio = response
            .into_audio()
            .ok_or_else(|| "Gemini returned no audio payload".to_string())?;
        let sample_rate = sample_rate_from_mime(&audio.mime_type);

        tracing::info!(
            provider = "gemini",
            model = %self.tts_model,
            voice = %voice,
            mime_type = %audio.mime_type,
            latency_ms = start_time.elapsed().as_millis(),
            characters_count = text.chars().count(),
            payload_size = audio.data.len(),
            "TTS synthesis completed"
        );

        Ok(RawSpeech {
            payload: SpeechPayload::Base64(audio.data),
            format: PcmFormat::mono(sample_rate),
        })
    }
}
