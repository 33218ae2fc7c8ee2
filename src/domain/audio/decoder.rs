use super::wav::{encode_wav, WavError};
use axum::body::Bytes;
use base64::Engine;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Layout of raw little-endian 16-bit PCM returned by a speech provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmFormat {
    pub const fn mono(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            channels: 1,
        }
    }
}

/// Decoded interleaved samples in [-1, 1].
#[derive(Debug, Clone)]
pub struct PcmBuffer {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmBuffer {
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }
}

/// A playable WAV file produced for one section.
#[derive(Debug, Clone)]
pub struct WavAudio {
    pub bytes: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum AudioDecodeError {
    #[error("speech payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("speech payload contained no samples")]
    Empty,
    #[error(transparent)]
    Wav(#[from] WavError),
}

/// Turns provider payloads into WAV files.
///
/// One instance is shared by the whole process; see [`AudioDecoder::shared`].
#[derive(Debug, Default)]
pub struct AudioDecoder {
    _private: (),
}

static SHARED_DECODER: OnceCell<Arc<AudioDecoder>> = OnceCell::new();

impl AudioDecoder {
    /// The process-wide decoder, built on first use and never torn down.
    pub fn shared() -> Arc<AudioDecoder> {
        SHARED_DECODER
            .get_or_init(|| {
                tracing::debug!("Audio decoder initialized");
                Arc::new(AudioDecoder::default())
            })
            .clone()
    }

    pub fn decode_base64_pcm(
        &self,
        payload: &str,
        format: PcmFormat,
    ) -> Result<PcmBuffer, AudioDecodeError> {
        let bytes = base64::engine::general_purpose::STANDARD.decode(payload.trim())?;
        self.decode_pcm(&bytes, format)
    }

    pub fn decode_pcm(&self, bytes: &[u8], format: PcmFormat) -> Result<PcmBuffer, AudioDecodeError> {
        if bytes.len() % 2 != 0 {
            tracing::warn!(
                payload_size = bytes.len(),
                "Odd-length PCM payload, dropping trailing byte"
            );
        }

        let mut samples: Vec<f32> = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]) as f32 / 32768.0)
            .collect();

        // a torn final frame cannot be played
        let channels = format.channels.max(1) as usize;
        samples.truncate(samples.len() - samples.len() % channels);

        if samples.is_empty() {
            return Err(AudioDecodeError::Empty);
        }

        Ok(PcmBuffer {
            samples,
            sample_rate: format.sample_rate,
            channels: format.channels,
        })
    }

    pub fn to_wav(&self, pcm: &PcmBuffer) -> Result<WavAudio, AudioDecodeError> {
        let bytes = encode_wav(&pcm.samples, pcm.sample_rate, pcm.channels)?;
        Ok(WavAudio {
            bytes: Bytes::from(bytes),
            sample_rate: pcm.sample_rate,
            channels: pcm.channels,
            duration_secs: pcm.duration_secs(),
        })
    }
}
