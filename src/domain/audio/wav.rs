/// Size of the canonical RIFF/WAVE header for 16-bit PCM.
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u16 = BITS_PER_SAMPLE / 8;
const FORMAT_PCM: u16 = 1;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WavError {
    #[error("channel count must be at least 1")]
    NoChannels,
    #[error("sample rate must be at least 1 Hz")]
    ZeroSampleRate,
    #[error("{samples} samples do not divide into {channels} channels")]
    PartialFrame { samples: usize, channels: u16 },
    #[error("audio too long for a WAV container")]
    TooLong,
}

/// Convert one float sample to signed 16-bit, clamping to [-1, 1].
///
/// Negative values scale by 32768 and non-negative by 32767 so both ends of
/// the range map exactly onto `i16::MIN` and `i16::MAX`.
pub fn float_to_i16(sample: f32) -> i16 {
    let s = if sample.is_nan() { 0.0 } else { sample.clamp(-1.0, 1.0) };
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Serialize interleaved float samples into a 16-bit PCM WAV file.
///
/// The output is exactly `44 + frames * channels * 2` bytes.
pub fn encode_wav(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Vec<u8>, WavError> {
    if channels == 0 {
        return Err(WavError::NoChannels);
    }
    if sample_rate == 0 {
        return Err(WavError::ZeroSampleRate);
    }
    if samples.len() % channels as usize != 0 {
        return Err(WavError::PartialFrame {
            samples: samples.len(),
            channels,
        });
    }

    let data_len = samples
        .len()
        .checked_mul(BYTES_PER_SAMPLE as usize)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(36).is_some())
        .ok_or(WavError::TooLong)?;
    let block_align = channels * BYTES_PER_SAMPLE;
    let byte_rate = sample_rate
        .checked_mul(block_align as u32)
        .ok_or(WavError::TooLong)?;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes());
    out.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    out.extend_from_slice(&channels.to_le_bytes());
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&block_align.to_le_bytes());
    out.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for &sample in samples {
        out.extend_from_slice(&float_to_i16(sample).to_le_bytes());
    }

    Ok(out)
}
