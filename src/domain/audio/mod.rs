pub mod decoder;
pub mod wav;

pub use decoder::{AudioDecodeError, AudioDecoder, PcmBuffer, PcmFormat, WavAudio};
pub use wav::{encode_wav, WavError, WAV_HEADER_LEN};
