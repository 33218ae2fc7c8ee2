pub mod chunker;
pub mod decode;
pub mod normalizer;

pub use chunker::{split, ChunkError, DEFAULT_MAX_CHARS};
pub use decode::{decode_text_file, DecodeError};
pub use normalizer::normalize;
