pub mod gemini_repository;
pub mod openai_repository;
pub mod polly_speech_repository;
pub mod reflow_repository;
pub mod session_repository;
pub mod speech_repository;

pub use gemini_repository::{GeminiRepository, GEMINI_BASE_URL};
pub use openai_repository::OpenAiRepository;
pub use polly_speech_repository::PollySpeechRepository;
pub use reflow_repository::ReflowRepository;
pub use session_repository::SessionRepository;
pub use speech_repository::{RawSpeech, SpeechPayload, SpeechRepository};
