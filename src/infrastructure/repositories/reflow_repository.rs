use async_trait::async_trait;

/// Instruction given to the text model before each section.
pub const REFLOW_INSTRUCTION: &str = "You are preparing a book for narration. \
Rearrange the following text into natural paragraphs that are easy to read aloud. \
Join lines that were broken mid-sentence and separate paragraphs with a blank line. \
Do not add, remove, translate or reword anything. Return only the rearranged text.";

/// Repository for the paragraph reflow step.
/// Abstracts the text-generation provider (Gemini, OpenAI).
///
/// The reader treats the result as an opaque, content-preserving rewrite of
/// the section; it never inspects or validates the wording.
#[async_trait]
pub trait ReflowRepository: Send + Sync {
    /// Short provider name used in logs and health output
    fn provider(&self) -> &'static str;

    /// Reflow one section's text into readable paragraphs
    ///
    /// # Errors
    /// Returns error if the provider fails or returns no text
    async fn reflow(&self, text: &str) -> Result<String, String>;
}
