mod gemini;
mod generate_content;

pub use gemini::{gemini_client, GeminiLlm};
pub use generate_content::GenerateContentClient;
