//! Text generation client module.
//!
//! This module provides a trait-based abstraction over the text-generation
//! endpoint, with the Hugging Face inference API as the implementation used
//! by the application.

mod error;
mod huggingface;

pub use error::GenerationError;
pub use huggingface::HuggingFaceClient;

use async_trait::async_trait;

/// Something that turns a prompt into a raw response body.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Send one generation request and return the body of a success response.
    ///
    /// Implementations make a single attempt; there is no retry.
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
