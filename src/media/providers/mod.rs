//! Media provider seams
//!
//! The resolvers talk to these traits; the OpenAI-backed implementations
//! live alongside so tests can substitute scripted providers.

mod vision;
mod whisper;

pub use vision::OpenAiVision;
pub use whisper::WhisperTranscriber;

use std::path::Path;

use async_trait::async_trait;

use crate::Result;

/// Speech-to-text over an audio file on disk
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio at `path`.
    ///
    /// # Errors
    ///
    /// Returns a media or transport error on failure.
    async fn transcribe(&self, path: &Path) -> Result<String>;
}

/// Image description from raw base64 content
#[async_trait]
pub trait VisionDescriber: Send + Sync {
    /// Describe the image, phrased in the customer's first person.
    ///
    /// # Errors
    ///
    /// Returns a media or transport error on failure.
    async fn describe(&self, base64_image: &str) -> Result<String>;
}
