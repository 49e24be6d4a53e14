//! Narration synthesis with pluggable providers.
//!
//! - `ElevenLabs`: hosted text-to-speech over HTTPS, returns mp3
//! - `Piper`: local piper binary, returns wav
//!
//! [`cache::NarrationCache`] sits in front of the provider and guarantees
//! at most one synthesis per item.

pub mod cache;
pub mod chunker;
pub mod elevenlabs;
pub mod piper;

use anyhow::Result;
use async_trait::async_trait;

use super::config::{SpeechConfig, SpeechProviderKind};

pub use cache::NarrationCache;

/// Trait for speech synthesis backends
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize one chunk of text that fits the provider limit
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Human-readable name of the provider for logging
    fn name(&self) -> &'static str;

    /// File extension of the audio bytes returned by `synthesize`
    fn extension(&self) -> &'static str;

    /// Check if the provider is usable with the current configuration
    fn is_available(&self) -> bool;
}

/// Create a synthesizer for the configured provider
pub fn create_synthesizer(config: &SpeechConfig) -> Box<dyn SpeechSynthesizer> {
    match config.provider {
        SpeechProviderKind::ElevenLabs => Box::new(elevenlabs::ElevenLabsSynthesizer::new(
            config.api_key.clone(),
            config.voice_id.clone(),
            config.model_id.clone(),
        )),
        SpeechProviderKind::Piper => {
            Box::new(piper::PiperSynthesizer::new(config.piper_model.clone()))
        }
    }
}
