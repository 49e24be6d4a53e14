use anyhow::{Context, Result};
use async_trait::async_trait;

use super::SpeechSynthesizer;

const API_BASE: &str = "https://api.elevenlabs.io/v1/text-to-speech";

pub struct ElevenLabsSynthesizer {
    api_key: Option<String>,
    voice_id: String,
    model_id: String,
    client: reqwest::Client,
}

impl ElevenLabsSynthesizer {
    pub fn new(api_key: Option<String>, voice_id: String, model_id: String) -> Self {
        Self {
            api_key,
            voice_id,
            model_id,
            client: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/{}", API_BASE, self.voice_id)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let api_key = self
            .api_key
            .as_ref()
            .context("ElevenLabs API key not configured")?;

        let response = self
            .client
            .post(self.endpoint())
            .header("xi-api-key", api_key)
            .header("Accept", "audio/mpeg")
            .json(&serde_json::json!({
                "text": text,
                "model_id": self.model_id,
                "voice_settings": {
                    "stability": 0.5,
                    "similarity_boost": 0.75
                }
            }))
            .send()
            .await
            .context("Failed to send request to ElevenLabs API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            anyhow::bail!("ElevenLabs API error ({}): {}", status, error_text);
        }

        let bytes = response
            .bytes()
            .await
            .context("Failed to read audio response")?;

        if bytes.is_empty() {
            anyhow::bail!("ElevenLabs returned an empty audio body");
        }

        Ok(bytes.to_vec())
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn is_available(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_includes_voice() {
        let synth = ElevenLabsSynthesizer::new(None, "voice123".into(), "m".into());
        assert_eq!(
            synth.endpoint(),
            "https://api.elevenlabs.io/v1/text-to-speech/voice123"
        );
    }

    #[test]
    fn blank_key_is_unavailable() {
        let synth = ElevenLabsSynthesizer::new(Some("  ".into()), "v".into(), "m".into());
        assert!(!synth.is_available());
        let synth = ElevenLabsSynthesizer::new(Some("sk_live".into()), "v".into(), "m".into());
        assert!(synth.is_available());
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let synth = ElevenLabsSynthesizer::new(None, "v".into(), "m".into());
        let err = synth.synthesize("hello").await.unwrap_err();
        assert!(err.to_string().contains("API key"));
    }
}
