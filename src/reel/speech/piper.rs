use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::SpeechSynthesizer;

/// Local synthesis through the `piper` binary.
pub struct PiperSynthesizer {
    model: Option<PathBuf>,
}

impl PiperSynthesizer {
    pub fn new(model: Option<PathBuf>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl SpeechSynthesizer for PiperSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let model = self
            .model
            .as_ref()
            .context("Piper model path not configured (speech.piper_model)")?;

        let out = tempfile::Builder::new()
            .prefix("storyreel-piper-")
            .suffix(".wav")
            .tempfile()
            .context("Failed to create temporary file for piper output")?;

        let mut child = Command::new("piper")
            .arg("--model")
            .arg(model)
            .arg("--output_file")
            .arg(out.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context("Failed to spawn piper")?;

        {
            let stdin = child
                .stdin
                .as_mut()
                .context("Failed to open piper stdin")?;
            stdin
                .write_all(text.as_bytes())
                .await
                .context("Failed to write text to piper")?;
        }

        let output = child
            .wait_with_output()
            .await
            .context("Failed to wait for piper")?;
        if !output.status.success() {
            bail!(
                "piper exited with status {:?}: {}",
                output.status.code(),
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let bytes = tokio::fs::read(out.path())
            .await
            .with_context(|| format!("Failed to read piper output {}", out.path().display()))?;
        if bytes.is_empty() {
            bail!("piper produced no audio");
        }
        Ok(bytes)
    }

    fn name(&self) -> &'static str {
        "piper"
    }

    fn extension(&self) -> &'static str {
        "wav"
    }

    fn is_available(&self) -> bool {
        self.model.as_ref().is_some_and(|m| m.exists()) && which::which("piper").is_ok()
    }
}
