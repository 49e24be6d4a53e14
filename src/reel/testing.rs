//! In-memory stand-ins for the media and speech collaborators.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use async_trait::async_trait;

use super::media::{GainedTrack, MediaBackend, MediaHandle};
use super::speech::SpeechSynthesizer;

/// Records every call; `probe` answers from a table, falling back to the
/// file size in bytes divided by 100.
#[derive(Default)]
pub struct FakeBackend {
    pub durations: HashMap<PathBuf, f64>,
    pub fail_concat: bool,
    pub calls: RefCell<Vec<String>>,
}

impl FakeBackend {
    pub fn with_durations(entries: &[(&Path, f64)]) -> Self {
        Self {
            durations: entries
                .iter()
                .map(|(p, d)| (p.to_path_buf(), *d))
                .collect(),
            ..Self::default()
        }
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.starts_with(prefix))
            .cloned()
            .collect()
    }
}

impl MediaBackend for FakeBackend {
    fn probe(&self, path: &Path) -> Result<f64> {
        self.calls
            .borrow_mut()
            .push(format!("probe {}", path.display()));
        if let Some(d) = self.durations.get(path) {
            return Ok(*d);
        }
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len() as f64 / 100.0),
            Err(_) => bail!("cannot probe {}", path.display()),
        }
    }

    fn extract_subclip(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        strip_audio: bool,
        out: &Path,
    ) -> Result<MediaHandle> {
        self.calls.borrow_mut().push(format!(
            "extract {} {start} {end} {strip_audio}",
            source.display()
        ));
        fs::write(out, b"clip")?;
        Ok(MediaHandle::new(out, end - start))
    }

    fn loop_to_duration(
        &self,
        source: &MediaHandle,
        duration: f64,
        out: &Path,
    ) -> Result<MediaHandle> {
        self.calls
            .borrow_mut()
            .push(format!("loop {} {duration}", source.path.display()));
        fs::write(out, b"loop")?;
        Ok(MediaHandle::new(out, duration))
    }

    fn mix(&self, tracks: &[GainedTrack<'_>], out: &Path) -> Result<MediaHandle> {
        let desc = tracks
            .iter()
            .map(|t| format!("{}@{}", t.handle.path.display(), t.gain))
            .collect::<Vec<_>>()
            .join(",");
        self.calls.borrow_mut().push(format!("mix {desc}"));
        fs::write(out, b"mix")?;
        let duration = tracks
            .iter()
            .map(|t| t.handle.duration)
            .fold(0.0_f64, f64::max);
        Ok(MediaHandle::new(out, duration))
    }

    fn concat(&self, parts: &[PathBuf], out: &Path) -> Result<MediaHandle> {
        self.calls
            .borrow_mut()
            .push(format!("concat {}", parts.len()));
        if self.fail_concat {
            fs::write(out, b"half-written")?;
            bail!("concat demuxer rejected input");
        }
        let mut joined = Vec::new();
        for part in parts {
            joined.extend(fs::read(part)?);
        }
        fs::write(out, &joined)?;
        Ok(MediaHandle::new(out, joined.len() as f64 / 100.0))
    }
}

/// Returns `<text>` as bytes; fails on the call numbered `fail_on` (1-based).
/// With `delay` set, each call sleeps first so concurrent callers interleave.
#[derive(Default)]
pub struct FakeSynthesizer {
    pub fail_on: Option<usize>,
    pub delay: Option<Duration>,
    pub calls: AtomicUsize,
    pub texts: Mutex<Vec<String>>,
}

impl FakeSynthesizer {
    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Ok(mut texts) = self.texts.lock() {
            texts.push(text.to_string());
        }
        if self.fail_on == Some(n) {
            bail!("throttled");
        }
        Ok(text.as_bytes().to_vec())
    }

    fn name(&self) -> &'static str {
        "fake"
    }

    fn extension(&self) -> &'static str {
        "mp3"
    }

    fn is_available(&self) -> bool {
        true
    }
}
