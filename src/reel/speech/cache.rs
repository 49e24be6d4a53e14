//! Write-once narration cache.
//!
//! Layout under the cache directory:
//! - `<key>.<ext>` canonical narration, never overwritten
//! - `<key>.partial.<ext>` in-flight output, renamed on success
//! - `<key>_part<i>.<ext>` per-chunk audio, removed after stitching

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};

use super::SpeechSynthesizer;
use super::chunker::{fits_single_call, split_into_chunks};
use crate::common::paths::ensure_dir;
use crate::common::progress::create_spinner;
use crate::reel::error::ReelError;
use crate::reel::media::{MediaBackend, MediaHandle};
use crate::ui::prelude::{Level, emit};

/// Narration audio for one item.
#[derive(Debug, Clone)]
pub struct NarrationAudio {
    pub key: String,
    pub audio: MediaHandle,
    /// Whether the artifact already existed before this call
    pub cached: bool,
}

pub struct NarrationCache {
    dir: PathBuf,
    max_chars: usize,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NarrationCache {
    pub fn new(dir: impl Into<PathBuf>, max_chars: usize) -> Self {
        Self {
            dir: dir.into(),
            max_chars: max_chars.max(1),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic key for an item: `<label>_<id>` restricted to
    /// filename-safe characters.
    pub fn cache_key(label: &str, id: &str) -> String {
        format!("{}_{}", label, id)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    pub fn canonical_path(&self, key: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{key}.{ext}"))
    }

    fn partial_path(&self, key: &str, ext: &str) -> PathBuf {
        self.dir.join(format!("{key}.partial.{ext}"))
    }

    fn chunk_path(&self, key: &str, index: usize, ext: &str) -> PathBuf {
        self.dir.join(format!("{key}_part{index}.{ext}"))
    }

    fn key_lock(&self, key: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        locks.entry(key.to_string()).or_default().clone()
    }

    /// Drop the map entry once no other caller holds or awaits it.
    fn release_key_lock(&self, key: &str, lock: Arc<tokio::sync::Mutex<()>>) {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        // One reference in the map, one in `lock`.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }

    /// Return the narration for `key`, synthesizing it only when no
    /// canonical artifact exists yet.
    pub async fn ensure(
        &self,
        key: &str,
        text: &str,
        synth: &dyn SpeechSynthesizer,
        backend: &dyn MediaBackend,
    ) -> Result<NarrationAudio> {
        let lock = self.key_lock(key);
        let result = {
            let _guard = lock.lock().await;
            self.ensure_locked(key, text, synth, backend).await
        };
        self.release_key_lock(key, lock);
        result
    }

    async fn ensure_locked(
        &self,
        key: &str,
        text: &str,
        synth: &dyn SpeechSynthesizer,
        backend: &dyn MediaBackend,
    ) -> Result<NarrationAudio> {
        let ext = synth.extension();
        let canonical = self.canonical_path(key, ext);

        if canonical.exists() {
            let duration = backend
                .probe(&canonical)
                .with_context(|| format!("Failed to probe cached narration {}", canonical.display()))?;
            emit(
                Level::Debug,
                "reel.speech.cached",
                &format!("Using cached narration {}", canonical.display()),
                None,
            );
            return Ok(NarrationAudio {
                key: key.to_string(),
                audio: MediaHandle::new(canonical, duration),
                cached: true,
            });
        }

        if text.trim().is_empty() {
            return Err(ReelError::SynthesisFailure {
                key: key.to_string(),
                message: "nothing to narrate".to_string(),
            }
            .into());
        }

        ensure_dir(&self.dir)?;
        let partial = self.partial_path(key, ext);

        let produced = if fits_single_call(text, self.max_chars) {
            self.synthesize_single(key, text, synth, &partial).await
        } else {
            self.synthesize_chunked(key, text, synth, backend, &partial)
                .await
        };

        if let Err(err) = produced {
            remove_temp_files(std::slice::from_ref(&partial));
            return Err(err);
        }

        std::fs::rename(&partial, &canonical).with_context(|| {
            format!(
                "Failed to move {} to {}",
                partial.display(),
                canonical.display()
            )
        })?;

        let duration = backend
            .probe(&canonical)
            .with_context(|| format!("Failed to probe narration {}", canonical.display()))?;

        emit(
            Level::Success,
            "reel.speech.synthesized",
            &format!(
                "Narration ready: {} ({:.1}s)",
                canonical.display(),
                duration
            ),
            Some(serde_json::json!({
                "key": key,
                "provider": synth.name(),
                "duration": duration,
            })),
        );

        Ok(NarrationAudio {
            key: key.to_string(),
            audio: MediaHandle::new(canonical, duration),
            cached: false,
        })
    }

    async fn synthesize_single(
        &self,
        key: &str,
        text: &str,
        synth: &dyn SpeechSynthesizer,
        partial: &Path,
    ) -> Result<()> {
        let pb = create_spinner(format!("Synthesizing {key} with {}...", synth.name()));
        let result = synth.synthesize(text).await;
        pb.finish_and_clear();

        let bytes = result.map_err(|e| ReelError::SynthesisFailure {
            key: key.to_string(),
            message: format!("{e:#}"),
        })?;
        tokio::fs::write(partial, bytes)
            .await
            .with_context(|| format!("Failed to write {}", partial.display()))
    }

    async fn synthesize_chunked(
        &self,
        key: &str,
        text: &str,
        synth: &dyn SpeechSynthesizer,
        backend: &dyn MediaBackend,
        partial: &Path,
    ) -> Result<()> {
        let chunks = split_into_chunks(text, self.max_chars);
        emit(
            Level::Info,
            "reel.speech.chunked",
            &format!(
                "Narration for {key} exceeds {} characters, synthesizing {} chunks",
                self.max_chars,
                chunks.len()
            ),
            None,
        );

        let mut written: Vec<PathBuf> = Vec::with_capacity(chunks.len());
        let result = self
            .synthesize_chunks(key, &chunks, synth, backend, partial, &mut written)
            .await;
        remove_temp_files(&written);
        result
    }

    async fn synthesize_chunks(
        &self,
        key: &str,
        chunks: &[String],
        synth: &dyn SpeechSynthesizer,
        backend: &dyn MediaBackend,
        partial: &Path,
        written: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let ext = synth.extension();
        for (index, chunk) in chunks.iter().enumerate() {
            let pb = create_spinner(format!(
                "Synthesizing {key} chunk {}/{}...",
                index + 1,
                chunks.len()
            ));
            let result = synth.synthesize(chunk).await;
            pb.finish_and_clear();

            let bytes = result.map_err(|e| ReelError::SynthesisFailure {
                key: key.to_string(),
                message: format!("chunk {}: {e:#}", index + 1),
            })?;

            let path = self.chunk_path(key, index, ext);
            written.push(path.clone());
            tokio::fs::write(&path, bytes)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        let count = written.len();
        backend
            .concat(written, partial)
            .map_err(|e| ReelError::ConcatenationFailure {
                key: key.to_string(),
                chunks: count,
                message: format!("{e:#}"),
            })?;
        Ok(())
    }
}

/// Remove temporary files; failures are reported, never fatal.
fn remove_temp_files(paths: &[PathBuf]) {
    for path in paths {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => emit(
                Level::Warn,
                "reel.speech.cleanup",
                &format!("Failed to remove {}: {}", path.display(), e),
                None,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reel::error::classify;
    use crate::reel::testing::{FakeBackend, FakeSynthesizer};
    use std::time::Duration;
    use tempfile::TempDir;

    fn leftover_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn cache_key_is_filename_safe() {
        assert_eq!(NarrationCache::cache_key("tifu", "1abc9z"), "tifu_1abc9z");
        assert_eq!(NarrationCache::cache_key("r/ask", "x.y"), "r_ask_x_y");
    }

    #[tokio::test]
    async fn second_call_reuses_artifact_without_provider() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 3000);
        let synth = FakeSynthesizer::default();
        let backend = FakeBackend::default();

        let first = cache
            .ensure("tifu_abc", "My goose ate the homework", &synth, &backend)
            .await
            .unwrap();
        let second = cache
            .ensure("tifu_abc", "My goose ate the homework", &synth, &backend)
            .await
            .unwrap();

        assert_eq!(synth.call_count(), 1);
        assert!(!first.cached);
        assert!(second.cached);
        assert_eq!(first.audio.path, second.audio.path);
        assert_eq!(first.audio.path, dir.path().join("tifu_abc.mp3"));
        assert_eq!(leftover_files(dir.path()), vec!["tifu_abc.mp3"]);
    }

    #[tokio::test]
    async fn long_text_is_chunked_stitched_and_cleaned() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 12);
        let synth = FakeSynthesizer::default();
        let backend = FakeBackend::default();
        let text = "alpha beta gamma delta epsilon";

        let narration = cache
            .ensure("aita_q1", text, &synth, &backend)
            .await
            .unwrap();

        let sent = synth.texts.lock().unwrap().clone();
        assert_eq!(sent, vec!["alpha beta", "gamma delta", "epsilon"]);
        assert!(sent.iter().all(|c| c.chars().count() <= 12));
        assert_eq!(backend.calls_starting_with("concat"), vec!["concat 3"]);

        let stitched = std::fs::read_to_string(&narration.audio.path).unwrap();
        assert_eq!(stitched, "alpha betagamma deltaepsilon");
        assert_eq!(leftover_files(dir.path()), vec!["aita_q1.mp3"]);
    }

    #[tokio::test]
    async fn provider_failure_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 12);
        let synth = FakeSynthesizer::failing_on(2);
        let backend = FakeBackend::default();

        let err = cache
            .ensure("aita_q2", "alpha beta gamma delta epsilon", &synth, &backend)
            .await
            .unwrap_err();

        assert!(matches!(
            classify(&err),
            Some(ReelError::SynthesisFailure { .. })
        ));
        assert!(backend.calls_starting_with("concat").is_empty());
        assert!(leftover_files(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn concat_failure_leaves_no_artifact() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 12);
        let synth = FakeSynthesizer::default();
        let backend = FakeBackend {
            fail_concat: true,
            ..FakeBackend::default()
        };

        let err = cache
            .ensure("aita_q3", "alpha beta gamma delta epsilon", &synth, &backend)
            .await
            .unwrap_err();

        match classify(&err) {
            Some(ReelError::ConcatenationFailure { chunks, .. }) => assert_eq!(*chunks, 3),
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(leftover_files(dir.path()).is_empty());

        // A later successful attempt still synthesizes from scratch.
        let backend = FakeBackend::default();
        let narration = cache
            .ensure("aita_q3", "alpha beta gamma delta epsilon", &synth, &backend)
            .await
            .unwrap();
        assert!(!narration.cached);
    }

    #[tokio::test]
    async fn concurrent_calls_for_one_key_synthesize_once() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 3000);
        let synth = FakeSynthesizer::with_delay(Duration::from_millis(50));
        let backend = FakeBackend::default();

        let (first, second) = tokio::join!(
            cache.ensure("tifu_race", "The goose came back", &synth, &backend),
            cache.ensure("tifu_race", "The goose came back", &synth, &backend),
        );
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(synth.call_count(), 1);
        assert_ne!(first.cached, second.cached);
        assert_eq!(first.audio.path, second.audio.path);
        assert_eq!(leftover_files(dir.path()), vec!["tifu_race.mp3"]);
    }

    #[tokio::test]
    async fn different_keys_do_not_wait_on_each_other() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 3000);
        let synth = FakeSynthesizer::with_delay(Duration::from_millis(20));
        let backend = FakeBackend::default();

        let (a, b) = tokio::join!(
            cache.ensure("tifu_a", "first story", &synth, &backend),
            cache.ensure("tifu_b", "second story", &synth, &backend),
        );

        assert!(!a.unwrap().cached);
        assert!(!b.unwrap().cached);
        assert_eq!(synth.call_count(), 2);
    }

    #[tokio::test]
    async fn key_locks_are_released_after_use() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 3000);
        let synth = FakeSynthesizer::with_delay(Duration::from_millis(10));
        let backend = FakeBackend::default();

        let (a, b) = tokio::join!(
            cache.ensure("aita_1", "one", &synth, &backend),
            cache.ensure("aita_1", "one", &synth, &backend),
        );
        a.unwrap();
        b.unwrap();
        cache
            .ensure("aita_2", "  ", &synth, &backend)
            .await
            .unwrap_err();

        assert!(cache.locks.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_text_is_a_synthesis_failure() {
        let dir = TempDir::new().unwrap();
        let cache = NarrationCache::new(dir.path(), 3000);
        let synth = FakeSynthesizer::default();
        let backend = FakeBackend::default();

        let err = cache
            .ensure("empty_1", "  \n", &synth, &backend)
            .await
            .unwrap_err();
        assert!(matches!(
            classify(&err),
            Some(ReelError::SynthesisFailure { .. })
        ));
        assert_eq!(synth.call_count(), 0);
    }
}
