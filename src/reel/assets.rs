//! Background asset pools and duration-fit selection.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;

use super::error::ReelError;
use super::media::{MediaBackend, MediaHandle};
use crate::ui::prelude::{Level, emit};

const VISUAL_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "mp4", "m4a", "wav", "ogg", "flac", "aac"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Visual,
    Audio,
}

impl AssetKind {
    fn extensions(self) -> &'static [&'static str] {
        match self {
            AssetKind::Visual => VISUAL_EXTENSIONS,
            AssetKind::Audio => AUDIO_EXTENSIONS,
        }
    }

    pub fn accepts(self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().contains(&ext.as_str())
            })
            .unwrap_or(false)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Visual => write!(f, "visual"),
            AssetKind::Audio => write!(f, "audio"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRef {
    pub path: PathBuf,
    pub kind: AssetKind,
}

/// Source of candidate background files.
pub trait AssetPool {
    fn kind(&self) -> AssetKind;

    /// Current members of the pool. Implementations must not cache.
    fn list(&self) -> Result<Vec<AssetRef>>;
}

/// Pool backed by the files directly inside one directory.
#[derive(Debug, Clone)]
pub struct DirectoryPool {
    dir: PathBuf,
    kind: AssetKind,
}

impl DirectoryPool {
    pub fn new(dir: impl Into<PathBuf>, kind: AssetKind) -> Self {
        Self {
            dir: dir.into(),
            kind,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl AssetPool for DirectoryPool {
    fn kind(&self) -> AssetKind {
        self.kind
    }

    fn list(&self) -> Result<Vec<AssetRef>> {
        if !self.dir.is_dir() {
            return Err(ReelError::MissingPool(self.dir.clone()).into());
        }

        let mut assets = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Failed to read {}", self.dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && self.kind.accepts(&path) {
                assets.push(AssetRef {
                    path,
                    kind: self.kind,
                });
            }
        }
        // read_dir order is platform dependent
        assets.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(assets)
    }
}

/// Cut a random window of exactly `duration` seconds, audio stripped, from a
/// visual asset long enough to hold it.
///
/// Candidates are tried in a uniformly shuffled order. Nothing is written
/// when no candidate qualifies.
pub fn pick_visual<R: Rng + ?Sized>(
    pool: &dyn AssetPool,
    backend: &dyn MediaBackend,
    rng: &mut R,
    duration: f64,
    out: &Path,
) -> Result<MediaHandle> {
    let mut candidates = pool.list()?;
    candidates.shuffle(rng);

    for candidate in &candidates {
        let total = match backend.probe(&candidate.path) {
            Ok(total) => total,
            Err(err) => {
                emit(
                    Level::Warn,
                    "reel.pick.probe_failed",
                    &format!("Skipping {}: {:#}", candidate.path.display(), err),
                    None,
                );
                continue;
            }
        };

        if total < duration {
            continue;
        }

        let start = if total > duration {
            rng.gen_range(0.0..=(total - duration))
        } else {
            0.0
        };

        emit(
            Level::Debug,
            "reel.pick.visual",
            &format!(
                "Using {} [{:.2}s, {:.2}s) of {:.2}s",
                candidate.path.display(),
                start,
                start + duration,
                total
            ),
            None,
        );

        return backend.extract_subclip(&candidate.path, start, start + duration, true, out);
    }

    Err(ReelError::ResourceUnavailable {
        kind: pool.kind(),
        required: duration,
    }
    .into())
}

/// Any audio-bearing asset, chosen uniformly. No duration filter.
pub fn pick_background_audio<R: Rng + ?Sized>(
    pool: &dyn AssetPool,
    rng: &mut R,
) -> Result<AssetRef> {
    let candidates = pool.list()?;
    candidates
        .choose(rng)
        .cloned()
        .ok_or_else(|| anyhow::Error::from(ReelError::EmptyPool(pool.kind())))
}
