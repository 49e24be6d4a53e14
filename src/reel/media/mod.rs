//! Narrow media capability interface.
//!
//! Assembly logic talks to [`MediaBackend`] only; [`ffmpeg::FfmpegBackend`]
//! binds it to the ffmpeg/ffprobe binaries.

pub mod ffmpeg;
pub mod util;

use std::path::{Path, PathBuf};

use anyhow::Result;

/// A media file on disk together with its known duration in seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaHandle {
    pub path: PathBuf,
    pub duration: f64,
}

impl MediaHandle {
    pub fn new(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }
}

/// One input of a mix with its fixed gain multiplier.
#[derive(Debug, Clone, Copy)]
pub struct GainedTrack<'a> {
    pub handle: &'a MediaHandle,
    pub gain: f32,
}

pub trait MediaBackend {
    /// Total duration of a media file in seconds.
    fn probe(&self, path: &Path) -> Result<f64>;

    /// Write `[start, end)` of `source` to `out`, optionally without audio.
    fn extract_subclip(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        strip_audio: bool,
        out: &Path,
    ) -> Result<MediaHandle>;

    /// Repeat the audio of `source` from its start until it covers
    /// `duration`, then cut it to exactly `duration`.
    fn loop_to_duration(&self, source: &MediaHandle, duration: f64, out: &Path)
    -> Result<MediaHandle>;

    /// Sum the tracks (no cross-fade) after applying their gains.
    fn mix(&self, tracks: &[GainedTrack<'_>], out: &Path) -> Result<MediaHandle>;

    /// Join audio files end to end in the given order.
    fn concat(&self, parts: &[PathBuf], out: &Path) -> Result<MediaHandle>;
}
