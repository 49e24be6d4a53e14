use std::path::Path;

use anyhow::{Context, Result};

use super::config::MixConfig;
use super::media::{GainedTrack, MediaBackend, MediaHandle};

/// Fixed per-track gain multipliers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixGains {
    pub narration: f32,
    pub background: f32,
}

impl Default for MixGains {
    fn default() -> Self {
        Self {
            narration: 1.2,
            background: 0.15,
        }
    }
}

impl From<&MixConfig> for MixGains {
    fn from(config: &MixConfig) -> Self {
        Self {
            narration: config.narration_gain,
            background: config.background_gain,
        }
    }
}

/// Lay `background` under `narration` for exactly the narration's duration.
///
/// The background is looped from its start until it covers the narration,
/// cut to length, and both tracks are summed after applying their gains.
pub fn mix_narration(
    backend: &dyn MediaBackend,
    narration: &MediaHandle,
    background: &Path,
    gains: MixGains,
    work_dir: &Path,
) -> Result<MediaHandle> {
    let duration = narration.duration;
    let background_total = backend
        .probe(background)
        .with_context(|| format!("Failed to probe background audio {}", background.display()))?;

    let looped = backend.loop_to_duration(
        &MediaHandle::new(background, background_total),
        duration,
        &work_dir.join("background.wav"),
    )?;

    let mixed = backend.mix(
        &[
            GainedTrack {
                handle: narration,
                gain: gains.narration,
            },
            GainedTrack {
                handle: &looped,
                gain: gains.background,
            },
        ],
        &work_dir.join("mixed.wav"),
    )?;

    Ok(MediaHandle::new(mixed.path, duration))
}
