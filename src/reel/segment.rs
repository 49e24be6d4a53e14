use std::path::PathBuf;

use super::captions::{CaptionInstruction, StaticCard};
use super::error::ReelError;
use super::media::MediaHandle;
use super::packer::Timed;

/// Visual and mixed audio may differ by at most this many seconds.
pub const DURATION_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq)]
pub enum Overlay {
    None,
    /// Word captions plus the subtitle file they were written to
    Captions {
        instructions: Vec<CaptionInstruction>,
        subtitle_file: PathBuf,
    },
    Card(StaticCard),
}

/// One fully prepared item, ready to be encoded.
#[derive(Debug, Clone)]
pub struct MediaSegment {
    pub item_id: String,
    pub visual: MediaHandle,
    pub audio: MediaHandle,
    pub overlay: Overlay,
    duration: f64,
}

impl MediaSegment {
    pub fn new(
        item_id: impl Into<String>,
        visual: MediaHandle,
        audio: MediaHandle,
        overlay: Overlay,
    ) -> Result<Self, ReelError> {
        let item_id = item_id.into();
        if (visual.duration - audio.duration).abs() > DURATION_TOLERANCE {
            return Err(ReelError::DurationMismatch {
                item: item_id,
                visual: visual.duration,
                audio: audio.duration,
            });
        }
        let duration = audio.duration;
        Ok(Self {
            item_id,
            visual,
            audio,
            overlay,
            duration,
        })
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl Timed for MediaSegment {
    fn duration(&self) -> f64 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_durations_build_a_segment() {
        let segment = MediaSegment::new(
            "abc",
            MediaHandle::new("visual.mp4", 42.0),
            MediaHandle::new("mixed.wav", 42.0),
            Overlay::None,
        )
        .unwrap();
        assert_eq!(segment.duration(), 42.0);
    }

    #[test]
    fn mismatched_durations_are_rejected() {
        let err = MediaSegment::new(
            "abc",
            MediaHandle::new("visual.mp4", 41.0),
            MediaHandle::new("mixed.wav", 42.0),
            Overlay::None,
        )
        .unwrap_err();
        assert!(matches!(err, ReelError::DurationMismatch { .. }));
    }
}
