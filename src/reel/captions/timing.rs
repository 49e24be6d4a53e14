use std::path::PathBuf;

/// One word of the caption track, relative to segment start.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionInstruction {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

impl CaptionInstruction {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }
}

/// Spread the words of `text` evenly over `duration` seconds.
///
/// Instructions are contiguous from 0 and the last one absorbs the
/// floating-point remainder so they end exactly at `duration`. No words
/// yields no instructions.
pub fn word_timings(text: &str, duration: f64) -> Vec<CaptionInstruction> {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.is_empty() || duration <= 0.0 {
        return Vec::new();
    }

    let per_word = duration / words.len() as f64;
    let last = words.len() - 1;

    words
        .iter()
        .enumerate()
        .map(|(idx, word)| {
            let start = per_word * idx as f64;
            let duration = if idx == last {
                duration - start
            } else {
                per_word
            };
            CaptionInstruction {
                text: (*word).to_string(),
                start,
                duration,
            }
        })
        .collect()
}

/// Card overlay shown from the start of its segment.
#[derive(Debug, Clone, PartialEq)]
pub struct StaticCard {
    pub image: PathBuf,
    pub duration: f64,
}

impl StaticCard {
    /// Visible for `configured` seconds, clipped to the segment.
    pub fn new(image: impl Into<PathBuf>, configured: f64, segment_duration: f64) -> Self {
        Self {
            image: image.into(),
            duration: configured.min(segment_duration).max(0.0),
        }
    }
}
