/// Anything with a playback length in seconds.
pub trait Timed {
    fn duration(&self) -> f64;
}

impl Timed for f64 {
    fn duration(&self) -> f64 {
        *self
    }
}

/// One output file's worth of segments.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputPart<T> {
    /// 1-based part number
    pub number: usize,
    pub segments: Vec<T>,
    pub total: f64,
}

/// Pack segments, in order, into parts whose total stays within `ceiling`.
///
/// A segment that would push the running total over the ceiling starts a
/// new part. A segment longer than the ceiling gets a part of its own.
pub fn pack_segments<T: Timed>(segments: Vec<T>, ceiling: f64) -> Vec<OutputPart<T>> {
    let mut parts = Vec::new();
    let mut current: Vec<T> = Vec::new();
    let mut running = 0.0;

    for segment in segments {
        let duration = segment.duration();
        if !current.is_empty() && running + duration > ceiling {
            parts.push(OutputPart {
                number: parts.len() + 1,
                segments: std::mem::take(&mut current),
                total: running,
            });
            running = 0.0;
        }
        running += duration;
        current.push(segment);
    }

    if !current.is_empty() {
        parts.push(OutputPart {
            number: parts.len() + 1,
            segments: current,
            total: running,
        });
    }

    parts
}
