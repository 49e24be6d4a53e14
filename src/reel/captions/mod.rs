//! Caption timing and overlay rendering.

pub mod ass;
mod timing;

pub use timing::{CaptionInstruction, StaticCard, word_timings};
