//! Story card overlay: a white card with the poster, title and counters on
//! a transparent full-frame canvas.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::CardConfig;
use super::media::ffmpeg::{FfmpegRunOptions, FfmpegRunner};
use super::media::util::{escape_drawtext, escape_filter_path};
use super::speech::chunker::split_into_chunks;
use crate::ui::prelude::{Level, emit};

const CARD_WIDTH: u32 = 800;
const CARD_HEIGHT: u32 = 600;
const PADDING: u32 = 30;
const USERNAME_SIZE: u32 = 50;
const TITLE_SIZE: u32 = 40;
const TITLE_LINE_HEIGHT: u32 = 52;
const TITLE_CHARS_PER_LINE: usize = 32;
const TITLE_MAX_LINES: usize = 7;
const STAT_SIZE: u32 = 28;

/// Text shown on a card.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFields {
    pub username: String,
    pub title: String,
    pub like_count: String,
    pub comment_count: String,
}

impl CardFields {
    pub fn new(title: &str, config: &CardConfig) -> Self {
        Self {
            username: config.username.clone(),
            title: title.to_string(),
            like_count: config.like_count.clone(),
            comment_count: config.comment_count.clone(),
        }
    }
}

pub trait CardRenderer {
    /// Render `fields` onto a `canvas`-sized transparent image at `out`.
    fn render(&self, fields: &CardFields, canvas: (u32, u32), out: &Path) -> Result<()>;
}

/// Path of the card image for an item inside the cache directory.
pub fn card_path(cache_dir: &Path, item_id: &str) -> PathBuf {
    cache_dir.join(format!("{item_id}_card.png"))
}

/// Render the card for `item_id` unless it is already cached.
pub fn ensure_card(
    renderer: &dyn CardRenderer,
    fields: &CardFields,
    canvas: (u32, u32),
    cache_dir: &Path,
    item_id: &str,
) -> Result<PathBuf> {
    let path = card_path(cache_dir, item_id);
    if path.exists() {
        emit(
            Level::Debug,
            "reel.card.cached",
            &format!("Using cached card {}", path.display()),
            None,
        );
        return Ok(path);
    }

    renderer
        .render(fields, canvas, &path)
        .with_context(|| format!("Failed to render story card for {item_id}"))?;
    Ok(path)
}

/// Draws the card with ffmpeg's `drawbox` and `drawtext` filters.
pub struct FfmpegCardRenderer<'a> {
    runner: &'a dyn FfmpegRunner,
    font_file: Option<PathBuf>,
}

impl<'a> FfmpegCardRenderer<'a> {
    pub fn new(runner: &'a dyn FfmpegRunner, font_file: Option<PathBuf>) -> Self {
        Self { runner, font_file }
    }

    fn font_option(&self) -> String {
        match &self.font_file {
            Some(path) => format!("fontfile='{}'", escape_filter_path(path)),
            None => "font=Sans".to_string(),
        }
    }

    fn drawtext(&self, text: &str, x: u32, y: u32, size: u32, color: &str) -> String {
        format!(
            "drawtext={font}:text='{text}':x={x}:y={y}:fontsize={size}:fontcolor={color}",
            font = self.font_option(),
            text = escape_drawtext(text),
        )
    }

    fn filter_chain(&self, fields: &CardFields, canvas: (u32, u32)) -> String {
        let (width, height) = canvas;
        let x0 = width.saturating_sub(CARD_WIDTH) / 2;
        let y0 = height.saturating_sub(CARD_HEIGHT) / 4;

        let mut filters = vec![
            "format=rgba".to_string(),
            format!(
                "drawbox=x={x0}:y={y0}:w={CARD_WIDTH}:h={CARD_HEIGHT}:color=white@0.9:t=fill"
            ),
            self.drawtext(
                &fields.username,
                x0 + PADDING,
                y0 + PADDING,
                USERNAME_SIZE,
                "black",
            ),
        ];

        let title_top = y0 + PADDING * 2 + USERNAME_SIZE + PADDING / 2;
        let lines = wrap_title(&fields.title);
        for (idx, line) in lines.iter().enumerate() {
            filters.push(self.drawtext(
                line,
                x0 + PADDING,
                title_top + idx as u32 * TITLE_LINE_HEIGHT,
                TITLE_SIZE,
                "black",
            ));
        }

        let stats = format!(
            "♥ {}    💬 {}",
            fields.like_count, fields.comment_count
        );
        filters.push(self.drawtext(
            &stats,
            x0 + PADDING,
            y0 + CARD_HEIGHT - PADDING - STAT_SIZE,
            STAT_SIZE,
            "0x555555",
        ));

        filters.join(",")
    }

    fn args(&self, fields: &CardFields, canvas: (u32, u32), out: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-f".to_string(),
            "lavfi".to_string(),
            "-i".to_string(),
            format!("color=c=black@0.0:s={}x{}", canvas.0, canvas.1),
            "-vf".to_string(),
            self.filter_chain(fields, canvas),
            "-frames:v".to_string(),
            "1".to_string(),
            out.to_string_lossy().into_owned(),
        ]
    }
}

impl CardRenderer for FfmpegCardRenderer<'_> {
    fn render(&self, fields: &CardFields, canvas: (u32, u32), out: &Path) -> Result<()> {
        let args = self.args(fields, canvas, out);
        self.runner.run(&args, FfmpegRunOptions::default())?;
        emit(
            Level::Debug,
            "reel.card.rendered",
            &format!("Rendered story card {}", out.display()),
            None,
        );
        Ok(())
    }
}

/// Wrap the title into card lines, ellipsizing what does not fit.
fn wrap_title(title: &str) -> Vec<String> {
    let mut lines = split_into_chunks(title, TITLE_CHARS_PER_LINE);
    if lines.len() > TITLE_MAX_LINES {
        lines.truncate(TITLE_MAX_LINES);
        if let Some(last) = lines.last_mut() {
            last.push('…');
        }
    }
    lines
}
