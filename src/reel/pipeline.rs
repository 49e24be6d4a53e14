//! Item-by-item assembly of narrated segments and their packing into parts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rand::Rng;

use super::assets::{AssetPool, pick_background_audio, pick_visual};
use super::captions::ass::{CaptionStyle, generate_ass_file};
use super::captions::{StaticCard, word_timings};
use super::card::{CardFields, CardRenderer, ensure_card};
use super::config::{CaptionMode, ReelConfig};
use super::error::{ReelError, classify};
use super::media::MediaBackend;
use super::mixer::{MixGains, mix_narration};
use super::packer::pack_segments;
use super::render::{PartEncoder, part_output_path};
use super::segment::{MediaSegment, Overlay};
use super::source::SourceItem;
use super::speech::{NarrationCache, SpeechSynthesizer};
use crate::common::paths::ensure_dir;
use crate::ui::prelude::{Level, emit};

/// External capabilities the pipeline drives.
pub struct Collaborators<'a> {
    pub synth: &'a dyn SpeechSynthesizer,
    pub backend: &'a dyn MediaBackend,
    pub cards: &'a dyn CardRenderer,
    pub encoder: &'a dyn PartEncoder,
    pub visuals: &'a dyn AssetPool,
    pub music: &'a dyn AssetPool,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub built: Vec<String>,
    /// `(item id, reason)` of every skipped item
    pub skipped: Vec<(String, String)>,
    pub parts: Vec<PathBuf>,
}

pub struct Pipeline<'a> {
    config: &'a ReelConfig,
    cache: NarrationCache,
    work_dir: PathBuf,
    collab: Collaborators<'a>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a ReelConfig, work_dir: impl Into<PathBuf>, collab: Collaborators<'a>) -> Self {
        Self {
            config,
            cache: NarrationCache::new(&config.cache_dir, config.speech.max_chars),
            work_dir: work_dir.into(),
            collab,
        }
    }

    /// Both pools must hold at least one usable file.
    pub fn check_pools(&self) -> Result<()> {
        for pool in [self.collab.visuals, self.collab.music] {
            if pool.list()?.is_empty() {
                return Err(ReelError::EmptyPool(pool.kind()).into());
            }
        }
        Ok(())
    }

    /// Build the segment for one item.
    pub async fn assemble_item<R: Rng + ?Sized>(
        &self,
        item: &SourceItem,
        rng: &mut R,
    ) -> Result<MediaSegment> {
        let key = NarrationCache::cache_key(&item.source_label, &item.id);
        let text = item.narration_text();

        let narration = self
            .cache
            .ensure(&key, &text, self.collab.synth, self.collab.backend)
            .await?;
        let duration = narration.audio.duration;

        let item_dir = self.work_dir.join(&key);
        ensure_dir(&item_dir)?;

        let visual = pick_visual(
            self.collab.visuals,
            self.collab.backend,
            rng,
            duration,
            &item_dir.join("visual.mp4"),
        )
        .with_context(|| format!("Picking background video for {}", item.id))?;

        let music = pick_background_audio(self.collab.music, rng)
            .with_context(|| format!("Picking background audio for {}", item.id))?;
        let mixed = mix_narration(
            self.collab.backend,
            &narration.audio,
            &music.path,
            MixGains::from(&self.config.mix),
            &item_dir,
        )
        .with_context(|| format!("Mixing audio for {}", item.id))?;

        let overlay = self.build_overlay(item, &text, duration, &item_dir)?;

        let segment = MediaSegment::new(&item.id, visual, mixed, overlay)?;
        emit(
            Level::Success,
            "reel.item.ready",
            &format!(
                "Segment ready for {} r/{} ({:.1}s)",
                item.id, item.source_label, duration
            ),
            Some(serde_json::json!({
                "id": item.id,
                "source": item.source_label,
                "duration": duration,
                "narration": narration.key,
                "cached_narration": narration.cached,
            })),
        );
        Ok(segment)
    }

    fn build_overlay(
        &self,
        item: &SourceItem,
        text: &str,
        duration: f64,
        item_dir: &Path,
    ) -> Result<Overlay> {
        let render = &self.config.render;
        match self.config.captions {
            CaptionMode::None => Ok(Overlay::None),
            CaptionMode::Words => {
                let instructions = word_timings(text, duration);
                if instructions.is_empty() {
                    return Ok(Overlay::None);
                }
                let subtitle_file = item_dir.join("captions.ass");
                let content = generate_ass_file(
                    &instructions,
                    &CaptionStyle::for_height(render.height()),
                    (render.width(), render.height()),
                );
                std::fs::write(&subtitle_file, content)
                    .with_context(|| format!("Failed to write {}", subtitle_file.display()))?;
                Ok(Overlay::Captions {
                    instructions,
                    subtitle_file,
                })
            }
            CaptionMode::Card => {
                let fields = CardFields::new(&item.title, &self.config.card);
                let image = ensure_card(
                    self.collab.cards,
                    &fields,
                    (render.width(), render.height()),
                    &self.config.cache_dir,
                    &item.id,
                )?;
                Ok(Overlay::Card(StaticCard::new(
                    image,
                    self.config.card.duration,
                    duration,
                )))
            }
        }
    }

    /// Assemble every item, skipping those that fail on their own, then pack
    /// and encode the parts.
    pub async fn run<R: Rng + ?Sized>(
        &self,
        items: &[SourceItem],
        rng: &mut R,
    ) -> Result<RunSummary> {
        self.check_pools()?;

        let mut summary = RunSummary::default();
        let mut segments = Vec::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            emit(
                Level::Info,
                "reel.item.start",
                &format!(
                    "[{}/{}] {} ({})",
                    idx + 1,
                    items.len(),
                    item.title,
                    item.id
                ),
                None,
            );

            match self.assemble_item(item, rng).await {
                Ok(segment) => {
                    summary.built.push(item.id.clone());
                    segments.push(segment);
                }
                Err(err) => {
                    if classify(&err).is_some_and(ReelError::is_fatal) {
                        return Err(err);
                    }
                    emit(
                        Level::Warn,
                        "reel.item.skipped",
                        &format!("Skipping {}: {:#}", item.id, err),
                        Some(serde_json::json!({ "id": item.id })),
                    );
                    summary.skipped.push((item.id.clone(), format!("{err:#}")));
                }
            }
        }

        if segments.is_empty() {
            if items.is_empty() {
                emit(
                    Level::Info,
                    "reel.run.empty",
                    "No items to assemble",
                    None,
                );
                return Ok(summary);
            }
            anyhow::bail!(
                "None of the {} items produced a segment",
                items.len()
            );
        }

        let parts = pack_segments(segments, self.config.max_part_duration);
        ensure_dir(&self.config.output_dir)?;

        for part in &parts {
            let out = part_output_path(&self.config.output_dir, part.number);
            self.collab.encoder.encode(part, &out)?;
            summary.parts.push(out);
        }

        Ok(summary)
    }
}
