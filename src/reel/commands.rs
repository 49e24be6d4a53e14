use anyhow::{Context, Result};
use rand::SeedableRng;
use rand::rngs::StdRng;

use super::assets::{AssetKind, DirectoryPool};
use super::card::FfmpegCardRenderer;
use super::check::handle_check;
use super::cli::{ConfigCommands, ReelCommands, RunArgs};
use super::config::ReelConfig;
use super::media::ffmpeg::{FfmpegBackend, SystemFfmpegRunner};
use super::pipeline::{Collaborators, Pipeline};
use super::render::FfmpegPartEncoder;
use super::source::{ContentSource, RedditSource};
use super::speech::create_synthesizer;
use crate::common::paths;
use crate::common::progress::{create_spinner, finish_spinner_with_success};
use crate::ui::prelude::{Level, emit};

pub async fn handle_reel_command(command: ReelCommands) -> Result<()> {
    match command {
        ReelCommands::Run(args) => handle_run(args).await,
        ReelCommands::Check(args) => handle_check(args),
        ReelCommands::Config { command } => handle_config(command),
    }
}

fn handle_config(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Init { path, force } => {
            let path = match path {
                Some(p) => p,
                None => paths::default_config_path()?,
            };
            if path.exists() && !force {
                emit(
                    Level::Warn,
                    "reel.config.exists",
                    &format!(
                        "{} already exists (use --force to overwrite)",
                        path.display()
                    ),
                    None,
                );
                return Ok(());
            }
            ReelConfig::default().save_to_path(&path)?;
            emit(
                Level::Success,
                "reel.config.written",
                &format!("Wrote default config to {}", path.display()),
                None,
            );
            Ok(())
        }
        ConfigCommands::Path => {
            let path = paths::default_config_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

async fn handle_run(args: RunArgs) -> Result<()> {
    let mut config = ReelConfig::load(args.config.as_deref())?;
    if let Some(captions) = args.captions {
        config.captions = captions;
    }
    if let Some(limit) = args.limit {
        config.max_posts_per_run = limit;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let runner = SystemFfmpegRunner;
    let backend = FfmpegBackend::new(&runner);
    let cards = FfmpegCardRenderer::new(&runner, config.card.font_file.clone());
    let encoder = FfmpegPartEncoder::new(
        &runner,
        config.render.clone(),
        config.card.scale,
        args.dry_run,
        args.verbose,
    );
    let synth = create_synthesizer(&config.speech);
    let visuals = DirectoryPool::new(&config.videos_dir, AssetKind::Visual);
    let music = DirectoryPool::new(&config.music_dir, AssetKind::Audio);

    let work = tempfile::Builder::new()
        .prefix("storyreel-")
        .tempdir()
        .context("Failed to create working directory")?;

    let pipeline = Pipeline::new(
        &config,
        work.path(),
        Collaborators {
            synth: synth.as_ref(),
            backend: &backend,
            cards: &cards,
            encoder: &encoder,
            visuals: &visuals,
            music: &music,
        },
    );
    pipeline.check_pools()?;

    let pb = create_spinner(format!(
        "Fetching up to {} posts from {}...",
        config.max_posts_per_run,
        config.subreddits.join(", ")
    ));
    let items = RedditSource::new()
        .fetch(
            &config.subreddits,
            config.max_posts_per_run,
            config.min_upvotes,
        )
        .await?;
    finish_spinner_with_success(pb, format!("Fetched {} posts", items.len()));

    let summary = pipeline.run(&items, &mut rng).await?;

    if args.dry_run && !summary.parts.is_empty() {
        let kept = work.keep();
        emit(
            Level::Info,
            "reel.run.work_kept",
            &format!("Intermediate files kept in {}", kept.display()),
            None,
        );
    }

    emit(
        Level::Success,
        "reel.run.complete",
        &format!(
            "Built {} segments into {} parts ({} skipped)",
            summary.built.len(),
            summary.parts.len(),
            summary.skipped.len()
        ),
        Some(serde_json::json!({
            "built": summary.built,
            "skipped": summary
                .skipped
                .iter()
                .map(|(id, reason)| serde_json::json!({ "id": id, "reason": reason }))
                .collect::<Vec<_>>(),
            "parts": summary
                .parts
                .iter()
                .map(|p| p.display().to_string())
                .collect::<Vec<_>>(),
        })),
    );

    Ok(())
}
