use anyhow::{Result, anyhow};

use super::assets::{AssetKind, AssetPool, DirectoryPool};
use super::cli::CheckArgs;
use super::config::ReelConfig;
use super::speech::create_synthesizer;
use crate::common::paths::ensure_dir;
use crate::ui::prelude::{Level, emit};

const REQUIRED_TOOLS: &[&str] = &["ffmpeg", "ffprobe"];

pub fn handle_check(args: CheckArgs) -> Result<()> {
    let config = ReelConfig::load(args.config.as_deref())?;
    let mut problems = 0usize;

    match config.validate() {
        Ok(()) => emit(
            Level::Success,
            "reel.check.config",
            "Configuration is valid",
            None,
        ),
        Err(err) => {
            problems += 1;
            emit(Level::Error, "reel.check.config", &err.to_string(), None);
        }
    }

    for tool in REQUIRED_TOOLS {
        match which::which(tool) {
            Ok(path) => emit(
                Level::Success,
                "reel.check.tool",
                &format!("{} found at {}", tool, path.display()),
                None,
            ),
            Err(_) => {
                problems += 1;
                emit(
                    Level::Error,
                    "reel.check.tool",
                    &format!("{} is not on PATH", tool),
                    None,
                );
            }
        }
    }

    for pool in [
        DirectoryPool::new(&config.videos_dir, AssetKind::Visual),
        DirectoryPool::new(&config.music_dir, AssetKind::Audio),
    ] {
        match pool.list() {
            Ok(assets) if !assets.is_empty() => emit(
                Level::Success,
                "reel.check.pool",
                &format!(
                    "{} pool {}: {} files",
                    pool.kind(),
                    pool.dir().display(),
                    assets.len()
                ),
                None,
            ),
            Ok(_) => {
                problems += 1;
                emit(
                    Level::Error,
                    "reel.check.pool",
                    &format!("{} pool {} is empty", pool.kind(), pool.dir().display()),
                    None,
                );
            }
            Err(err) => {
                problems += 1;
                emit(Level::Error, "reel.check.pool", &format!("{err:#}"), None);
            }
        }
    }

    let writable = ensure_dir(&config.cache_dir)
        .and_then(|_| Ok(tempfile::tempfile_in(&config.cache_dir)?));
    match writable {
        Ok(_) => emit(
            Level::Success,
            "reel.check.cache",
            &format!("Cache directory {} is writable", config.cache_dir.display()),
            None,
        ),
        Err(err) => {
            problems += 1;
            emit(
                Level::Error,
                "reel.check.cache",
                &format!("Cache directory {}: {err:#}", config.cache_dir.display()),
                None,
            );
        }
    }

    let synth = create_synthesizer(&config.speech);
    if synth.is_available() {
        emit(
            Level::Success,
            "reel.check.speech",
            &format!("Speech provider {} is ready", synth.name()),
            None,
        );
    } else {
        problems += 1;
        emit(
            Level::Error,
            "reel.check.speech",
            &format!("Speech provider {} is not usable", synth.name()),
            None,
        );
    }

    if problems > 0 {
        return Err(anyhow!("{} check(s) failed", problems));
    }
    Ok(())
}
