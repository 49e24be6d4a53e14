use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the storyreel config directory
pub fn storyreel_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Unable to determine user config directory")?
        .join("storyreel");

    std::fs::create_dir_all(&config_dir)
        .with_context(|| format!("creating config directory at {}", config_dir.display()))?;

    Ok(config_dir)
}

/// Default location of the pipeline config file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(storyreel_config_dir()?.join("config.toml"))
}

/// Default narration cache directory (`~/.cache/storyreel/narration`)
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| {
            let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"));
            home.join(".cache")
        })
        .join("storyreel")
        .join("narration")
}

/// Expand a leading `~` and environment variables in a configured path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    match shellexpand::full(&raw) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(_) => PathBuf::from(shellexpand::tilde(&raw).into_owned()),
    }
}

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_path_keeps_plain_relative_paths() {
        assert_eq!(expand_path(Path::new("videos")), PathBuf::from("videos"));
    }

    #[test]
    fn expand_path_resolves_home() {
        let expanded = expand_path(Path::new("~/music"));
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("music"));
    }
}
