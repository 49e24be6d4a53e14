use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Scratch workspace with a config file and empty asset pools.
pub struct TestEnvironment {
    temp_dir: TempDir,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = tempfile::tempdir()?;
        fs::create_dir_all(temp_dir.path().join("videos"))?;
        fs::create_dir_all(temp_dir.path().join("music"))?;
        Ok(Self { temp_dir })
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.path().join("config.toml")
    }

    /// Write a config whose directories all live inside the workspace.
    pub fn write_config(&self, extra: &str) -> Result<PathBuf> {
        let root = self.path().display().to_string();
        let contents = format!(
            "videos_dir = \"{root}/videos\"\nmusic_dir = \"{root}/music\"\ncache_dir = \"{root}/cache\"\noutput_dir = \"{root}/output\"\n{extra}\n"
        );
        let path = self.config_path();
        fs::write(&path, contents)?;
        Ok(path)
    }
}
