use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::common::paths;

use super::error::ReelError;

/// Environment variable consulted once at startup when `speech.api_key` is unset.
pub const SPEECH_API_KEY_ENV: &str = "STORYREEL_SPEECH_API_KEY";

/// How each segment is overlaid
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CaptionMode {
    /// Static story card over the first seconds of the segment
    #[default]
    Card,
    /// Word-by-word captions spread evenly over the narration
    Words,
    /// Background and narration only
    None,
}

impl std::str::FromStr for CaptionMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "card" => Ok(CaptionMode::Card),
            "words" => Ok(CaptionMode::Words),
            "none" => Ok(CaptionMode::None),
            _ => anyhow::bail!("Unknown caption mode: '{}'. Expected: card, words, or none", s),
        }
    }
}

/// Which speech backend synthesizes narration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpeechProviderKind {
    /// Hosted text-to-speech over HTTP
    #[default]
    ElevenLabs,
    /// Local piper binary
    Piper,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechConfig {
    pub provider: SpeechProviderKind,
    pub voice_id: String,
    pub model_id: String,
    pub api_key: Option<String>,
    /// Per-call character ceiling of the provider
    pub max_chars: usize,
    /// Voice model file for the piper backend
    pub piper_model: Option<PathBuf>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            provider: SpeechProviderKind::default(),
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model_id: "eleven_flash_v2_5".to_string(),
            api_key: None,
            max_chars: ReelConfig::DEFAULT_MAX_CHARS,
            piper_model: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MixConfig {
    pub narration_gain: f32,
    pub background_gain: f32,
}

impl Default for MixConfig {
    fn default() -> Self {
        Self {
            narration_gain: 1.2,
            background_gain: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CardConfig {
    /// Seconds the card stays on screen
    pub duration: f64,
    /// Card height relative to the output height
    pub scale: f64,
    pub username: String,
    pub like_count: String,
    pub comment_count: String,
    pub font_file: Option<PathBuf>,
}

impl Default for CardConfig {
    fn default() -> Self {
        Self {
            duration: 5.0,
            scale: 0.75,
            username: "redditstories".to_string(),
            like_count: "99+".to_string(),
            comment_count: "99+".to_string(),
            font_file: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub resolution: [u32; 2],
    pub frame_rate: u32,
    pub video_codec: String,
    pub audio_codec: String,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            resolution: [1080, 1920],
            frame_rate: 30,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl RenderSettings {
    pub fn width(&self) -> u32 {
        self.resolution[0]
    }

    pub fn height(&self) -> u32 {
        self.resolution[1]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReelConfig {
    pub subreddits: Vec<String>,
    pub max_posts_per_run: usize,
    pub min_upvotes: i64,
    pub videos_dir: PathBuf,
    pub music_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Ceiling for the summed duration of one output part, in seconds
    pub max_part_duration: f64,
    pub captions: CaptionMode,
    /// Fixed RNG seed; unset means a fresh seed per run
    pub seed: Option<u64>,
    pub speech: SpeechConfig,
    pub mix: MixConfig,
    pub card: CardConfig,
    pub render: RenderSettings,
}

impl Default for ReelConfig {
    fn default() -> Self {
        Self {
            subreddits: vec!["AmItheAsshole".to_string(), "tifu".to_string()],
            max_posts_per_run: 5,
            min_upvotes: 1000,
            videos_dir: PathBuf::from("videos"),
            music_dir: PathBuf::from("music"),
            cache_dir: paths::default_cache_dir(),
            output_dir: PathBuf::from("output"),
            max_part_duration: Self::DEFAULT_MAX_PART_DURATION,
            captions: CaptionMode::default(),
            seed: None,
            speech: SpeechConfig::default(),
            mix: MixConfig::default(),
            card: CardConfig::default(),
            render: RenderSettings::default(),
        }
    }
}

impl ReelConfig {
    pub const DEFAULT_MAX_PART_DURATION: f64 = 180.0;
    pub const DEFAULT_MAX_CHARS: usize = 3000;

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing file is created with defaults. The speech API key falls back
    /// to [`SPEECH_API_KEY_ENV`]; this is the only place process environment
    /// is read.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => paths::default_config_path()?,
        };
        let mut config = Self::load_from_path(&path)?;
        if config.speech.api_key.as_deref().is_none_or(str::is_empty) {
            config.speech.api_key = std::env::var(SPEECH_API_KEY_ENV)
                .ok()
                .filter(|k| !k.is_empty());
        }
        Ok(config)
    }

    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            let config = Self::default();
            config.save_to_path(path)?;
            return Ok(config);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn save_to_path(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating config directory {}", parent.display()))?;
        }

        let toml = toml::to_string_pretty(self).context("serializing config")?;
        fs::write(path, toml).with_context(|| format!("writing config to {}", path.display()))?;
        Ok(())
    }

    /// Replace nonsensical numeric values with defaults and expand `~` in paths.
    fn sanitized(mut self) -> Self {
        let mix_defaults = MixConfig::default();
        if !self.mix.narration_gain.is_finite() || self.mix.narration_gain < 0.0 {
            self.mix.narration_gain = mix_defaults.narration_gain;
        }
        if !self.mix.background_gain.is_finite() || self.mix.background_gain < 0.0 {
            self.mix.background_gain = mix_defaults.background_gain;
        }
        if !self.card.duration.is_finite() || self.card.duration < 0.0 {
            self.card.duration = CardConfig::default().duration;
        }
        if !self.card.scale.is_finite() || self.card.scale <= 0.0 {
            self.card.scale = CardConfig::default().scale;
        }

        self.videos_dir = paths::expand_path(&self.videos_dir);
        self.music_dir = paths::expand_path(&self.music_dir);
        self.cache_dir = paths::expand_path(&self.cache_dir);
        self.output_dir = paths::expand_path(&self.output_dir);
        self.speech.piper_model = self.speech.piper_model.map(|p| paths::expand_path(&p));
        self.card.font_file = self.card.font_file.map(|p| paths::expand_path(&p));
        self
    }

    /// Startup validation; any failure here is fatal to the run.
    pub fn validate(&self) -> Result<(), ReelError> {
        if self.subreddits.is_empty() {
            return Err(ReelError::Configuration(
                "at least one subreddit must be configured".into(),
            ));
        }
        if !self.max_part_duration.is_finite() || self.max_part_duration <= 0.0 {
            return Err(ReelError::Configuration(format!(
                "max_part_duration must be positive, got {}",
                self.max_part_duration
            )));
        }
        if self.captions == CaptionMode::Card
            && (!self.card.duration.is_finite() || self.card.duration <= 0.0)
        {
            return Err(ReelError::Configuration(format!(
                "card.duration must be positive in card caption mode, got {} (use captions = \"none\" to disable the card)",
                self.card.duration
            )));
        }
        if self.speech.max_chars == 0 {
            return Err(ReelError::Configuration(
                "speech.max_chars must be greater than zero".into(),
            ));
        }
        if self.render.width() == 0 || self.render.height() == 0 || self.render.frame_rate == 0 {
            return Err(ReelError::Configuration(
                "render resolution and frame_rate must be non-zero".into(),
            ));
        }
        match self.speech.provider {
            SpeechProviderKind::ElevenLabs => {
                if self.speech.api_key.as_deref().is_none_or(str::is_empty) {
                    return Err(ReelError::Configuration(format!(
                        "speech.api_key is not set (or export {SPEECH_API_KEY_ENV})"
                    )));
                }
            }
            SpeechProviderKind::Piper => {
                if self.speech.piper_model.is_none() {
                    return Err(ReelError::Configuration(
                        "speech.piper_model is required for the piper provider".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}
