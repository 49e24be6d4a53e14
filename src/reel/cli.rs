use clap::{Args, Subcommand, ValueHint};
use std::path::PathBuf;

use super::config::CaptionMode;

#[derive(Subcommand, Debug, Clone)]
pub enum ReelCommands {
    /// Fetch posts, narrate them and render the output parts
    Run(RunArgs),
    /// Validate configuration, asset pools and required tools
    Check(CheckArgs),
    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Config file to use instead of the default location
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    /// Overlay mode: card, words or none
    #[arg(long)]
    pub captions: Option<CaptionMode>,

    /// Maximum number of posts to assemble
    #[arg(short = 'n', long)]
    pub limit: Option<usize>,

    /// Seed for asset selection, for reproducible runs
    #[arg(long)]
    pub seed: Option<u64>,

    /// Print the ffmpeg commands for each part instead of rendering
    #[arg(long)]
    pub dry_run: bool,

    /// Stream ffmpeg output while rendering
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Args, Debug, Clone)]
pub struct CheckArgs {
    /// Config file to use instead of the default location
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommands {
    /// Write a default config file
    Init {
        /// Where to write the file (defaults to the standard location)
        #[arg(long, value_hint = ValueHint::FilePath)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    /// Print the default config file location
    Path,
}
