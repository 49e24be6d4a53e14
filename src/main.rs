mod common;
mod reel;
mod ui;

use clap::Parser;

use crate::reel::ReelCommands;
use crate::ui::prelude::{Level, OutputFormat, emit};

/// storyreel main parser
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Emit one JSON event per line instead of coloured text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: ReelCommands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    ui::init(format, !cli.json);
    ui::set_debug_mode(cli.debug);

    if let Err(e) = reel::handle_reel_command(cli.command).await {
        emit(
            Level::Error,
            "reel.error",
            &format!("Error: {e:#}"),
            None,
        );
        std::process::exit(1);
    }
}
