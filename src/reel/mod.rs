pub mod cli;
pub mod commands;
mod assets;
mod captions;
mod card;
mod check;
mod config;
mod error;
mod media;
mod mixer;
mod packer;
mod pipeline;
mod render;
mod segment;
mod source;
mod speech;

#[cfg(test)]
mod testing;

pub use cli::ReelCommands;
pub use commands::handle_reel_command;
