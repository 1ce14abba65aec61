use std::path::PathBuf;

use clap::{ArgAction, Parser};

#[derive(Parser)]
#[command(name = "arpcast")]
#[command(version, about = "Reports the devices on your LAN to an MQTT broker.")]
pub struct CommandLine {
    /// Path to the JSON configuration
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
