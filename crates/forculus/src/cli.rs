//! Clap derive structures for the `forculus` daemon.

use std::path::PathBuf;

use clap::Parser;

/// forculus -- watch ZoneMinder for alerts and new recordings
#[derive(Debug, Parser)]
#[command(
    name = "forculus",
    version,
    about = "Watch ZoneMinder for monitor alerts and newly recorded events",
    long_about = "Polls a ZoneMinder server for monitor alarm transitions and new\n\
        recordings and publishes them as events to the registered handlers.\n\n\
        Runs until interrupted (Ctrl-C or SIGTERM)."
)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', env = "FORCULUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace)
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Load and validate the configuration, print it, and exit
    #[arg(long)]
    pub validate: bool,
}
