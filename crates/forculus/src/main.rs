mod cli;
mod daemon;
mod error;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use forculus_config::LogFormat;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(&cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, format: LogFormat) {
    let filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn run(cli: &Cli) -> Result<(), CliError> {
    // The log format lives in the config, so it is loaded before tracing
    // is up; load errors are reported through miette either way.
    let config = forculus_config::load_config(cli.config.as_deref())?;
    init_tracing(cli.verbose, config.logging.format);

    config.validate()?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    if cli.validate {
        print!("{}", config.to_redacted_toml()?);
        println!("configuration OK");
        return Ok(());
    }

    daemon::run(&config).await
}
