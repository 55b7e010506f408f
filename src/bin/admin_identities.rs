use std::path::PathBuf;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

use pkla::admin;
use pkla::authority::DEFAULT_CONFIG_PATH;
use pkla::config::ConfigSource;

/// Interprets local-authority configuration files and prints the configured
/// administrator identities, one canonical string per line.
#[derive(Parser, Debug)]
#[command(name = "admin-identities", version, about)]
struct Cli {
    /// Use configuration files in DIR
    #[arg(short = 'c', long = "config-path", value_name = "DIR", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::try_parse().into_diagnostic()?;

    tracing::debug!(config = %cli.config_path.display(), "using config directory");
    let config = ConfigSource::new(&cli.config_path);

    for identity in admin::configured_admin_identities(&config) {
        println!("{identity}");
    }

    Ok(())
}
