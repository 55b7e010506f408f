use std::path::PathBuf;

use clap::Parser;
use miette::{miette, IntoDiagnostic, Result};
use tracing_subscriber::{fmt, EnvFilter};

use pkla::authority::DEFAULT_STORE_PATHS;
use pkla::{Authority, Details, Identity, ImplicitAuthorization, PolicyAuthority};

/// Decides the implicit authorization for one (user, action) query against
/// the local authorization stores and prints the outcome's canonical token
/// (an empty line for `unknown`).
#[derive(Parser, Debug)]
#[command(name = "check-authorization", version, about)]
struct Cli {
    /// Semicolon-separated list of authorization store top directories
    #[arg(short = 'p', long = "paths", value_name = "PATHS")]
    paths: Option<String>,

    /// Identity of the subject's user, e.g. unix-user:john
    user: String,

    /// Whether the subject is in a local session (true/false)
    local: String,

    /// Whether the subject is in the active session (true/false)
    active: String,

    /// Action id to check, e.g. com.example.awesomeproduct.foo
    action: String,
}

fn main() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::try_parse().into_diagnostic()?;

    let user: Identity = cli.user.parse()?;
    let local = parse_flag("local", &cli.local)?;
    let active = parse_flag("active", &cli.active)?;

    let paths: Vec<PathBuf> = match &cli.paths {
        Some(paths) => paths
            .split(';')
            .filter(|p| !p.is_empty())
            .map(PathBuf::from)
            .collect(),
        None => DEFAULT_STORE_PATHS.iter().map(PathBuf::from).collect(),
    };

    let authority = Authority::builder()
        .store_paths(paths)
        .monitor(false)
        .build();

    let result = authority.check_authorization_sync(
        &user,
        local,
        active,
        &cli.action,
        &Details::new(),
        ImplicitAuthorization::Unknown,
    );

    if result.is_unknown() {
        println!();
    } else {
        println!("{result}");
    }
    Ok(())
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(miette!("<{name}> must be `true` or `false`, got `{value}`")),
    }
}
