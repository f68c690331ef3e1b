//! srcxref CLI - ingest resolved source facts and browse cross-references

mod cli;
mod commands;
mod output;

use std::process::ExitCode;

use srcxref_core::{Config, IndexError};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use cli::{Cli, Commands};
use commands::Context;
use output::{JsonIssue, JsonResponse};

fn main() -> ExitCode {
    let cli = cli::parse();
    let command = cli.command.name();
    let json = cli.json;

    let result = load_config(&cli).and_then(|config| {
        init_tracing(&config, cli.verbose);
        let ctx = Context {
            config,
            json: cli.json,
            quiet: cli.quiet,
        };
        match &cli.command {
            Commands::Ingest { dump, force } => commands::run_ingest(&ctx, dump, *force),
            Commands::Render {
                artifact,
                path,
                format,
            } => commands::run_render(&ctx, artifact, path, *format),
            Commands::Refs { binding } => commands::run_refs(&ctx, binding),
            Commands::Status { artifact } => commands::run_status(&ctx, artifact),
        }
    });

    match result {
        Ok(code) => ExitCode::from(code as u8),
        Err(e) => {
            if json {
                let response = JsonResponse::error(command, (), vec![JsonIssue::from(&e)]);
                match serde_json::to_string_pretty(&response) {
                    Ok(text) => println!("{}", text),
                    Err(_) => eprintln!("error: {}", e),
                }
            } else {
                eprintln!("error: {}", e);
            }
            ExitCode::from(e.exit_code() as u8)
        }
    }
}

/// Load `--config`, else `./srcxref.toml`, else defaults; `--db` wins over
/// `[store] path`.
fn load_config(cli: &Cli) -> Result<Config, IndexError> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&std::env::current_dir()?)?,
    };
    if let Some(db) = &cli.db {
        config.store.path = db.clone();
    }
    Ok(config)
}

/// Install the fmt subscriber on stderr; `RUST_LOG` overrides the
/// configured filter.
fn init_tracing(config: &Config, verbose: bool) {
    let fallback = if verbose {
        "debug"
    } else {
        config.log.filter.as_str()
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

