use anyhow::{bail, Context};
use colored::Colorize;
use tracing::debug;
use wbl_sdk::{Arity, Contract, LedgerConfig, Operation, Response};

use crate::cli::*;

/// Resolve the effective configuration: the file if it exists, otherwise
/// defaults, then command-line overrides.
pub fn load_config(cli: &Cli) -> anyhow::Result<LedgerConfig> {
    let mut config = if cli.config.exists() {
        LedgerConfig::load(&cli.config)
            .with_context(|| format!("loading {}", cli.config.display()))?
    } else {
        LedgerConfig::default()
    };
    if let Some(dir) = &cli.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

pub fn run_command(cli: Cli, config: LedgerConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Invoke(args) => cmd_invoke(args, &config, &cli.format),
        Command::Functions => cmd_functions(),
        Command::Config => cmd_config(&config),
    }
}

fn cmd_invoke(args: InvokeArgs, config: &LedgerConfig, format: &OutputFormat) -> anyhow::Result<()> {
    let contract = Contract::open(config)
        .with_context(|| format!("opening ledger at {}", config.wal_path().display()))?;
    debug!(function = %args.function, args = args.args.len(), "invoking");

    match contract.invoke(&args.function, &args.args) {
        Response::Success(payload) => {
            match format {
                OutputFormat::Json => println!("{}", String::from_utf8_lossy(&payload)),
                OutputFormat::Text if payload.is_empty() => {
                    println!("{} {}", "✓".green().bold(), args.function.bold());
                }
                OutputFormat::Text => println!("{}", render_payload(&payload)),
            }
            Ok(())
        }
        Response::Error(message) => {
            eprintln!("{} {}: {}", "✗".red().bold(), args.function.bold(), message);
            bail!("{} failed", args.function)
        }
    }
}

fn cmd_functions() -> anyhow::Result<()> {
    for op in Operation::ALL {
        let arity = match op.arity() {
            Arity::Exactly(n) => n.to_string(),
            Arity::AtLeast(n) => format!("{n}+"),
        };
        let kind = if op.is_mutation() { "write".yellow() } else { "read".cyan() };
        println!("  {:<32} {:>3} args  {}", op.name().bold(), arity, kind);
    }
    Ok(())
}

fn cmd_config(config: &LedgerConfig) -> anyhow::Result<()> {
    let text = toml::to_string_pretty(config).context("encoding configuration")?;
    print!("{text}");
    println!("# wal: {}", config.wal_path().display().to_string().dimmed());
    Ok(())
}

/// Pretty-print JSON payloads; anything else is shown as text.
fn render_payload(payload: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(payload) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}
