use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "wbl",
    about = "Waybill Ledger: shipment orders, positions and proofs",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file; defaults apply when it does not exist
    #[arg(short, long, global = true, default_value = "wbl.toml")]
    pub config: PathBuf,

    /// Override the configured data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Invoke a ledger function with positional arguments
    Invoke(InvokeArgs),
    /// List the invocable functions and their argument counts
    Functions,
    /// Print the effective configuration
    Config,
}

#[derive(Args)]
pub struct InvokeArgs {
    pub function: String,
    #[arg(allow_hyphen_values = true)]
    pub args: Vec<String>,
}
