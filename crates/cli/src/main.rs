use clap::Parser;
use deobf_cli::commands::{Cmd, Command};

/// Deobf CLI
///
/// Deobf renames an obfuscated jar through an SRG mapping, widens access with access
/// transformer rules, injects structural metadata and optionally strips synthetic flags.
#[derive(Parser)]
#[command(name = "deobf")]
#[command(about = "Deobf: jar remapping and access transformer pipeline")]
struct Cli {
    /// Log every entry and rule application.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Cmd,
}

/// Runs the Deobf CLI with the provided arguments.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_ansi(false)
        .without_time()
        .init();

    cli.command.execute()
}
