//! Build automation tasks for cipherpost
//!
//! Run with: cargo xtask <command>

use clap::{Parser, Subcommand};
use std::process::Command;

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "cipherpost build automation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all tests
    Test,

    /// Run clippy lints
    Lint,

    /// Check formatting
    Fmt,

    /// Run all CI checks
    Ci,

    /// Generate documentation
    Doc {
        /// Open the docs in a browser
        #[arg(long)]
        open: bool,
    },
}

const TEST: &[&str] = &["test", "--workspace"];
const LINT: &[&str] = &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"];
const FMT: &[&str] = &["fmt", "--all", "--check"];

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Test => run_cargo(TEST)?,
        Commands::Lint => run_cargo(LINT)?,
        Commands::Fmt => run_cargo(FMT)?,
        Commands::Ci => {
            println!("Running CI checks...");
            run_cargo(FMT)?;
            run_cargo(LINT)?;
            run_cargo(TEST)?;
            println!("All CI checks passed!");
        }
        Commands::Doc { open } => {
            let mut args = vec!["doc", "--workspace", "--no-deps"];
            if open {
                args.push("--open");
            }
            run_cargo(&args)?;
        }
    }

    Ok(())
}

fn run_cargo(args: &[&str]) -> anyhow::Result<()> {
    let cargo = std::env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());
    let status = Command::new(&cargo).args(args).status()?;

    if !status.success() {
        anyhow::bail!("{} {:?} failed", cargo, args);
    }

    Ok(())
}
