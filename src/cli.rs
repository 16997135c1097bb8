use clap::{Parser, Subcommand};
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "rollcall")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Keep a roster absence sheet and its registry in sync", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sync on a timer; control lines (sync, force, summary, quit) on stdin
    Serve(ServeArgs),

    /// Run a single pass and print what it did
    Sync(SyncArgs),

    /// Show the writes a pass would make, without writing
    Diff,

    /// Print who is out today
    Summary,

    /// Inspect configuration
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(clap::Args)]
pub struct ServeArgs {
    /// Seconds between passes (overrides [sync] interval_secs)
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,
}

#[derive(clap::Args)]
pub struct SyncArgs {
    /// Write now; a single pass otherwise holds writes for the quiet period
    #[arg(long, conflicts_with = "dry_run")]
    pub force: bool,

    /// Never write, whatever the sheet's age
    #[arg(long, short = 'n')]
    pub dry_run: bool,
}

impl SyncArgs {
    /// Write-gate override for the orchestrator
    pub fn force_flag(&self) -> Option<bool> {
        if self.force {
            Some(true)
        } else if self.dry_run {
            Some(false)
        } else {
            None
        }
    }
}

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show the effective configuration (secrets masked)
    Show,

    /// Check the configuration for problems
    Validate,

    /// Print the config file path
    Path,
}
