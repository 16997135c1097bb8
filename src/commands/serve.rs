use anyhow::{Context as _, Result, bail};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;

use crate::Context;
use crate::cli::ServeArgs;
use crate::commands::build_orchestrator;
use crate::commands::sync::print_report;
use crate::config::Config;
use crate::ui;
use reconcile::{ControlHandle, Scheduler};

/// A line typed on stdin while serving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlCommand {
    /// Run a pass now, gate as usual
    Sync,
    /// Run a pass now and write regardless of sheet age
    Force,
    /// Run a pass now without writing
    Dry,
    Summary,
    Quit,
    Help,
}

impl ControlCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "sync" | "run" => Some(Self::Sync),
            "force" => Some(Self::Force),
            "dry" | "diff" => Some(Self::Dry),
            "summary" | "status" => Some(Self::Summary),
            "quit" | "exit" | "stop" => Some(Self::Quit),
            "help" | "?" => Some(Self::Help),
            _ => None,
        }
    }

    fn force(self) -> Option<bool> {
        match self {
            Self::Force => Some(true),
            Self::Dry => Some(false),
            _ => None,
        }
    }
}

pub fn run(ctx: &Context, args: ServeArgs) -> Result<()> {
    let config = Config::load()?;
    let interval = args
        .interval
        .map_or_else(|| config.interval(), Duration::from_secs);
    if interval.is_zero() {
        bail!("--interval must be at least 1 second");
    }

    let orchestrator = Arc::new(build_orchestrator(&config)?);
    let scheduler =
        Scheduler::start(orchestrator, interval).context("Could not start the scheduler")?;
    let control = scheduler.control();

    if !ctx.quiet {
        ui::info(&format!(
            "Syncing every {}; type 'help' for commands",
            ui::format_secs(i64::try_from(interval.as_secs()).unwrap_or(i64::MAX))
        ));
    }

    let mut quit = false;
    for line in io::stdin().lock().lines() {
        let line = line.context("Could not read stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        match ControlCommand::parse(&line) {
            Some(ControlCommand::Quit) => {
                quit = true;
                break;
            }
            Some(ControlCommand::Help) => print_help(),
            Some(ControlCommand::Summary) => print_summary(&control),
            Some(command) => run_manual(ctx, &control, command.force()),
            None => ui::warn(&format!("Unknown command: {}", line.trim())),
        }
    }

    if !quit {
        log::info!("stdin closed; serving until interrupted");
        loop {
            std::thread::park();
        }
    }

    if !ctx.quiet {
        ui::info("Stopping after the current pass");
    }
    scheduler.stop();
    Ok(())
}

fn run_manual(ctx: &Context, control: &ControlHandle, force: Option<bool>) {
    match control.run_now(force) {
        Ok(report) => print_report(ctx, &report),
        Err(e) => {
            ui::error(&format!("Sync pass failed: {e}"));
            ui::dim(e.category().advice());
        }
    }
}

fn print_summary(control: &ControlHandle) {
    let summary = control.summary();
    if summary.is_empty() {
        ui::success("Everyone is in today");
    } else {
        print!("{summary}");
    }
}

fn print_help() {
    ui::section("Commands");
    ui::kv("sync", "run a pass now");
    ui::kv("force", "run a pass now and write even if the sheet was just edited");
    ui::kv("dry", "run a pass now without writing");
    ui::kv("summary", "print who is out");
    ui::kv("quit", "stop after the current pass");
}
