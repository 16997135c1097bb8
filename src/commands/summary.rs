use anyhow::Result;

use crate::Context;
use crate::commands::{build_orchestrator, run_pass};
use crate::config::Config;
use crate::ui;

/// Pull once without writing and print who is out
pub fn run(ctx: &Context) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = build_orchestrator(&config)?;
    run_pass(&orchestrator, Some(false))?;

    let summary = orchestrator.summary();
    if summary.is_empty() {
        if !ctx.quiet {
            ui::success("Everyone is in today");
        }
    } else {
        print!("{summary}");
    }
    Ok(())
}
