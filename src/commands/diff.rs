use anyhow::Result;

use crate::Context;
use crate::commands::sync::print_planned;
use crate::commands::{build_orchestrator, run_pass};
use crate::config::Config;
use crate::ui;

/// Run a pass with writes held back and list what it would do
pub fn run(ctx: &Context) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = build_orchestrator(&config)?;

    let report = run_pass(&orchestrator, Some(false))?;

    if !ctx.quiet {
        ui::header("Diff");
        ui::kv("Took", &report.timings.to_string());
    }
    print_planned(&report);
    if let Some(report_to) = &report.report_to_change {
        ui::dim(&format!("set report-to to {report_to:?}"));
    }
    if report.stale_members > 0 {
        ui::dim(&format!("{} members are not on the sheet", report.stale_members));
    }
    Ok(())
}
