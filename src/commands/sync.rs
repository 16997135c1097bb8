use anyhow::{Result, bail};

use crate::Context;
use crate::cli::SyncArgs;
use crate::commands::{build_orchestrator, run_pass};
use crate::config::Config;
use crate::ui;
use reconcile::PassReport;

pub fn run(ctx: &Context, args: SyncArgs) -> Result<()> {
    let config = Config::load()?;
    let orchestrator = build_orchestrator(&config)?;

    let report = run_pass(&orchestrator, args.force_flag())?;
    print_report(ctx, &report);

    if !report.is_success() {
        bail!("Some registry writes failed");
    }
    Ok(())
}

/// Print a pass report for humans
pub fn print_report(ctx: &Context, report: &PassReport) {
    if ctx.quiet {
        print_failures(report);
        return;
    }

    ui::header("Sync pass");
    ui::kv(
        "Finished",
        &report
            .finished_at
            .with_timezone(&chrono::Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string(),
    );
    ui::kv("Took", &report.timings.to_string());
    ui::kv(
        "Sheet",
        if report.sheet_changed {
            "changed since last pass"
        } else {
            "unchanged"
        },
    );

    let summary = &report.summary;
    ui::kv(
        "Planned",
        &format!(
            "{} new, {} renamed, {} absence changes",
            summary.creations, summary.renames, summary.absence_changes
        ),
    );
    if report.stale_members > 0 {
        ui::kv("Stale", &format!("{} members not on the sheet", report.stale_members));
    }
    if let Some(report_to) = &report.report_to_change {
        ui::kv("Report-to", report_to);
    }
    if !report.skipped_rows.is_empty() {
        let rows: Vec<String> = report
            .skipped_rows
            .iter()
            .map(|idx| (idx + 1).to_string())
            .collect();
        ui::warn(&format!(
            "Skipped sheet rows with incomplete names: {}",
            rows.join(", ")
        ));
    }

    if ctx.verbose > 0 {
        print_planned(report);
    }

    println!();
    match &report.writes {
        Some(writes) => {
            if writes.is_success() {
                ui::success(&format!("{} registry writes applied", writes.succeeded()));
            } else {
                ui::warn(&format!(
                    "{} registry writes applied, {} failed",
                    writes.succeeded(),
                    writes.failures.len()
                ));
                print_failures(report);
            }
        }
        None => match report.gate_remaining_secs {
            Some(secs) if report.is_noop() => ui::info(&format!(
                "Nothing to write; gate opens in {}",
                ui::format_secs(secs)
            )),
            Some(secs) => {
                ui::info(&format!(
                    "Sheet may still be in edit; writes held for another {}",
                    ui::format_secs(secs)
                ));
                ui::dim("Force the pass to write now");
            }
            None => ui::info("Dry run; nothing written"),
        },
    }
}

/// Print every action a pass planned
pub fn print_planned(report: &PassReport) {
    ui::section("Planned writes");
    if report.actions.is_empty() && report.new_members.is_empty() {
        ui::dim("none");
        return;
    }
    for action in &report.actions {
        ui::dim(&action.to_string());
    }
    for member in &report.new_members {
        ui::dim(&format!("create member {} ({})", member.name().formatted(), member.absence()));
    }
}

fn print_failures(report: &PassReport) {
    if let Some(writes) = &report.writes {
        for failure in &writes.failures {
            ui::error(&failure.to_string());
        }
    }
}
