use anyhow::Result;

use crate::Context;
use crate::cli::ConfigCommand;
use crate::config::Config;
use crate::paths;
use crate::ui;

pub fn run(ctx: &Context, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show => show(),
        ConfigCommand::Validate => validate(ctx),
        ConfigCommand::Path => {
            println!("{}", paths::config_file()?.display());
            Ok(())
        }
    }
}

fn show() -> Result<()> {
    let path = paths::config_file()?;
    let config = Config::load()?;

    ui::header("Configuration");
    ui::kv("Config file", &path.display().to_string());
    if !path.exists() {
        ui::dim("(not found, showing defaults)");
    }

    let unset = || "(unset)".to_string();

    ui::section("Registry");
    ui::kv("url", &config.registry.url.clone().unwrap_or_else(unset));
    ui::kv(
        "client_id",
        &config.registry.client_id.clone().unwrap_or_else(unset),
    );
    ui::kv(
        "client_secret",
        &config
            .registry
            .client_secret
            .as_deref()
            .map_or_else(unset, ui::mask),
    );

    ui::section("Sheet");
    ui::kv(
        "spreadsheet_id",
        &config
            .sheet
            .spreadsheet_id
            .clone()
            .unwrap_or_else(|| "(from registry)".to_string()),
    );
    ui::kv("range", &config.sheet.range);
    ui::kv("token_path", &config.token_path()?.display().to_string());

    ui::section("Sync");
    ui::kv("interval", &format!("{}s", config.sync.interval_secs));
    ui::kv("quiet_period", &format!("{}s", config.sync.quiet_period_secs));
    ui::kv("jobs", &config.sync.jobs.to_string());

    ui::section("Layout");
    let layout = &config.layout;
    ui::kv(
        "names",
        &format!("{} {} {}", layout.honorific, layout.first_name, layout.last_name),
    );
    ui::kv(
        "report_to",
        &format!("{}{}", layout.report_to, layout.report_to_row + 1),
    );
    ui::kv(
        "blocks",
        &format!(
            "all day {}, AM {}, PM {}",
            layout.full_day, layout.am_block, layout.pm_block
        ),
    );
    ui::kv("periods", &layout.periods.join(" "));
    ui::kv("header_rows", &layout.header_rows.to_string());

    Ok(())
}

fn validate(ctx: &Context) -> Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let token_path = config.token_path()?;
    if !token_path.exists() {
        ui::warn(&format!(
            "No sheet credentials at {}",
            token_path.display()
        ));
    }

    if !ctx.quiet {
        ui::success("Configuration is valid");
    }
    Ok(())
}
