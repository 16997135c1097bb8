pub mod config;
pub mod diff;
pub mod serve;
pub mod summary;
pub mod sync;

use crate::config::Config;
use crate::ui;
use anyhow::{Context as _, Result};
use reconcile::{Orchestrator, PassReport};
use registry::RegistryClient;
use sheets::{Authenticator, AuthorizedUser, SheetsClient};

/// Wire the configured sheet and registry clients into an orchestrator
pub fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    config.validate()?;

    let credentials = config.registry_credentials()?;
    let registry = RegistryClient::new(
        credentials.url,
        credentials.client_id,
        credentials.client_secret,
    );

    let token_path = config.token_path()?;
    let user = AuthorizedUser::load(&token_path)
        .with_context(|| format!("Could not load sheet credentials from {}", token_path.display()))?;
    let sheet = SheetsClient::new(
        Authenticator::new(user),
        config.sheet.spreadsheet_id.clone().unwrap_or_default(),
        config.sheet.range.clone(),
    );

    Ok(Orchestrator::new(sheet, registry, config.sync_options()?))
}

/// Run one pass, printing advice for the failure category on error
pub fn run_pass(orchestrator: &Orchestrator, force: Option<bool>) -> Result<PassReport> {
    orchestrator.sync(force).map_err(|e| {
        ui::dim(e.category().advice());
        anyhow::Error::new(e).context("Sync pass failed")
    })
}
