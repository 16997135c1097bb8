//! `rollcall.toml` loading and validation

use crate::paths;
use anyhow::{Context, Result, bail};
use chrono::TimeDelta;
use reconcile::{SheetLayout, SyncOptions, column_index};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment overrides for the registry section
pub const ENV_REGISTRY_URL: &str = "ROLLCALL_REGISTRY_URL";
pub const ENV_CLIENT_ID: &str = "ROLLCALL_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "ROLLCALL_CLIENT_SECRET";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry: RegistryConfig,
    pub sheet: SheetConfig,
    pub sync: SyncConfig,
    pub layout: LayoutConfig,
}

// ============================================================================
// Sections
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// Registry settings once every field is known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub url: String,
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetConfig {
    /// Used until the registry names a sheet
    pub spreadsheet_id: Option<String>,
    pub range: String,
    pub token_path: Option<String>,
}

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            range: sheets::DEFAULT_RANGE.to_string(),
            token_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub interval_secs: u64,
    pub quiet_period_secs: i64,
    pub jobs: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            quiet_period_secs: reconcile::DEFAULT_QUIET_PERIOD_SECS,
            jobs: reconcile::DEFAULT_JOBS,
        }
    }
}

/// Sheet columns by letter, rows by 0-based index
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub honorific: String,
    pub first_name: String,
    pub last_name: String,
    pub report_to: String,
    pub full_day: String,
    pub am_block: String,
    pub pm_block: String,
    pub periods: Vec<String>,
    pub report_to_row: usize,
    pub header_rows: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            honorific: "A".into(),
            first_name: "B".into(),
            last_name: "C".into(),
            report_to: "E".into(),
            full_day: "G".into(),
            am_block: "I".into(),
            pm_block: "J".into(),
            periods: ["M", "N", "O", "P", "Q", "R", "S", "T", "U", "V"]
                .into_iter()
                .map(String::from)
                .collect(),
            report_to_row: 2,
            header_rows: reconcile::layout::DEFAULT_HEADER_ROWS,
        }
    }
}

fn column(field: &str, letters: &str) -> Result<usize> {
    column_index(letters)
        .with_context(|| format!("[layout] {field} = {letters:?} is not a column letter"))
}

impl LayoutConfig {
    /// Resolve letters into a [`SheetLayout`]
    pub fn to_layout(&self) -> Result<SheetLayout> {
        let Ok(periods) = <[String; 10]>::try_from(self.periods.clone()) else {
            bail!(
                "[layout] periods needs 10 columns, found {}",
                self.periods.len()
            );
        };

        let mut period_columns = [0usize; 10];
        for (slot, letters) in period_columns.iter_mut().zip(&periods) {
            *slot = column("periods", letters)?;
        }

        Ok(SheetLayout {
            honorific: column("honorific", &self.honorific)?,
            first_name: column("first_name", &self.first_name)?,
            last_name: column("last_name", &self.last_name)?,
            full_day: column("full_day", &self.full_day)?,
            am_block: column("am_block", &self.am_block)?,
            pm_block: column("pm_block", &self.pm_block)?,
            periods: period_columns,
            report_to_row: self.report_to_row,
            report_to_col: column("report_to", &self.report_to)?,
            header_rows: self.header_rows,
        })
    }
}

// ============================================================================
// Loading
// ============================================================================

impl Config {
    /// Load `rollcall.toml` from the config dir, defaults if it is missing
    pub fn load() -> Result<Self> {
        let path = paths::config_file()?;
        let mut config = Self::load_from(&path)?;
        config.apply_env();
        Ok(config)
    }

    /// Load a config file without environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid TOML in {}", path.display()))
    }

    /// Apply `ROLLCALL_*` environment overrides
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let set = |slot: &mut Option<String>, key: &str| {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                log::debug!("Using {key} from environment");
                *slot = Some(value);
            }
        };
        set(&mut self.registry.url, ENV_REGISTRY_URL);
        set(&mut self.registry.client_id, ENV_CLIENT_ID);
        set(&mut self.registry.client_secret, ENV_CLIENT_SECRET);
    }

    /// Registry settings, or an error naming what is missing
    pub fn registry_credentials(&self) -> Result<RegistryCredentials> {
        fn required(value: Option<&String>, key: &str, env: &str) -> Result<String> {
            value
                .filter(|v| !v.trim().is_empty())
                .cloned()
                .with_context(|| format!("[registry] {key} is not set (or set {env})"))
        }

        Ok(RegistryCredentials {
            url: required(self.registry.url.as_ref(), "url", ENV_REGISTRY_URL)?,
            client_id: required(self.registry.client_id.as_ref(), "client_id", ENV_CLIENT_ID)?,
            client_secret: required(
                self.registry.client_secret.as_ref(),
                "client_secret",
                ENV_CLIENT_SECRET,
            )?,
        })
    }

    /// Where the sheet credentials live
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.sheet.token_path {
            Some(path) => Ok(paths::expand_path(path)),
            None => paths::default_token_path(),
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.sync.interval_secs)
    }

    /// Options handed to the orchestrator
    pub fn sync_options(&self) -> Result<SyncOptions> {
        Ok(SyncOptions {
            jobs: self.sync.jobs,
            quiet_period: TimeDelta::seconds(self.sync.quiet_period_secs),
            layout: self.layout.to_layout()?,
        })
    }

    /// Check everything a pass needs
    pub fn validate(&self) -> Result<()> {
        self.registry_credentials()?;
        self.layout.to_layout()?;
        if self.sync.jobs == 0 {
            bail!("[sync] jobs must be at least 1");
        }
        if self.sync.interval_secs == 0 {
            bail!("[sync] interval_secs must be at least 1");
        }
        if self.sync.quiet_period_secs < 0 {
            bail!("[sync] quiet_period_secs cannot be negative");
        }
        if self.sheet.range.trim().is_empty() {
            bail!("[sheet] range cannot be empty");
        }
        Ok(())
    }
}
