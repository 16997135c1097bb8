//! Collaborator traits
//!
//! These traits let the orchestrator run without depending on a specific
//! spreadsheet provider, registry client or clock.

use crate::member::{RegistryMember, RosterMember};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Source of the human-edited grid
pub trait SheetSource: Send + Sync {
    /// Fetch every row of the sheet, header rows included
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>>;

    /// Point the source at a different sheet
    ///
    /// Called at the start of a pass when the registry names the sheet to
    /// read. Sources with a fixed target ignore it.
    fn retarget(&self, _sheet_id: &str) {}
}

/// Read side of the registry
pub trait RegistrySource: Send + Sync {
    /// Every member the registry knows about
    fn list_members(&self) -> Result<Vec<RegistryMember>>;

    /// Current report-to string
    fn report_to(&self) -> Result<String>;

    /// Id of the sheet the registry wants synced, if it tracks one
    fn sheet_id(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Write side of the registry
///
/// Every call stands alone; nothing is transactional across calls.
pub trait RegistrySink: Send + Sync {
    /// Create a member, returning the id the registry assigned
    fn create_member(&self, member: &RosterMember) -> Result<String>;

    /// Replace a member's name
    fn rename_member(&self, member: &RosterMember) -> Result<()>;

    /// Replace a member's absence
    fn set_absence(&self, member: &RosterMember) -> Result<()>;

    /// Replace the report-to string
    fn set_report_to(&self, report_to: &str) -> Result<()>;
}

/// Both halves of a registry client
pub trait Registry: RegistrySource + RegistrySink {}

impl<T: RegistrySource + RegistrySink> Registry for T {}

/// Wall clock used for the write gate and pass timestamps
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
