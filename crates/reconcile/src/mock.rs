//! In-memory collaborators for testing without network access.
//!
//! [`MockSheet`] serves a fixed grid; [`MockRegistry`] keeps a member list,
//! applies writes to it and records every call it receives. Both are cheap
//! to clone and share their state between clones.
//!
//! ```
//! use reconcile::mock::{MockRegistry, RegistryCall};
//! use reconcile::RegistrySink;
//!
//! let registry = MockRegistry::new();
//! registry.set_report_to("Room 12").unwrap();
//! assert_eq!(registry.calls(), vec![RegistryCall::SetReportTo("Room 12".into())]);
//! ```

use crate::absence::AbsenceStatus;
use crate::context::{Clock, RegistrySink, RegistrySource, SheetSource};
use crate::member::{MemberName, RegistryMember, RosterMember};
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Sheet
// ============================================================================

/// Sheet source backed by an in-memory grid
#[derive(Debug, Clone, Default)]
pub struct MockSheet {
    rows: Arc<Mutex<Vec<Vec<String>>>>,
    failure: Arc<Mutex<Option<String>>>,
    target: Arc<Mutex<Option<String>>>,
    fetches: Arc<AtomicUsize>,
}

impl MockSheet {
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        let sheet = Self::default();
        sheet.set_rows(rows);
        sheet
    }

    /// Replace the grid
    pub fn set_rows(&self, rows: Vec<Vec<String>>) {
        *self.rows.lock().unwrap() = rows;
    }

    /// Set one cell, growing the grid as needed
    pub fn set_cell(&self, row: usize, col: usize, value: impl Into<String>) {
        let mut rows = self.rows.lock().unwrap();
        if rows.len() <= row {
            rows.resize(row + 1, Vec::new());
        }
        if rows[row].len() <= col {
            rows[row].resize(col + 1, String::new());
        }
        rows[row][col] = value.into();
    }

    /// Make every fetch fail with `message`
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock().unwrap() = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *self.failure.lock().unwrap() = None;
    }

    /// Sheet id the source was last pointed at
    pub fn target(&self) -> Option<String> {
        self.target.lock().unwrap().clone()
    }

    /// Number of fetches served so far
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

impl SheetSource for MockSheet {
    fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if let Some(message) = self.failure.lock().unwrap().as_ref() {
            bail!("{message}");
        }
        Ok(self.rows.lock().unwrap().clone())
    }

    fn retarget(&self, sheet_id: &str) {
        *self.target.lock().unwrap() = Some(sheet_id.to_string());
    }
}

// ============================================================================
// Registry
// ============================================================================

/// A write the mock registry received
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryCall {
    Create(MemberName),
    Rename(String, MemberName),
    SetAbsence(String, AbsenceStatus),
    SetReportTo(String),
}

#[derive(Debug, Default)]
struct RegistryState {
    members: Vec<RegistryMember>,
    report_to: String,
    sheet_id: Option<String>,
    calls: Vec<RegistryCall>,
    failing_writes: HashSet<String>,
    failing_absence: HashSet<String>,
    pull_failure: Option<String>,
    list_delay: Option<Duration>,
    next_id: usize,
}

/// Registry backed by an in-memory member list
#[derive(Debug, Clone, Default)]
pub struct MockRegistry {
    state: Arc<Mutex<RegistryState>>,
    pulls: Arc<AtomicUsize>,
    active_pulls: Arc<AtomicUsize>,
    max_active_pulls: Arc<AtomicUsize>,
}

impl MockRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry that already knows `members`
    #[must_use]
    pub fn with_members(members: Vec<RegistryMember>) -> Self {
        let registry = Self::new();
        registry.state.lock().unwrap().members = members;
        registry
    }

    /// Add one member with no absence
    pub fn add_member(&self, id: &str, honorific: &str, first: &str, last: &str) {
        self.state.lock().unwrap().members.push(RegistryMember {
            id: id.to_string(),
            honorific: honorific.to_string(),
            first_name: first.to_string(),
            last_name: last.to_string(),
            absent_periods: Vec::new(),
            fully_absent: false,
        });
    }

    /// Change the stored report-to without recording a call
    pub fn set_stored_report_to(&self, value: impl Into<String>) {
        self.state.lock().unwrap().report_to = value.into();
    }

    pub fn set_sheet_id(&self, sheet_id: Option<&str>) {
        self.state.lock().unwrap().sheet_id = sheet_id.map(str::to_string);
    }

    /// Make every write for members with this last name fail
    pub fn fail_writes_for(&self, last_name: &str) {
        self.state.lock().unwrap().failing_writes.insert(last_name.to_string());
    }

    /// Make only absence writes for members with this last name fail
    pub fn fail_absence_for(&self, last_name: &str) {
        self.state.lock().unwrap().failing_absence.insert(last_name.to_string());
    }

    /// Make every pull fail with `message`
    pub fn fail_pulls(&self, message: impl Into<String>) {
        self.state.lock().unwrap().pull_failure = Some(message.into());
    }

    pub fn clear_failures(&self) {
        let mut state = self.state.lock().unwrap();
        state.pull_failure = None;
        state.failing_writes.clear();
        state.failing_absence.clear();
    }

    /// Sleep this long inside every member list pull
    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = Some(delay);
    }

    /// Every write received so far, in order
    pub fn calls(&self) -> Vec<RegistryCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Current member list
    pub fn members(&self) -> Vec<RegistryMember> {
        self.state.lock().unwrap().members.clone()
    }

    pub fn member(&self, id: &str) -> Option<RegistryMember> {
        self.state
            .lock()
            .unwrap()
            .members
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    /// Number of member list pulls served
    pub fn pull_count(&self) -> usize {
        self.pulls.load(Ordering::SeqCst)
    }

    /// Highest number of member list pulls that were in flight at once
    pub fn max_concurrent_pulls(&self) -> usize {
        self.max_active_pulls.load(Ordering::SeqCst)
    }

    fn record(&self, call: RegistryCall, last_name: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.clone());
        if let Some(last) = last_name
            && (state.failing_writes.contains(last)
                || (matches!(call, RegistryCall::SetAbsence(..))
                    && state.failing_absence.contains(last)))
        {
            bail!("mock registry rejected write for {last}");
        }
        Ok(())
    }
}

impl RegistrySource for MockRegistry {
    fn list_members(&self) -> Result<Vec<RegistryMember>> {
        let (delay, failure) = {
            let state = self.state.lock().unwrap();
            (state.list_delay, state.pull_failure.clone())
        };

        self.pulls.fetch_add(1, Ordering::SeqCst);
        let active = self.active_pulls.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active_pulls.fetch_max(active, Ordering::SeqCst);
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.active_pulls.fetch_sub(1, Ordering::SeqCst);

        if let Some(message) = failure {
            bail!("{message}");
        }
        Ok(self.members())
    }

    fn report_to(&self) -> Result<String> {
        let state = self.state.lock().unwrap();
        if let Some(message) = &state.pull_failure {
            bail!("{message}");
        }
        Ok(state.report_to.clone())
    }

    fn sheet_id(&self) -> Result<Option<String>> {
        Ok(self.state.lock().unwrap().sheet_id.clone())
    }
}

impl RegistrySink for MockRegistry {
    fn create_member(&self, member: &RosterMember) -> Result<String> {
        self.record(RegistryCall::Create(member.name().clone()), Some(member.last_name()))?;

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = format!("new-{}", state.next_id);
        state.members.push(RegistryMember {
            id: id.clone(),
            honorific: member.honorific().to_string(),
            first_name: member.first_name().to_string(),
            last_name: member.last_name().to_string(),
            absent_periods: Vec::new(),
            fully_absent: false,
        });
        Ok(id)
    }

    fn rename_member(&self, member: &RosterMember) -> Result<()> {
        let id = member
            .registry_id()
            .ok_or_else(|| anyhow!("cannot rename unregistered member {member}"))?;
        self.record(
            RegistryCall::Rename(id.to_string(), member.name().clone()),
            Some(member.last_name()),
        )?;

        let mut state = self.state.lock().unwrap();
        let record = state
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| anyhow!("no member with id {id}"))?;
        record.honorific = member.honorific().to_string();
        record.first_name = member.first_name().to_string();
        record.last_name = member.last_name().to_string();
        Ok(())
    }

    fn set_absence(&self, member: &RosterMember) -> Result<()> {
        let id = member
            .registry_id()
            .ok_or_else(|| anyhow!("cannot set absence of unregistered member {member}"))?;
        self.record(
            RegistryCall::SetAbsence(id.to_string(), member.absence().clone()),
            Some(member.last_name()),
        )?;

        let mut state = self.state.lock().unwrap();
        let record = state
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| anyhow!("no member with id {id}"))?;
        let absence = member.absence();
        record.fully_absent = absence.is_fully_absent();
        record.absent_periods = absence
            .absent_periods()
            .into_iter()
            .map(|p| p.name().to_string())
            .collect();
        Ok(())
    }

    fn set_report_to(&self, report_to: &str) -> Result<()> {
        self.record(RegistryCall::SetReportTo(report_to.to_string()), None)?;
        self.state.lock().unwrap().report_to = report_to.to_string();
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        let start = Utc.with_ymd_and_hms(2024, 9, 2, 7, 30, 0).single().unwrap_or_default();
        Self::starting_at(start)
    }
}

impl ManualClock {
    #[must_use]
    pub fn starting_at(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn advance(&self, by: TimeDelta) {
        *self.now.lock().unwrap() += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absence::Period;

    #[test]
    fn test_mock_sheet_failure_and_target() {
        let sheet = MockSheet::new(vec![vec!["a".into()]]);
        assert_eq!(sheet.fetch_rows().unwrap().len(), 1);

        sheet.fail_with("offline");
        assert!(sheet.fetch_rows().is_err());
        sheet.clear_failure();
        assert!(sheet.fetch_rows().is_ok());
        assert_eq!(sheet.fetch_count(), 3);

        sheet.retarget("sheet-2");
        assert_eq!(sheet.target().as_deref(), Some("sheet-2"));
    }

    #[test]
    fn test_mock_sheet_set_cell_grows() {
        let sheet = MockSheet::default();
        sheet.set_cell(3, 2, "Doe");
        let rows = sheet.fetch_rows().unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[3][2], "Doe");
    }

    #[test]
    fn test_mock_registry_applies_writes() {
        let registry = MockRegistry::new();
        let mut member = RosterMember::new(
            None,
            2,
            MemberName::new("ms", "Jane", "Doe"),
            AbsenceStatus::partial([Period::P2]),
        );

        let id = registry.create_member(&member).unwrap();
        member.assign_registry_id(id.clone());
        registry.set_absence(&member).unwrap();

        let stored = registry.member(&id).unwrap();
        assert_eq!(stored.absent_periods, vec!["Period 2".to_string()]);
        assert_eq!(stored.absence(), AbsenceStatus::partial([Period::P2]));
        assert_eq!(registry.calls().len(), 2);
    }

    #[test]
    fn test_mock_registry_failures() {
        let registry = MockRegistry::new();
        registry.add_member("a", "mr", "Al", "Able");
        let member = RosterMember::new(
            Some("a".into()),
            2,
            MemberName::new("mr", "Al", "Able"),
            AbsenceStatus::FullDay,
        );

        registry.fail_absence_for("Able");
        assert!(registry.rename_member(&member).is_ok());
        assert!(registry.set_absence(&member).is_err());

        registry.fail_pulls("down");
        assert!(registry.list_members().is_err());
        assert!(registry.report_to().is_err());
        registry.clear_failures();
        assert!(registry.set_absence(&member).is_ok());
        assert!(registry.member("a").unwrap().fully_absent);
    }

    #[test]
    fn test_manual_clock_advances() {
        let clock = ManualClock::default();
        let start = clock.now();
        clock.advance(TimeDelta::minutes(5));
        assert_eq!(clock.now() - start, TimeDelta::minutes(5));
    }
}
