//! Sync orchestration
//!
//! [`Orchestrator`] owns the roster and runs one pass at a time:
//! pull both snapshots, revert tracked members to the registry's record,
//! resolve the sheet against the roster, then write if the gate is open.
//!
//! All pass state sits behind one mutex held for the whole pass, so
//! concurrent callers queue, and [`Orchestrator::summary`] never sees a
//! roster mid-pass.

use crate::context::{Clock, Registry, RegistrySink, SheetSource, SystemClock};
use crate::diff::ActionSummary;
use crate::error::{Error, Result};
use crate::executor::apply_writes;
use crate::member::{RegistryMember, RosterMember};
use crate::resolver::{PassInput, Roster, resolve};
use crate::types::{PassPhase, PassReport, PassTimings, SyncOptions};
use chrono::{DateTime, TimeDelta, Utc};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Whether a pass may write, and why
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteGate {
    /// Caller asked for writes regardless of sheet activity
    Forced,
    /// Sheet has been quiet for longer than the quiet period
    Quiet,
    /// Sheet changed recently; writes resume after `remaining`
    Recent { remaining: TimeDelta },
    /// Caller asked for no writes at all
    Dry,
}

impl WriteGate {
    /// Decide the gate for a pass
    ///
    /// `force` of `Some(true)` opens it and `Some(false)` keeps it closed.
    /// With `None` it opens once more than `quiet_period` has passed since
    /// the sheet last changed. A sheet never observed counts as just changed.
    pub fn decide(
        force: Option<bool>,
        last_sheet_change: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        quiet_period: TimeDelta,
    ) -> Self {
        match (force, last_sheet_change) {
            (Some(true), _) => Self::Forced,
            (Some(false), _) => Self::Dry,
            (None, None) => Self::Recent {
                remaining: quiet_period,
            },
            (None, Some(changed)) => {
                let elapsed = now - changed;
                if elapsed > quiet_period {
                    Self::Quiet
                } else {
                    Self::Recent {
                        remaining: quiet_period - elapsed,
                    }
                }
            }
        }
    }

    pub fn is_open(self) -> bool {
        matches!(self, Self::Forced | Self::Quiet)
    }
}

#[derive(Debug, Default)]
struct SyncState {
    roster: Roster,
    fingerprint: Option<blake3::Hash>,
    last_sheet_change: Option<DateTime<Utc>>,
    last_sync: Option<DateTime<Utc>>,
}

/// Runs sync passes between a sheet and the registry
pub struct Orchestrator {
    sheet: Arc<dyn SheetSource>,
    registry: Arc<dyn Registry>,
    clock: Arc<dyn Clock>,
    options: SyncOptions,
    state: Mutex<SyncState>,
}

impl Orchestrator {
    pub fn new(
        sheet: impl SheetSource + 'static,
        registry: impl Registry + 'static,
        options: SyncOptions,
    ) -> Self {
        Self {
            sheet: Arc::new(sheet),
            registry: Arc::new(registry),
            clock: Arc::new(SystemClock),
            options,
            state: Mutex::new(SyncState::default()),
        }
    }

    /// Replace the clock used for timestamps and the write gate
    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    fn lock(&self) -> MutexGuard<'_, SyncState> {
        // A panicking pass never swaps in a half-built roster
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run one pass
    ///
    /// Blocks until any in-flight pass finishes. A pass that fails before
    /// writing leaves the roster and timestamps as they were.
    pub fn sync(&self, force: Option<bool>) -> Result<PassReport> {
        let mut state = self.lock();
        let started_at = self.clock.now();
        log::info!("Starting sync pass");

        // Pull
        enter(PassPhase::Pulling);
        let fetch_start = Instant::now();
        match self.registry.sheet_id() {
            Ok(Some(sheet_id)) => self.sheet.retarget(&sheet_id),
            Ok(None) => {}
            Err(e) => return Err(Error::RegistryPull(e)),
        }
        let (rows, (members, report_to)) = rayon::join(
            || self.sheet.fetch_rows(),
            || rayon::join(|| self.registry.list_members(), || self.registry.report_to()),
        );
        let rows = rows.map_err(Error::SheetPull)?;
        let members = members.map_err(Error::RegistryPull)?;
        let report_to = report_to.map_err(Error::RegistryPull)?;
        let fetch_ms = millis(fetch_start);
        log::debug!("Pulled {} rows and {} registry members", rows.len(), members.len());

        // Resolve against a copy so a failed pass leaves the roster alone
        enter(PassPhase::Resolving);
        let resolve_start = Instant::now();
        let mut roster = state.roster.clone();
        revert_to_registry(&mut roster, &members);

        let sink: Option<&dyn RegistrySink> = match force {
            Some(false) => None,
            _ => Some(self.registry.as_ref()),
        };
        let input = PassInput {
            rows: &rows,
            registry_members: &members,
            registry_report_to: &report_to,
        };
        let resolution = resolve(&self.options.layout, input, &mut roster, sink)?;
        let resolve_ms = millis(resolve_start);

        let hash = fingerprint(&rows);
        // The first observation counts as a change: the sheet may be mid-edit
        let sheet_changed = state.fingerprint != Some(hash);
        if sheet_changed {
            match state.fingerprint {
                Some(_) => log::info!("Sheet changed since the last pass"),
                None => log::info!("First look at the sheet; treating it as just changed"),
            }
            state.last_sheet_change = Some(self.clock.now());
        }
        state.fingerprint = Some(hash);
        state.roster = roster;

        // Gate
        enter(PassPhase::WriteGateCheck);
        let gate = WriteGate::decide(
            force,
            state.last_sheet_change,
            self.clock.now(),
            self.options.quiet_period,
        );
        let summary = ActionSummary::from_actions(&resolution.actions, resolution.new_members.len());

        let write_start = Instant::now();
        let writes = if gate.is_open() {
            enter(PassPhase::Writing);
            let outcome = apply_writes(
                &resolution.actions,
                resolution.new_members.clone(),
                self.registry.as_ref(),
                self.options.jobs,
            )?;
            for member in outcome.created {
                if let Some(id) = member.registry_id().map(str::to_string) {
                    state.roster.insert(id, member);
                }
            }
            Some(outcome.report)
        } else {
            enter(PassPhase::SkippingWrite);
            match gate {
                WriteGate::Recent { remaining } => log::info!(
                    "Not writing: sheet edited recently, next write in {}s",
                    remaining.num_seconds()
                ),
                _ => log::info!("Not writing: dry run"),
            }
            None
        };
        let write_ms = millis(write_start);

        let finished_at = self.clock.now();
        state.last_sync = Some(finished_at);
        enter(PassPhase::Idle);

        let timings = PassTimings {
            fetch_ms,
            resolve_ms,
            write_ms,
        };
        log::info!("Sync complete in {timings}");

        Ok(PassReport {
            started_at,
            finished_at,
            timings,
            summary,
            actions: resolution.actions,
            new_members: resolution.new_members,
            stale_members: resolution.stale_members,
            skipped_rows: resolution.skipped_rows,
            report_to_change: resolution.report_to_change,
            sheet_changed,
            gate_open: gate.is_open(),
            gate_remaining_secs: match gate {
                WriteGate::Recent { remaining } => Some(remaining.num_seconds()),
                _ => None,
            },
            writes,
        })
    }

    /// One line per absent member, in sheet order
    ///
    /// Waits for any in-flight pass to finish.
    pub fn summary(&self) -> String {
        let state = self.lock();
        let mut absent: Vec<&RosterMember> = state
            .roster
            .values()
            .filter(|m| m.absence().is_absent_at_all())
            .collect();
        absent.sort_by_key(|m| m.home_row);

        let names: Vec<String> = absent.iter().map(|m| m.name().pretty_full()).collect();
        let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);

        let mut summary = String::new();
        for (name, member) in names.iter().zip(&absent) {
            let _ = writeln!(summary, "{name:<width$} - {}", member.absence());
        }
        summary
    }

    /// When the last successful pass finished
    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.lock().last_sync
    }

    /// Snapshot of the roster, in sheet order
    pub fn roster(&self) -> Vec<RosterMember> {
        let state = self.lock();
        let mut members: Vec<RosterMember> = state.roster.values().cloned().collect();
        members.sort_by_key(|m| m.home_row);
        members
    }
}

fn enter(phase: PassPhase) {
    log::debug!("Sync phase: {phase}");
}

fn millis(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Reset every tracked member to the registry's current record
fn revert_to_registry(roster: &mut Roster, members: &[RegistryMember]) {
    let records: HashMap<&str, &RegistryMember> =
        members.iter().map(|m| (m.id.as_str(), m)).collect();
    for (id, member) in roster.iter_mut() {
        match records.get(id.as_str()) {
            Some(record) => member.revert_to_registry(record),
            None => log::debug!("{member} is no longer in the registry"),
        }
    }
}

/// Content hash of a grid
fn fingerprint(rows: &[Vec<String>]) -> blake3::Hash {
    let mut hasher = blake3::Hasher::new();
    for row in rows {
        hasher.update(&row.len().to_le_bytes());
        for cell in row {
            hasher.update(&cell.len().to_le_bytes());
            hasher.update(cell.as_bytes());
        }
    }
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absence::{AbsenceStatus, Period};
    use crate::error::ErrorCategory;
    use crate::layout::SheetLayout;
    use crate::mock::{ManualClock, MockRegistry, MockSheet, RegistryCall};
    use std::thread;
    use std::time::Duration;

    fn rows(people: &[(&str, &str, &str)]) -> Vec<Vec<String>> {
        let mut rows = vec![vec!["Honorific".to_string()], Vec::new()];
        for (honorific, first, last) in people {
            let mut row = vec![String::new(); 24];
            row[0] = (*honorific).into();
            row[1] = (*first).into();
            row[2] = (*last).into();
            rows.push(row);
        }
        rows
    }

    fn setup(
        people: &[(&str, &str, &str)],
    ) -> (Orchestrator, MockSheet, MockRegistry, ManualClock) {
        let sheet = MockSheet::new(rows(people));
        let registry = MockRegistry::new();
        let clock = ManualClock::default();
        let orchestrator = Orchestrator::new(sheet.clone(), registry.clone(), SyncOptions::default())
            .with_clock(clock.clone());
        (orchestrator, sheet, registry, clock)
    }

    fn absence_writes(registry: &MockRegistry) -> Vec<RegistryCall> {
        registry
            .calls()
            .into_iter()
            .filter(|call| matches!(call, RegistryCall::SetAbsence(..)))
            .collect()
    }

    #[test]
    fn test_gate_decision() {
        let now = Utc::now();
        let quiet = TimeDelta::minutes(10);
        assert_eq!(
            WriteGate::decide(None, None, now, quiet),
            WriteGate::Recent { remaining: quiet }
        );
        assert_eq!(
            WriteGate::decide(Some(true), Some(now), now, quiet),
            WriteGate::Forced
        );
        assert_eq!(WriteGate::decide(Some(false), None, now, quiet), WriteGate::Dry);
        assert_eq!(
            WriteGate::decide(None, Some(now - TimeDelta::minutes(4)), now, quiet),
            WriteGate::Recent {
                remaining: TimeDelta::minutes(6)
            }
        );
        // Exactly the quiet period is not enough
        assert!(!WriteGate::decide(None, Some(now - quiet), now, quiet).is_open());
        assert!(WriteGate::decide(None, Some(now - TimeDelta::minutes(11)), now, quiet).is_open());
    }

    #[test]
    fn test_fingerprint_sensitive_to_cell_boundaries() {
        let a = vec![vec!["ab".to_string(), "c".to_string()]];
        let b = vec![vec!["a".to_string(), "bc".to_string()]];
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_eq!(fingerprint(&a), fingerprint(&a.clone()));
    }

    #[test]
    fn test_scenario_d_writes_wait_for_quiet_sheet() {
        let (orchestrator, sheet, registry, clock) = setup(&[("ms", "Jane", "Doe")]);
        registry.add_member("a", "ms", "Jane", "Doe");

        // First pass adopts the registry member and holds the gate
        let report = orchestrator.sync(None).unwrap();
        assert!(!report.gate_open);
        assert!(report.sheet_changed);
        assert_eq!(report.gate_remaining_secs, Some(600));
        assert!(report.actions.is_empty());

        let layout = SheetLayout::default();
        sheet.set_cell(2, layout.period_column(Period::P3), "TRUE");
        clock.advance(TimeDelta::minutes(1));
        let report = orchestrator.sync(None).unwrap();
        assert!(report.sheet_changed);
        assert!(!report.gate_open);
        assert_eq!(report.gate_remaining_secs, Some(600));
        assert_eq!(report.summary.absence_changes, 1);
        assert!(report.writes.is_none());
        assert!(absence_writes(&registry).is_empty());

        clock.advance(TimeDelta::minutes(5));
        let report = orchestrator.sync(None).unwrap();
        assert!(!report.sheet_changed);
        assert!(!report.gate_open);
        assert_eq!(report.gate_remaining_secs, Some(300));
        assert!(absence_writes(&registry).is_empty());

        clock.advance(TimeDelta::minutes(6));
        let report = orchestrator.sync(None).unwrap();
        assert!(report.gate_open);
        assert_eq!(report.writes.as_ref().map(|w| w.absences_set), Some(1));
        assert_eq!(
            absence_writes(&registry),
            vec![RegistryCall::SetAbsence(
                "a".into(),
                AbsenceStatus::partial([Period::P3])
            )]
        );

        // Registry now agrees, so the next pass has nothing to write
        clock.advance(TimeDelta::minutes(1));
        let report = orchestrator.sync(None).unwrap();
        assert!(report.actions.is_empty());
    }

    #[test]
    fn test_fresh_orchestrator_holds_writes() {
        let (orchestrator, sheet, registry, clock) =
            setup(&[("ms", "Jane", "Doe"), ("mr", "New", "Guy")]);
        registry.add_member("a", "ms", "Jane", "Doe");
        sheet.set_cell(2, SheetLayout::default().period_column(Period::P3), "TRUE");

        let report = orchestrator.sync(None).unwrap();
        assert!(report.sheet_changed);
        assert!(!report.gate_open);
        assert_eq!(report.summary.absence_changes, 1);
        assert_eq!(report.summary.creations, 1);
        assert!(report.writes.is_none());
        assert!(registry.calls().is_empty());

        // A sheet left alone past the quiet period gets written
        clock.advance(TimeDelta::minutes(11));
        let report = orchestrator.sync(None).unwrap();
        assert!(!report.sheet_changed);
        assert!(report.gate_open);
        assert_eq!(
            absence_writes(&registry),
            vec![RegistryCall::SetAbsence(
                "a".into(),
                AbsenceStatus::partial([Period::P3])
            )]
        );
        assert_eq!(registry.members().len(), 2);
    }

    #[test]
    fn test_force_overrides_gate() {
        let (orchestrator, sheet, registry, clock) = setup(&[("ms", "Jane", "Doe")]);
        registry.add_member("a", "ms", "Jane", "Doe");
        orchestrator.sync(None).unwrap();

        sheet.set_cell(2, SheetLayout::default().full_day, "TRUE");
        clock.advance(TimeDelta::seconds(10));

        let report = orchestrator.sync(Some(false)).unwrap();
        assert!(!report.gate_open);
        assert!(absence_writes(&registry).is_empty());

        let report = orchestrator.sync(Some(true)).unwrap();
        assert!(report.gate_open);
        assert!(registry.member("a").unwrap().fully_absent);
    }

    #[test]
    fn test_dry_run_does_not_push_report_to() {
        let (orchestrator, sheet, registry, _clock) = setup(&[("ms", "Jane", "Doe")]);
        sheet.set_cell(2, SheetLayout::default().report_to_col, "Room 9");

        let report = orchestrator.sync(Some(false)).unwrap();
        assert_eq!(report.report_to_change.as_deref(), Some("Room 9"));
        assert!(registry.calls().is_empty());

        orchestrator.sync(None).unwrap();
        assert!(registry.calls().contains(&RegistryCall::SetReportTo("Room 9".into())));
    }

    #[test]
    fn test_new_members_created_and_tracked() {
        let (orchestrator, sheet, registry, clock) =
            setup(&[("mr", "New", "Guy"), ("ms", "Also", "New")]);
        sheet.set_cell(2, SheetLayout::default().full_day, "TRUE");

        let report = orchestrator.sync(None).unwrap();
        assert!(report.writes.is_none());
        assert!(orchestrator.roster().is_empty());

        clock.advance(TimeDelta::minutes(11));
        let report = orchestrator.sync(None).unwrap();
        assert_eq!(report.summary.creations, 2);
        let writes = report.writes.unwrap();
        assert_eq!(writes.created, 2);
        assert_eq!(writes.absences_set, 1);
        assert_eq!(registry.members().len(), 2);

        let roster = orchestrator.roster();
        assert_eq!(roster.len(), 2);
        assert!(roster.iter().all(|m| m.registry_id().is_some()));

        // Second pass finds them anchored and does nothing
        let report = orchestrator.sync(None).unwrap();
        assert!(report.is_noop());
        assert_eq!(registry.members().len(), 2);
    }

    #[test]
    fn test_failed_creation_retried_next_pass() {
        let (orchestrator, _sheet, registry, _clock) = setup(&[("mr", "New", "Guy")]);
        registry.fail_writes_for("Guy");

        let report = orchestrator.sync(Some(true)).unwrap();
        assert!(!report.is_success());
        assert!(orchestrator.roster().is_empty());

        registry.clear_failures();
        let report = orchestrator.sync(Some(true)).unwrap();
        assert!(report.is_success());
        assert_eq!(orchestrator.roster().len(), 1);
    }

    #[test]
    fn test_sheet_wins_over_registry_absence_edits() {
        let (orchestrator, _sheet, registry, clock) = setup(&[("ms", "Jane", "Doe")]);
        registry.add_member("a", "ms", "Jane", "Doe");
        orchestrator.sync(None).unwrap();

        // Someone marks her absent directly in the registry; the sheet still
        // says present, so the sheet wins on the next pass
        let mut out = orchestrator.roster()[0].clone();
        out.revert_to_registry(&RegistryMember {
            id: "a".into(),
            honorific: "ms".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            absent_periods: vec!["Period 1".into()],
            fully_absent: false,
        });
        registry.set_absence(&out).unwrap();
        registry.clear_calls();

        clock.advance(TimeDelta::minutes(11));
        let report = orchestrator.sync(None).unwrap();
        assert_eq!(report.summary.absence_changes, 1);
        assert_eq!(
            absence_writes(&registry),
            vec![RegistryCall::SetAbsence("a".into(), AbsenceStatus::Present)]
        );
    }

    #[test]
    fn test_failed_pull_leaves_state_untouched() {
        let (orchestrator, _sheet, registry, clock) = setup(&[("ms", "Jane", "Doe")]);
        registry.add_member("a", "ms", "Jane", "Doe");
        orchestrator.sync(None).unwrap();
        let before = orchestrator.last_sync();
        let roster = orchestrator.roster();

        registry.fail_pulls("registry unreachable");
        clock.advance(TimeDelta::minutes(1));
        let err = orchestrator.sync(None).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Pull);
        assert_eq!(orchestrator.last_sync(), before);
        assert_eq!(orchestrator.roster(), roster);
    }

    #[test]
    fn test_sheet_failure_is_sheet_pull() {
        let (orchestrator, sheet, _registry, _clock) = setup(&[]);
        sheet.fail_with("quota exceeded");
        assert!(matches!(orchestrator.sync(None), Err(Error::SheetPull(_))));
        assert!(orchestrator.last_sync().is_none());
    }

    #[test]
    fn test_retargets_sheet_from_registry() {
        let (orchestrator, sheet, registry, _clock) = setup(&[]);
        registry.set_sheet_id(Some("sheet-2"));
        orchestrator.sync(None).unwrap();
        assert_eq!(sheet.target().as_deref(), Some("sheet-2"));
    }

    #[test]
    fn test_summary_lists_absent_members_in_sheet_order() {
        let (orchestrator, sheet, _registry, _clock) =
            setup(&[("ms", "Jane", "Doe"), ("mr", "Al", "Present"), ("dr", "Al", "Bo")]);
        let layout = SheetLayout::default();
        sheet.set_cell(2, layout.period_column(Period::P3), "TRUE");
        sheet.set_cell(2, layout.period_column(Period::Igs), "TRUE");
        sheet.set_cell(4, layout.full_day, "TRUE");

        orchestrator.sync(Some(true)).unwrap();
        assert_eq!(
            orchestrator.summary(),
            "Ms. Jane Doe - out IGS, P3\nDr. Al Bo    - out ALL DAY\n"
        );
    }

    #[test]
    fn test_summary_pads_by_characters() {
        let (orchestrator, sheet, _registry, _clock) =
            setup(&[("ms", "Zoë", "Doe"), ("dr", "Al", "Bo")]);
        let layout = SheetLayout::default();
        sheet.set_cell(2, layout.full_day, "TRUE");
        sheet.set_cell(3, layout.full_day, "TRUE");

        orchestrator.sync(Some(true)).unwrap();
        assert_eq!(
            orchestrator.summary(),
            "Ms. Zoë Doe - out ALL DAY\nDr. Al Bo   - out ALL DAY\n"
        );
    }

    #[test]
    fn test_passes_never_overlap() {
        let (orchestrator, _sheet, registry, _clock) = setup(&[("ms", "Jane", "Doe")]);
        registry.set_list_delay(Duration::from_millis(50));
        let orchestrator = Arc::new(orchestrator);

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let orchestrator = Arc::clone(&orchestrator);
                thread::spawn(move || orchestrator.sync(Some(true)).map(|_| ()))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(registry.pull_count(), 3);
        assert_eq!(registry.max_concurrent_pulls(), 1);
        assert_eq!(orchestrator.roster().len(), 1);
        assert_eq!(registry.members().len(), 1);
    }
}
