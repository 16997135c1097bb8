//! Core types for sync passes

use crate::diff::{Action, ActionKind, ActionSummary};
use crate::layout::SheetLayout;
use crate::member::RosterMember;
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default quiet period before writes are allowed, in seconds
pub const DEFAULT_QUIET_PERIOD_SECS: i64 = 600;

/// Default number of concurrent registry writes
pub const DEFAULT_JOBS: usize = 4;

/// Phase of a pass, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassPhase {
    Idle,
    Pulling,
    Resolving,
    WriteGateCheck,
    Writing,
    SkippingWrite,
}

impl fmt::Display for PassPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Pulling => "pulling",
            Self::Resolving => "resolving",
            Self::WriteGateCheck => "write gate check",
            Self::Writing => "writing",
            Self::SkippingWrite => "skipping write",
        })
    }
}

/// Options for the orchestrator
#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Number of concurrent registry writes
    pub jobs: usize,
    /// Time the sheet must stay unchanged before writes are allowed
    pub quiet_period: TimeDelta,
    /// Where things live in the sheet
    pub layout: SheetLayout,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            quiet_period: TimeDelta::seconds(DEFAULT_QUIET_PERIOD_SECS),
            layout: SheetLayout::default(),
        }
    }
}

/// A registry write that did not succeed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteFailure {
    pub kind: ActionKind,
    /// Display form of the member the write was for
    pub member: String,
    pub error: String,
}

impl fmt::Display for WriteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}: {}", self.kind, self.member, self.error)
    }
}

/// Outcome of the write phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WriteReport {
    pub renamed: usize,
    pub absences_set: usize,
    pub created: usize,
    pub failures: Vec<WriteFailure>,
}

impl WriteReport {
    /// Count a successful write
    pub fn add_success(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::CreateMember => self.created += 1,
            ActionKind::ChangeName => self.renamed += 1,
            ActionKind::ChangeAbsence => self.absences_set += 1,
        }
    }

    /// Record a failed write
    pub fn add_failure(&mut self, kind: ActionKind, member: &RosterMember, error: &anyhow::Error) {
        self.failures.push(WriteFailure {
            kind,
            member: member.to_string(),
            error: format!("{error:#}"),
        });
    }

    /// Number of successful writes
    pub fn succeeded(&self) -> usize {
        self.renamed + self.absences_set + self.created
    }

    /// Check if every write succeeded
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Wall-clock durations of the stages of a pass, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassTimings {
    pub fetch_ms: u64,
    pub resolve_ms: u64,
    pub write_ms: u64,
}

impl PassTimings {
    pub fn total_ms(&self) -> u64 {
        self.fetch_ms + self.resolve_ms + self.write_ms
    }
}

impl fmt::Display for PassTimings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}ms ({}ms data fetch, {}ms diff resolve, {}ms registry sync)",
            self.total_ms(),
            self.fetch_ms,
            self.resolve_ms,
            self.write_ms
        )
    }
}

/// Everything one pass decided and did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PassReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub timings: PassTimings,
    /// Planned actions, counted before the write gate
    pub summary: ActionSummary,
    /// Renames and absence changes the pass computed
    pub actions: Vec<Action>,
    /// Members the pass wanted to create
    pub new_members: Vec<RosterMember>,
    pub stale_members: usize,
    pub skipped_rows: Vec<usize>,
    pub report_to_change: Option<String>,
    /// Whether the sheet content changed since the previous pass
    ///
    /// Always set on an orchestrator's first pass.
    pub sheet_changed: bool,
    pub gate_open: bool,
    /// Seconds left until the gate opens on its own, when it was closed by time
    pub gate_remaining_secs: Option<i64>,
    /// Outcome of the write phase; `None` when the gate was closed
    pub writes: Option<WriteReport>,
}

impl PassReport {
    /// Check if the pass had nothing to do
    pub fn is_noop(&self) -> bool {
        !self.summary.has_changes() && self.report_to_change.is_none()
    }

    /// Check if every attempted write succeeded
    pub fn is_success(&self) -> bool {
        self.writes.as_ref().is_none_or(WriteReport::is_success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::absence::AbsenceStatus;
    use crate::member::MemberName;

    #[test]
    fn test_write_report_counts() {
        let member = RosterMember::new(
            Some("x".into()),
            2,
            MemberName::new("ms", "Jane", "Doe"),
            AbsenceStatus::Present,
        );
        let mut report = WriteReport::default();
        report.add_success(ActionKind::ChangeName);
        report.add_success(ActionKind::CreateMember);
        report.add_failure(
            ActionKind::ChangeAbsence,
            &member,
            &anyhow::anyhow!("registry said no"),
        );

        assert_eq!(report.succeeded(), 2);
        assert!(!report.is_success());
        assert_eq!(
            report.failures[0].to_string(),
            "change absence for Ms. Doe (x): registry said no"
        );
    }

    #[test]
    fn test_timings_display() {
        let timings = PassTimings {
            fetch_ms: 120,
            resolve_ms: 3,
            write_ms: 40,
        };
        assert_eq!(
            timings.to_string(),
            "163ms (120ms data fetch, 3ms diff resolve, 40ms registry sync)"
        );
    }

    #[test]
    fn test_default_options() {
        let opts = SyncOptions::default();
        assert_eq!(opts.jobs, 4);
        assert_eq!(opts.quiet_period.num_seconds(), 600);
    }
}
