//! Diff computation between member states
//!
//! Pure functions: the same inputs always yield the same actions.

use crate::absence::AbsenceStatus;
use crate::member::{MemberName, RosterMember};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of registry mutation a pass needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Member does not exist in the registry yet
    CreateMember,
    /// Honorific, first or last name changed
    ChangeName,
    /// Absence status changed
    ChangeAbsence,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CreateMember => "create member",
            Self::ChangeName => "change name",
            Self::ChangeAbsence => "change absence",
        })
    }
}

/// A mutation to apply, with a snapshot of the member it applies to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub kind: ActionKind,
    pub member: RosterMember,
}

impl Action {
    pub fn new(kind: ActionKind, member: RosterMember) -> Self {
        Self { kind, member }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} for {}", self.kind, self.member)
    }
}

/// Actions needed to move from one absence status to another
pub fn diff_absence(prev: &AbsenceStatus, curr: &AbsenceStatus) -> Vec<ActionKind> {
    let changed = match (prev, curr) {
        (AbsenceStatus::Present, AbsenceStatus::Present)
        | (AbsenceStatus::FullDay, AbsenceStatus::FullDay) => false,
        (AbsenceStatus::PartialDay(before), AbsenceStatus::PartialDay(after)) => {
            !(before.is_subset(after) && after.is_subset(before))
        }
        _ => true,
    };

    if changed {
        vec![ActionKind::ChangeAbsence]
    } else {
        Vec::new()
    }
}

/// Action needed to move from one name to another, if any
pub fn diff_name(prev: &MemberName, curr: &MemberName) -> Option<ActionKind> {
    let prev = MemberName::new(&prev.honorific, &prev.first, &prev.last);
    let curr = MemberName::new(&curr.honorific, &curr.first, &curr.last);
    (prev != curr).then_some(ActionKind::ChangeName)
}

/// Counts of planned actions by kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub creations: usize,
    pub renames: usize,
    pub absence_changes: usize,
}

impl ActionSummary {
    /// Count a list of actions plus pending creations
    pub fn from_actions(actions: &[Action], new_members: usize) -> Self {
        let mut summary = Self {
            creations: new_members,
            ..Self::default()
        };
        for action in actions {
            match action.kind {
                ActionKind::CreateMember => summary.creations += 1,
                ActionKind::ChangeName => summary.renames += 1,
                ActionKind::ChangeAbsence => summary.absence_changes += 1,
            }
        }
        summary
    }

    /// Total number of writes
    pub fn total(&self) -> usize {
        self.creations + self.renames + self.absence_changes
    }

    /// Check if there is anything to write
    pub fn has_changes(&self) -> bool {
        self.total() > 0
    }
}
