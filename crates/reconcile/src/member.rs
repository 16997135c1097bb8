//! Roster members and registry-side records

use crate::absence::AbsenceStatus;
use crate::diff::{ActionKind, diff_absence, diff_name};
use crate::layout::{SheetLayout, cell};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalize an honorific: trimmed, lower-cased, punctuation removed
pub fn normalize_honorific(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect::<String>()
        .to_lowercase()
}

/// Normalize a first or last name
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// A member's name, always held in normalized form
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberName {
    pub honorific: String,
    pub first: String,
    pub last: String,
}

impl MemberName {
    /// Build a name from raw parts, normalizing each
    pub fn new(honorific: &str, first: &str, last: &str) -> Self {
        Self {
            honorific: normalize_honorific(honorific),
            first: normalize_name(first),
            last: normalize_name(last),
        }
    }

    /// Read the three name cells of a sheet row
    pub fn from_row(row: &[String], layout: &SheetLayout) -> Self {
        Self::new(
            cell(row, layout.honorific),
            cell(row, layout.first_name),
            cell(row, layout.last_name),
        )
    }

    /// Honorific and last name are required to identify someone
    pub fn is_complete(&self) -> bool {
        !self.honorific.is_empty() && !self.last.is_empty()
    }

    /// Honorific with each word capitalized and a trailing period ("Ms.")
    pub fn pretty_honorific(&self) -> String {
        self.honorific
            .split_whitespace()
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// "Ms. Jane Doe"
    pub fn pretty_full(&self) -> String {
        [self.pretty_honorific(), self.first.clone(), self.last.clone()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// "Ms. Doe"
    pub fn formatted(&self) -> String {
        format!("{} {}", self.pretty_honorific(), self.last)
    }
}

impl fmt::Display for MemberName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pretty_full())
    }
}

/// A member as the registry reports it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryMember {
    pub id: String,
    pub honorific: String,
    pub first_name: String,
    pub last_name: String,
    /// Registry names of the periods the member is absent for
    #[serde(default)]
    pub absent_periods: Vec<String>,
    #[serde(default)]
    pub fully_absent: bool,
}

impl RegistryMember {
    /// Normalized name
    pub fn name(&self) -> MemberName {
        MemberName::new(&self.honorific, &self.first_name, &self.last_name)
    }

    /// Absence status as the registry sees it
    pub fn absence(&self) -> AbsenceStatus {
        AbsenceStatus::from_registry(&self.absent_periods, self.fully_absent)
    }
}

/// One tracked person
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterMember {
    registry_id: Option<String>,
    /// Sheet row this member was last matched to. A hint, revalidated by
    /// score on every pass.
    pub home_row: usize,
    name: MemberName,
    absence: AbsenceStatus,
}

impl RosterMember {
    /// Build an unidentified member from a sheet row
    ///
    /// Returns `None` when the honorific or last name is blank.
    pub fn from_row(row: &[String], row_index: usize, layout: &SheetLayout) -> Option<Self> {
        let name = MemberName::from_row(row, layout);
        if !name.is_complete() {
            return None;
        }

        Some(Self {
            registry_id: None,
            home_row: row_index,
            name,
            absence: AbsenceStatus::classify(row, layout),
        })
    }

    /// Build a member directly from its parts
    pub fn new(
        registry_id: Option<String>,
        home_row: usize,
        name: MemberName,
        absence: AbsenceStatus,
    ) -> Self {
        Self {
            registry_id,
            home_row,
            name,
            absence,
        }
    }

    pub fn registry_id(&self) -> Option<&str> {
        self.registry_id.as_deref()
    }

    pub fn name(&self) -> &MemberName {
        &self.name
    }

    pub fn honorific(&self) -> &str {
        &self.name.honorific
    }

    pub fn first_name(&self) -> &str {
        &self.name.first
    }

    pub fn last_name(&self) -> &str {
        &self.name.last
    }

    pub fn absence(&self) -> &AbsenceStatus {
        &self.absence
    }

    /// Record the id the registry assigned when creating this member
    pub fn assign_registry_id(&mut self, id: impl Into<String>) {
        self.registry_id = Some(id.into());
    }

    /// Overwrite name and absence with the registry's record
    pub fn revert_to_registry(&mut self, record: &RegistryMember) {
        self.name = record.name();
        self.absence = record.absence();
    }

    /// Take over a registry identity: its id, name and absence
    pub fn adopt(&mut self, record: &RegistryMember) {
        self.registry_id = Some(record.id.clone());
        self.revert_to_registry(record);
    }

    /// Apply a sheet row to this member, returning what changed
    ///
    /// The member's name and absence are replaced by the row's values.
    pub fn update(&mut self, row: &[String], layout: &SheetLayout) -> Vec<ActionKind> {
        let name = MemberName::from_row(row, layout);
        let absence = AbsenceStatus::classify(row, layout);

        let mut actions = Vec::new();
        if let Some(kind) = diff_name(&self.name, &name) {
            log::debug!("Name change for {}: now {}", self.name, name);
            actions.push(kind);
        }
        actions.extend(diff_absence(&self.absence, &absence));

        self.name = name;
        self.absence = absence;
        actions
    }
}

impl fmt::Display for RosterMember {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.registry_id {
            Some(id) => write!(f, "{} ({})", self.name.formatted(), id),
            None => write!(f, "{} (unregistered)", self.name.formatted()),
        }
    }
}
