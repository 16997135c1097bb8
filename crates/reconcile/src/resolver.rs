//! Per-pass reconciliation of sheet rows against the roster
//!
//! A pass runs four stages in a fixed order, each narrowing the pending row
//! and member sets the next one works on:
//!
//! 1. Easy updates: rows still matching the member anchored to them.
//! 2. Confusing updates: members whose anchor no longer matches pick the
//!    best remaining pending row.
//! 3. Report-to: the sheet's report-to cell is pushed to the registry.
//! 4. New/match: leftover rows are matched against registry-only members
//!    by exact name, or become new members.

use crate::context::RegistrySink;
use crate::diff::{Action, ActionKind};
use crate::error::{Error, Result};
use crate::layout::SheetLayout;
use crate::matcher::{matches_lax, rank_rows};
use crate::member::{MemberName, RegistryMember, RosterMember};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Roster map keyed by registry id
pub type Roster = BTreeMap<String, RosterMember>;

/// Read-only snapshots a pass works from
#[derive(Debug, Clone, Copy)]
pub struct PassInput<'a> {
    /// Sheet grid, header rows included
    pub rows: &'a [Vec<String>],
    /// Every member the registry knows about
    pub registry_members: &'a [RegistryMember],
    /// Registry's current report-to string
    pub registry_report_to: &'a str,
}

/// What a pass decided
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Renames and absence changes for members that have a registry id
    pub actions: Vec<Action>,
    /// Members to create in the registry
    pub new_members: Vec<RosterMember>,
    /// Pending members left without a candidate row
    pub stale_members: usize,
    /// Rows matched to existing registry members by exact name
    pub matched_members: usize,
    /// Rows that could not be turned into a member
    pub skipped_rows: Vec<usize>,
    /// New report-to value pushed during the pass
    pub report_to_change: Option<String>,
}

/// Runs the four stages of one pass over a borrowed roster
pub struct Resolver<'a> {
    layout: &'a SheetLayout,
    input: PassInput<'a>,
    roster: &'a mut Roster,
    pending_rows: BTreeSet<usize>,
    pending_members: BTreeSet<String>,
    resolved_rows: BTreeSet<usize>,
    blank_rows: BTreeSet<usize>,
    anchored: HashSet<String>,
    resolution: Resolution,
}

impl<'a> Resolver<'a> {
    pub fn new(layout: &'a SheetLayout, input: PassInput<'a>, roster: &'a mut Roster) -> Self {
        Self {
            layout,
            input,
            roster,
            pending_rows: BTreeSet::new(),
            pending_members: BTreeSet::new(),
            resolved_rows: BTreeSet::new(),
            blank_rows: BTreeSet::new(),
            anchored: HashSet::new(),
            resolution: Resolution::default(),
        }
    }

    /// Rows not yet resolved
    pub fn pending_rows(&self) -> &BTreeSet<usize> {
        &self.pending_rows
    }

    /// Members whose anchor did not hold and who have no row yet
    pub fn pending_members(&self) -> &BTreeSet<String> {
        &self.pending_members
    }

    /// Rows matched to a member
    pub fn resolved_rows(&self) -> &BTreeSet<usize> {
        &self.resolved_rows
    }

    /// Rows skipped because all name cells were blank
    pub fn blank_rows(&self) -> &BTreeSet<usize> {
        &self.blank_rows
    }

    fn push_actions(&mut self, kinds: Vec<ActionKind>, member: &RosterMember) {
        self.resolution
            .actions
            .extend(kinds.into_iter().map(|kind| Action::new(kind, member.clone())));
    }

    /// Stage 1: confirm members against the row they are anchored to
    pub fn easy_updates(&mut self) -> Result<()> {
        log::info!("Performing easy member updates");

        // Lowest id wins when several members claim the same row
        let mut by_home_row: BTreeMap<usize, String> = BTreeMap::new();
        for (id, member) in self.roster.iter() {
            if member.registry_id() != Some(id.as_str()) {
                return Err(Error::invariant(format!(
                    "roster entry {id} holds member {member}"
                )));
            }
            match by_home_row.entry(member.home_row) {
                Entry::Vacant(slot) => {
                    slot.insert(id.clone());
                }
                Entry::Occupied(claimed) => log::debug!(
                    "Skipping {member}: row {} already claimed by {}",
                    member.home_row,
                    claimed.get()
                ),
            }
        }

        let rows = self.input.rows;
        for (idx, row) in rows.iter().enumerate().skip(self.layout.header_rows) {
            if self.layout.name_cells_blank(row) {
                self.blank_rows.insert(idx);
                continue;
            }

            let Some(id) = by_home_row.get(&idx) else {
                self.pending_rows.insert(idx);
                continue;
            };

            let member = self
                .roster
                .get_mut(id)
                .ok_or_else(|| Error::invariant(format!("anchored member {id} not in roster")))?;

            if matches_lax(row, member, self.layout) {
                let kinds = member.update(row, self.layout);
                let snapshot = member.clone();
                self.push_actions(kinds, &snapshot);
                self.resolved_rows.insert(idx);
                self.anchored.insert(id.clone());
            } else {
                log::debug!("Row {idx} no longer matches {member}");
                self.pending_rows.insert(idx);
                self.pending_members.insert(id.clone());
            }
        }

        log::info!(
            "  Performed {} easy updates, {} rows and {} members pending",
            self.resolved_rows.len(),
            self.pending_rows.len(),
            self.pending_members.len()
        );
        Ok(())
    }

    /// Stage 2: give each pending member its best-scoring pending row
    ///
    /// Members are visited in registry id order; each takes the top-ranked
    /// row (ties to the lowest row index) before the next member ranks.
    pub fn confusing_updates(&mut self) -> Result<()> {
        log::info!("Performing confusing member updates");

        let rows = self.input.rows;
        let pending: Vec<String> = self.pending_members.iter().cloned().collect();
        for id in pending {
            let member = self
                .roster
                .get_mut(&id)
                .ok_or_else(|| Error::invariant(format!("pending member {id} not in roster")))?;

            let ranked = rank_rows(rows, self.pending_rows.iter().copied(), member, self.layout);
            let Some(&(best, score)) = ranked.first() else {
                self.resolution.stale_members += 1;
                continue;
            };

            log::debug!("Moving {member} from row {} to row {best} (score {score})", member.home_row);
            member.home_row = best;
            let kinds = member.update(&rows[best], self.layout);
            let snapshot = member.clone();

            self.pending_rows.remove(&best);
            self.pending_members.remove(&id);
            self.resolved_rows.insert(best);
            self.anchored.insert(id);
            self.push_actions(kinds, &snapshot);
        }

        log::info!(
            "  Performed confusing updates, {} stale members",
            self.resolution.stale_members
        );
        Ok(())
    }

    /// Stage 3: push the sheet's report-to cell when it differs
    ///
    /// The write goes out immediately through `sink`; its result is logged
    /// and otherwise ignored. Without a sink the change is only recorded.
    pub fn update_report_to(&mut self, sink: Option<&dyn RegistrySink>) {
        log::info!("Updating report-to if necessary");

        let sheet_value = self.layout.report_to(self.input.rows);
        let registry_value = self.input.registry_report_to.trim();
        if sheet_value.is_empty() || sheet_value == registry_value {
            log::info!("  Report-to unchanged");
            return;
        }

        log::info!("  Updating report-to from {registry_value:?} to {sheet_value:?}");
        if let Some(sink) = sink
            && let Err(e) = sink.set_report_to(sheet_value)
        {
            log::warn!("  Failed to update report-to: {e:#}");
        }
        self.resolution.report_to_change = Some(sheet_value.to_string());
    }

    /// Stage 4: match leftover rows to registry members or create new ones
    pub fn create_and_match_new(&mut self) {
        log::info!("Creating and matching new members");

        let rows = self.input.rows;
        let mut new_names: HashSet<MemberName> = HashSet::new();
        let pending: Vec<usize> = self.pending_rows.iter().copied().collect();

        for idx in pending {
            self.pending_rows.remove(&idx);
            let row = &rows[idx];

            let Some(mut member) = RosterMember::from_row(row, idx, self.layout) else {
                log::warn!("  Skipping row {idx}: honorific or last name missing");
                self.resolution.skipped_rows.push(idx);
                continue;
            };

            let name = member.name().clone();
            let mut same_name = self
                .input
                .registry_members
                .iter()
                .filter(|record| record.name() == name)
                .peekable();

            if same_name.peek().is_some() {
                let Some(record) = same_name.find(|record| !self.anchored.contains(&record.id))
                else {
                    log::warn!("  Skipping row {idx}: {name} is already matched to another row");
                    self.resolution.skipped_rows.push(idx);
                    continue;
                };

                log::info!("  Found matching member {}", name.formatted());
                member.adopt(record);
                let kinds = member.update(row, self.layout);
                self.push_actions(kinds, &member);
                self.anchored.insert(record.id.clone());
                self.resolved_rows.insert(idx);
                self.resolution.matched_members += 1;
                self.roster.insert(record.id.clone(), member);
                continue;
            }

            if !new_names.insert(name.clone()) {
                log::warn!("  Skipping row {idx}: {name} appears on more than one new row");
                self.resolution.skipped_rows.push(idx);
                continue;
            }

            log::info!("  New member {}", name.formatted());
            self.resolved_rows.insert(idx);
            self.resolution.new_members.push(member);
        }

        log::info!(
            "  {} new members, {} matched to registry",
            self.resolution.new_members.len(),
            self.resolution.matched_members
        );
    }

    /// Consume the resolver and return what the pass decided
    pub fn finish(self) -> Resolution {
        self.resolution
    }
}

/// Run all four stages in order
pub fn resolve(
    layout: &SheetLayout,
    input: PassInput<'_>,
    roster: &mut Roster,
    sink: Option<&dyn RegistrySink>,
) -> Result<Resolution> {
    let mut resolver = Resolver::new(layout, input, roster);
    resolver.easy_updates()?;
    resolver.confusing_updates()?;
    resolver.update_report_to(sink);
    resolver.create_and_match_new();
    Ok(resolver.finish())
}
