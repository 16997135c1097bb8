//! Scoring how well a sheet row corresponds to a roster member

use crate::layout::SheetLayout;
use crate::member::{MemberName, RosterMember};
use std::cmp::Reverse;

/// Credit for an exact last-name match (primary discriminator)
pub const LAST_NAME_WEIGHT: u32 = 3;
/// Credit for an exact first-name match
pub const FIRST_NAME_WEIGHT: u32 = 2;
/// Credit for an exact honorific match
pub const HONORIFIC_WEIGHT: u32 = 2;

/// Minimum score for a member to keep its anchored row
///
/// Reached by either name plus the honorific, or by both names. A last
/// name alone stays below it.
pub const LAX_THRESHOLD: u32 = 4;

/// Additive match score of a row against a member
pub fn match_score(row: &[String], member: &RosterMember, layout: &SheetLayout) -> u32 {
    name_score(&MemberName::from_row(row, layout), member.name())
}

/// Additive match score between two normalized names
pub fn name_score(candidate: &MemberName, known: &MemberName) -> u32 {
    let mut score = 0;
    if candidate.last == known.last {
        score += LAST_NAME_WEIGHT;
    }
    if candidate.first == known.first {
        score += FIRST_NAME_WEIGHT;
    }
    if candidate.honorific == known.honorific {
        score += HONORIFIC_WEIGHT;
    }
    score
}

/// Whether a row still plausibly belongs to a member
pub fn matches_lax(row: &[String], member: &RosterMember, layout: &SheetLayout) -> bool {
    match_score(row, member, layout) >= LAX_THRESHOLD
}

/// Rank candidate rows for a member, best first
///
/// Ties go to the lowest row index.
pub fn rank_rows(
    rows: &[Vec<String>],
    candidates: impl IntoIterator<Item = usize>,
    member: &RosterMember,
    layout: &SheetLayout,
) -> Vec<(usize, u32)> {
    let mut ranked: Vec<(usize, u32)> = candidates
        .into_iter()
        .filter_map(|idx| rows.get(idx).map(|row| (idx, match_score(row, member, layout))))
        .collect();
    ranked.sort_by_key(|&(idx, score)| (Reverse(score), idx));
    ranked
}
