//! Periods and absence status

use crate::layout::{SheetLayout, is_checked};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One instructional period of the day
///
/// Variants are declared in canonical order, so sorted collections of
/// periods iterate in the order the day runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Period {
    P1,
    Igs,
    P2,
    P3,
    P4,
    P5,
    P6,
    P7,
    P8,
    P9,
}

impl Period {
    /// All periods in canonical order
    pub const ALL: [Self; 10] = [
        Self::P1,
        Self::Igs,
        Self::P2,
        Self::P3,
        Self::P4,
        Self::P5,
        Self::P6,
        Self::P7,
        Self::P8,
        Self::P9,
    ];

    /// Periods covered by the morning block checkbox
    pub const MORNING: [Self; 5] = [Self::P1, Self::Igs, Self::P2, Self::P3, Self::P4];

    /// Periods covered by the afternoon block checkbox
    pub const AFTERNOON: [Self; 5] = [Self::P5, Self::P6, Self::P7, Self::P8, Self::P9];

    /// Position in canonical order
    pub fn index(self) -> usize {
        self as usize
    }

    /// Canonical display name, as the registry spells it
    pub fn name(self) -> &'static str {
        match self {
            Self::P1 => "Period 1",
            Self::Igs => "IGS",
            Self::P2 => "Period 2",
            Self::P3 => "Period 3",
            Self::P4 => "Period 4",
            Self::P5 => "Period 5",
            Self::P6 => "Period 6",
            Self::P7 => "Period 7",
            Self::P8 => "Period 8",
            Self::P9 => "Period 9",
        }
    }

    /// Short label used in summaries
    pub fn short_label(self) -> &'static str {
        match self {
            Self::P1 => "P1",
            Self::Igs => "IGS",
            Self::P2 => "P2",
            Self::P3 => "P3",
            Self::P4 => "P4",
            Self::P5 => "P5",
            Self::P6 => "P6",
            Self::P7 => "P7",
            Self::P8 => "P8",
            Self::P9 => "P9",
        }
    }

    fn registry_token(self) -> &'static str {
        match self {
            Self::P1 => "1",
            Self::Igs => "igs",
            Self::P2 => "2",
            Self::P3 => "3",
            Self::P4 => "4",
            Self::P5 => "5",
            Self::P6 => "6",
            Self::P7 => "7",
            Self::P8 => "8",
            Self::P9 => "9",
        }
    }

    /// Map a registry period name to a period
    ///
    /// The first period (in canonical order) whose token appears anywhere in
    /// the name, case-insensitively, wins.
    pub fn from_registry_name(name: &str) -> Option<Self> {
        let lowered = name.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|period| lowered.contains(period.registry_token()))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Absence status of a roster member for the current day
///
/// `PartialDay` never holds an empty set; build it through
/// [`AbsenceStatus::partial`], which collapses an empty set to `Present`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbsenceStatus {
    /// Not absent
    #[default]
    Present,
    /// Absent for exactly these periods
    PartialDay(BTreeSet<Period>),
    /// Absent the whole day
    FullDay,
}

impl AbsenceStatus {
    /// Build a partial-day status, normalizing an empty set to `Present`
    pub fn partial(periods: impl IntoIterator<Item = Period>) -> Self {
        let periods: BTreeSet<Period> = periods.into_iter().collect();
        if periods.is_empty() {
            Self::Present
        } else {
            Self::PartialDay(periods)
        }
    }

    /// Classify the absence cells of a sheet row
    ///
    /// A checked full-day cell wins over every period cell.
    pub fn classify(row: &[String], layout: &SheetLayout) -> Self {
        if is_checked(row, layout.full_day) {
            return Self::FullDay;
        }

        let mut periods: BTreeSet<Period> = Period::ALL
            .into_iter()
            .filter(|&period| is_checked(row, layout.period_column(period)))
            .collect();

        if is_checked(row, layout.am_block) {
            periods.extend(Period::MORNING);
        }
        if is_checked(row, layout.pm_block) {
            periods.extend(Period::AFTERNOON);
        }

        Self::partial(periods)
    }

    /// Build a status from the registry's view of a member
    ///
    /// Period names the registry reports that match no known period are
    /// dropped.
    pub fn from_registry<S: AsRef<str>>(period_names: &[S], fully_absent: bool) -> Self {
        if fully_absent {
            return Self::FullDay;
        }

        Self::partial(
            period_names
                .iter()
                .filter_map(|name| Period::from_registry_name(name.as_ref())),
        )
    }

    /// Absent for at least one period
    pub fn is_absent_at_all(&self) -> bool {
        !matches!(self, Self::Present)
    }

    /// Absent the whole day
    pub fn is_fully_absent(&self) -> bool {
        matches!(self, Self::FullDay)
    }

    /// Absent during the given period
    pub fn absent_during(&self, period: Period) -> bool {
        match self {
            Self::Present => false,
            Self::PartialDay(periods) => periods.contains(&period),
            Self::FullDay => true,
        }
    }

    /// Periods the member is out, in canonical order
    pub fn absent_periods(&self) -> Vec<Period> {
        Period::ALL
            .into_iter()
            .filter(|&period| self.absent_during(period))
            .collect()
    }
}

impl fmt::Display for AbsenceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Present => f.write_str("present"),
            Self::FullDay => f.write_str("out ALL DAY"),
            Self::PartialDay(periods) => {
                let labels: Vec<&str> = periods.iter().map(|p| p.short_label()).collect();
                write!(f, "out {}", labels.join(", "))
            }
        }
    }
}
