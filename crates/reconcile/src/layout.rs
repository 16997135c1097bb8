//! Sheet column layout and cell access
//!
//! The sheet is a grid of strings, one row per roster row. Which column holds
//! what is configuration, not algorithm, so every lookup goes through a
//! [`SheetLayout`].

use crate::absence::Period;
use serde::{Deserialize, Serialize};

/// Number of header rows at the top of the sheet that never hold members
pub const DEFAULT_HEADER_ROWS: usize = 2;

/// Column indices (0-based) for each field in a sheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    pub honorific: usize,
    pub first_name: usize,
    pub last_name: usize,
    /// Full-day absence flag
    pub full_day: usize,
    /// Morning block flag (expands to the morning periods)
    pub am_block: usize,
    /// Afternoon block flag (expands to the afternoon periods)
    pub pm_block: usize,
    /// One column per period, in canonical period order
    pub periods: [usize; 10],
    /// Row holding the report-to cell
    pub report_to_row: usize,
    /// Column holding the report-to cell
    pub report_to_col: usize,
    /// Leading rows skipped by every pass
    pub header_rows: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            honorific: 0,   // A
            first_name: 1,  // B
            last_name: 2,   // C
            full_day: 6,    // G
            am_block: 8,    // I
            pm_block: 9,    // J
            periods: [12, 13, 14, 15, 16, 17, 18, 19, 20, 21], // M..V
            report_to_row: 2,
            report_to_col: 4, // E
            header_rows: DEFAULT_HEADER_ROWS,
        }
    }
}

impl SheetLayout {
    /// Column holding the flag for a single period
    pub fn period_column(&self, period: Period) -> usize {
        self.periods[period.index()]
    }

    /// Whether all three name cells of a row are blank
    pub fn name_cells_blank(&self, row: &[String]) -> bool {
        [self.honorific, self.first_name, self.last_name]
            .iter()
            .all(|&col| cell(row, col).trim().is_empty())
    }

    /// The report-to cell of a grid, trimmed
    pub fn report_to<'a>(&self, rows: &'a [Vec<String>]) -> &'a str {
        rows.get(self.report_to_row)
            .map(|row| cell(row, self.report_to_col).trim())
            .unwrap_or("")
    }
}

/// Cell at `col`, or the empty string when the row is shorter
pub fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

/// Whether a checkbox cell is checked
pub fn is_checked(row: &[String], col: usize) -> bool {
    cell(row, col).trim().eq_ignore_ascii_case("true")
}

/// Parse a spreadsheet column name ("A", "Z", "AA") into a 0-based index
pub fn column_index(name: &str) -> Option<usize> {
    let name = name.trim();
    if name.is_empty() || name.len() > 3 {
        return None;
    }

    let mut index = 0usize;
    for ch in name.chars() {
        if !ch.is_ascii_alphabetic() {
            return None;
        }
        let digit = (ch.to_ascii_uppercase() as u8 - b'A') as usize + 1;
        index = index * 26 + digit;
    }
    Some(index - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| (*c).to_string()).collect()
    }

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A"), Some(0));
        assert_eq!(column_index("e"), Some(4));
        assert_eq!(column_index("Z"), Some(25));
        assert_eq!(column_index("AA"), Some(26));
        assert_eq!(column_index("ZZ"), Some(701));
        assert_eq!(column_index(""), None);
        assert_eq!(column_index("A1"), None);
    }

    #[test]
    fn test_default_layout_matches_column_letters() {
        let layout = SheetLayout::default();
        assert_eq!(layout.full_day, column_index("G").unwrap());
        assert_eq!(layout.period_column(Period::P1), column_index("M").unwrap());
        assert_eq!(layout.period_column(Period::P9), column_index("V").unwrap());
    }

    #[test]
    fn test_cell_access_is_total() {
        let r = row(&["ms", "Jane"]);
        assert_eq!(cell(&r, 1), "Jane");
        assert_eq!(cell(&r, 40), "");
        assert!(!is_checked(&r, 40));
        assert!(is_checked(&row(&[" TRUE "]), 0));
        assert!(!is_checked(&row(&["false"]), 0));
    }

    #[test]
    fn test_name_cells_blank() {
        let layout = SheetLayout::default();
        assert!(layout.name_cells_blank(&row(&["", " ", ""])));
        assert!(layout.name_cells_blank(&row(&[])));
        assert!(!layout.name_cells_blank(&row(&["", "", "Doe"])));
    }

    #[test]
    fn test_report_to() {
        let layout = SheetLayout::default();
        let grid = vec![
            row(&["header"]),
            row(&["header"]),
            row(&["", "", "", "", " Room 204 "]),
        ];
        assert_eq!(layout.report_to(&grid), "Room 204");
        assert_eq!(layout.report_to(&grid[..1]), "");
    }
}
