//! Weekly business records: per-entry log rows and the per-week summary
//! sheet maintained alongside them.

use serde::{Deserialize, Serialize};

use super::{cell, cell_opt, SheetRecord};

/// One row of the WeeklyBusiness sheet.
///
/// Columns: A week id (e.g. `2024-W23`), B entry date, C owner, D content,
/// E category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBusinessEntry {
    pub week_id: String,
    pub entry_date: Option<String>,
    pub owner: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub row_index: Option<usize>,
}

impl WeeklyBusinessEntry {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let week_id = cell_opt(row, 0)?;
        Some(Self {
            week_id,
            entry_date: cell_opt(row, 1),
            owner: cell_opt(row, 2),
            content: cell_opt(row, 3),
            category: cell_opt(row, 4),
            row_index: None,
        })
    }
}

impl SheetRecord for WeeklyBusinessEntry {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the WeeklyBusinessSummary sheet.
///
/// Columns: A week id, B entry count, C comma-separated owners.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyBusinessSummary {
    pub week_id: String,
    pub entry_count: usize,
    pub owners: Vec<String>,
    pub row_index: Option<usize>,
}

impl WeeklyBusinessSummary {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let week_id = cell_opt(row, 0)?;
        let entry_count = cell(row, 1).trim().parse().unwrap_or(0);
        let owners = cell(row, 2)
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Some(Self {
            week_id,
            entry_count,
            owners,
            row_index: None,
        })
    }
}

impl SheetRecord for WeeklyBusinessSummary {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_summary_owners() {
        let summary =
            WeeklyBusinessSummary::parse_row(&row(&["2024-W23", "7", "alice, bob"]), 0).unwrap();
        assert_eq!(summary.entry_count, 7);
        assert_eq!(summary.owners, vec!["alice", "bob"]);
    }

    #[test]
    fn test_unparseable_count_defaults_to_zero() {
        let summary = WeeklyBusinessSummary::parse_row(&row(&["2024-W23", "n/a"]), 0).unwrap();
        assert_eq!(summary.entry_count, 0);
        assert!(summary.owners.is_empty());
    }
}
