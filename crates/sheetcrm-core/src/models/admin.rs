//! Administrative datasets: users, announcements and system configuration.

use serde::{Deserialize, Serialize};

use super::{cell, cell_flag, cell_opt, SheetRecord};

/// One row of the Users sheet.
///
/// Columns: A username, B display name, C role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: Option<String>,
    pub role: Option<String>,
    pub row_index: Option<usize>,
}

impl User {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let username = cell_opt(row, 0)?;
        Some(Self {
            username,
            display_name: cell_opt(row, 1),
            role: cell_opt(row, 2),
            row_index: None,
        })
    }
}

impl SheetRecord for User {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the Announcements sheet.
///
/// Columns: A id, B title, C content, D creator, E pinned flag, F status,
/// G last update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub creator: Option<String>,
    pub is_pinned: bool,
    pub status: Option<String>,
    pub last_update_time: Option<String>,
    pub row_index: Option<usize>,
}

impl Announcement {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let id = cell_opt(row, 0)?;
        Some(Self {
            id,
            title: cell(row, 1).to_string(),
            content: cell_opt(row, 2),
            creator: cell_opt(row, 3),
            is_pinned: cell_flag(row, 4),
            status: cell_opt(row, 5),
            last_update_time: cell_opt(row, 6),
            row_index: None,
        })
    }
}

impl SheetRecord for Announcement {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the SystemConfig sheet: a key/value pair driving dropdown
/// options and feature toggles.
///
/// Columns: A key, B value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfigEntry {
    pub key: String,
    pub value: String,
    pub row_index: Option<usize>,
}

impl SystemConfigEntry {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let key = cell_opt(row, 0)?;
        Some(Self {
            key,
            value: cell(row, 1).to_string(),
            row_index: None,
        })
    }
}

impl SheetRecord for SystemConfigEntry {
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
    fn test_parse_announcement_pinned_flag() {
        let a = Announcement::parse_row(
            &row(&["ANN-1", "Maintenance window", "Sat 22:00", "admin", "TRUE", "active"]),
            0,
        )
        .unwrap();
        assert!(a.is_pinned);
        assert_eq!(a.status.as_deref(), Some("active"));
    }

    #[test]
    fn test_parse_config_entry() {
        let entry = SystemConfigEntry::parse_row(&row(&["stages", "Lead,Quotation,Won"]), 0).unwrap();
        assert_eq!(entry.key, "stages");
        assert_eq!(entry.value, "Lead,Quotation,Won");
    }
}
