//! Lead contacts (card-sourced prospects) and the filed contact directory.

use serde::{Deserialize, Serialize};

use super::{cell, cell_opt, SheetRecord};

/// One row of the Contacts sheet: a prospect captured from a business card
/// or other source, not yet filed under a company.
///
/// Columns: A name, B company, C position, D department, E phone, F mobile,
/// G email, H source, I status, J created time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
    pub status: Option<String>,
    pub created_time: Option<String>,
    pub row_index: Option<usize>,
}

impl Contact {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let name = cell_opt(row, 0)?;
        Some(Self {
            name,
            company: cell_opt(row, 1),
            position: cell_opt(row, 2),
            department: cell_opt(row, 3),
            phone: cell_opt(row, 4),
            mobile: cell_opt(row, 5),
            email: cell_opt(row, 6),
            source: cell_opt(row, 7),
            status: cell_opt(row, 8),
            created_time: cell_opt(row, 9),
            row_index: None,
        })
    }
}

impl SheetRecord for Contact {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the ContactList sheet: a contact filed under a company.
///
/// Columns: A contact id, B company id, C name, D position, E email,
/// F phone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FiledContact {
    pub contact_id: String,
    pub company_id: String,
    pub name: String,
    pub position: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub row_index: Option<usize>,
}

impl FiledContact {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let contact_id = cell_opt(row, 0)?;
        Some(Self {
            contact_id,
            company_id: cell(row, 1).to_string(),
            name: cell(row, 2).to_string(),
            position: cell_opt(row, 3),
            email: cell_opt(row, 4),
            phone: cell_opt(row, 5),
            row_index: None,
        })
    }
}

impl SheetRecord for FiledContact {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}
