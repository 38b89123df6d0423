//! Customer company records.

use serde::{Deserialize, Serialize};

use super::{cell, cell_opt, SheetRecord};

/// One row of the CompanyList sheet.
///
/// Columns: A id, B name, C type, D customer stage, E engagement rating,
/// F last activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub company_id: String,
    pub company_name: String,
    pub company_type: Option<String>,
    pub customer_stage: Option<String>,
    pub engagement_rating: Option<String>,
    pub last_activity: Option<String>,
    pub row_index: Option<usize>,
}

impl Company {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let company_id = cell_opt(row, 0)?;
        Some(Self {
            company_id,
            company_name: cell(row, 1).to_string(),
            company_type: cell_opt(row, 2),
            customer_stage: cell_opt(row, 3),
            engagement_rating: cell_opt(row, 4),
            last_activity: cell_opt(row, 5),
            row_index: None,
        })
    }
}

impl SheetRecord for Company {
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

    #[test]
    fn test_parse_company() {
        let row: Vec<String> = ["C-100", "Acme Industrial", "Manufacturer", "Repeat", "A"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let company = Company::parse_row(&row, 0).unwrap();
        assert_eq!(company.company_id, "C-100");
        assert_eq!(company.engagement_rating.as_deref(), Some("A"));
        assert_eq!(company.last_activity, None);
    }
}
