//! Opportunity records and their satellite datasets: interactions, event
//! reports and the opportunity/contact link table.

use serde::{Deserialize, Serialize};

use super::{cell, cell_opt, SheetRecord};

/// One row of the Opportunities sheet.
///
/// Columns: A id, B name, C customer company, D type, E current stage,
/// F current status, G assignee, H potential specification, I created time,
/// J last update time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunity {
    pub opportunity_id: String,
    pub opportunity_name: String,
    pub customer_company: Option<String>,
    pub opportunity_type: Option<String>,
    pub current_stage: Option<String>,
    pub current_status: Option<String>,
    pub assignee: Option<String>,
    pub potential_specification: Option<String>,
    pub created_time: Option<String>,
    pub last_update_time: Option<String>,
    pub row_index: Option<usize>,
}

impl Opportunity {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let opportunity_id = cell_opt(row, 0)?;
        Some(Self {
            opportunity_id,
            opportunity_name: cell(row, 1).to_string(),
            customer_company: cell_opt(row, 2),
            opportunity_type: cell_opt(row, 3),
            current_stage: cell_opt(row, 4),
            current_status: cell_opt(row, 5),
            assignee: cell_opt(row, 6),
            potential_specification: cell_opt(row, 7),
            created_time: cell_opt(row, 8),
            last_update_time: cell_opt(row, 9),
            row_index: None,
        })
    }
}

impl SheetRecord for Opportunity {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the Interactions sheet.
///
/// Columns: A id, B opportunity id, C summary, D type, E created by,
/// F created time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub interaction_id: String,
    pub opportunity_id: String,
    pub summary: Option<String>,
    pub interaction_type: Option<String>,
    pub created_by: Option<String>,
    pub created_time: Option<String>,
    pub row_index: Option<usize>,
}

impl Interaction {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let interaction_id = cell_opt(row, 0)?;
        Some(Self {
            interaction_id,
            opportunity_id: cell(row, 1).to_string(),
            summary: cell_opt(row, 2),
            interaction_type: cell_opt(row, 3),
            created_by: cell_opt(row, 4),
            created_time: cell_opt(row, 5),
            row_index: None,
        })
    }
}

impl SheetRecord for Interaction {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the EventLogs sheet: a dated report attached to an
/// opportunity.
///
/// Columns: A id, B opportunity id, C opportunity name, D company id,
/// E company name, F event type, G content, H creator, I created time,
/// J last modified time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventLog {
    pub event_id: String,
    pub opportunity_id: String,
    pub opportunity_name: Option<String>,
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub event_type: Option<String>,
    pub content: Option<String>,
    pub creator: Option<String>,
    pub created_time: Option<String>,
    pub last_modified_time: Option<String>,
    pub row_index: Option<usize>,
}

impl EventLog {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let event_id = cell_opt(row, 0)?;
        Some(Self {
            event_id,
            opportunity_id: cell(row, 1).to_string(),
            opportunity_name: cell_opt(row, 2),
            company_id: cell_opt(row, 3),
            company_name: cell_opt(row, 4),
            event_type: cell_opt(row, 5),
            content: cell_opt(row, 6),
            creator: cell_opt(row, 7),
            created_time: cell_opt(row, 8),
            last_modified_time: cell_opt(row, 9),
            row_index: None,
        })
    }
}

impl SheetRecord for EventLog {
    fn row_index(&self) -> Option<usize> {
        self.row_index
    }

    fn set_row_index(&mut self, index: usize) {
        self.row_index = Some(index);
    }
}

/// One row of the link table tying opportunities to filed contacts.
///
/// Columns: A opportunity id, B contact id, C role.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OppContactLink {
    pub opportunity_id: String,
    pub contact_id: String,
    pub role: Option<String>,
    pub row_index: Option<usize>,
}

impl OppContactLink {
    pub fn parse_row(row: &[String], _index: usize) -> Option<Self> {
        let opportunity_id = cell_opt(row, 0)?;
        let contact_id = cell_opt(row, 1)?;
        Some(Self {
            opportunity_id,
            contact_id,
            role: cell_opt(row, 2),
            row_index: None,
        })
    }
}

impl SheetRecord for OppContactLink {
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
    fn test_parse_opportunity() {
        let r = row(&[
            "OPP-001",
            "Line expansion",
            "Acme Industrial",
            "New customer",
            "Quotation",
            "Active",
            "alice",
            "10k units/mo",
            "2024-03-01 09:00:00",
            "2024-03-05 14:00:00",
        ]);
        let opp = Opportunity::parse_row(&r, 0).unwrap();
        assert_eq!(opp.opportunity_id, "OPP-001");
        assert_eq!(opp.customer_company.as_deref(), Some("Acme Industrial"));
        assert_eq!(opp.row_index, None);
    }

    #[test]
    fn test_blank_id_row_is_dropped() {
        assert!(Opportunity::parse_row(&row(&["", "orphan"]), 0).is_none());
        assert!(OppContactLink::parse_row(&row(&["OPP-001", ""]), 0).is_none());
    }

    #[test]
    fn test_parse_short_event_log_row() {
        let log = EventLog::parse_row(&row(&["EVT-1", "OPP-001"]), 3).unwrap();
        assert_eq!(log.event_id, "EVT-1");
        assert_eq!(log.content, None);
    }
}
