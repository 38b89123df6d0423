//! Typed data access for every CRM dataset.
//!
//! `CrmStore` is what the route handlers talk to: cached typed readers on
//! the way in, and a mutating surface on the way out. Every mutation that
//! succeeds against the row store invalidates the affected cache slot (or
//! all slots for writes with cross-dataset effects), which also advances
//! the global write clock behind the staleness protocol.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use crate::api::{ApiError, RowStore};
use crate::cache::CacheService;
use crate::data::datasets::{
    Announcements, CompanyList, ContactList, Contacts, Dataset, DatasetKey, EventLogs,
    Interactions, OppContactLinks, Opportunities, SystemConfig, Users, WeeklyBusiness,
    WeeklyBusinessSummaries,
};
use crate::models::{
    Announcement, Company, Contact, EventLog, FiledContact, Interaction, OppContactLink,
    Opportunity, SystemConfigEntry, User, WeeklyBusinessEntry, WeeklyBusinessSummary,
};
use crate::sync::SystemStatus;

/// Timestamp format written into sheet cells
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now_string() -> String {
    Utc::now().format(TIME_FORMAT).to_string()
}

/// Restrict a whole-columns range like `Opportunities!A:J` to a single row,
/// e.g. `Opportunities!A5:J5`.
fn row_range(range: &str, row_index: usize) -> Option<String> {
    let (sheet, columns) = range.split_once('!')?;
    let (first, last) = columns.split_once(':')?;
    let first: String = first.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    let last: String = last.chars().filter(|c| c.is_ascii_alphabetic()).collect();
    if first.is_empty() || last.is_empty() {
        return None;
    }
    Some(format!("{sheet}!{first}{row_index}:{last}{row_index}"))
}

fn malformed_range(range: &str) -> ApiError {
    ApiError::InvalidResponse(format!("Malformed dataset range: {range}"))
}

// ============================================================================
// Write inputs
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct NewOpportunity {
    pub opportunity_id: String,
    pub opportunity_name: String,
    pub customer_company: Option<String>,
    pub opportunity_type: Option<String>,
    pub current_stage: Option<String>,
    pub current_status: Option<String>,
    pub assignee: Option<String>,
    pub potential_specification: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub name: String,
    pub company: Option<String>,
    pub position: Option<String>,
    pub department: Option<String>,
    pub phone: Option<String>,
    pub mobile: Option<String>,
    pub email: Option<String>,
    pub source: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct NewAnnouncement {
    pub id: String,
    pub title: String,
    pub content: Option<String>,
    pub creator: Option<String>,
    pub is_pinned: bool,
}

#[derive(Debug, Clone, Default)]
pub struct NewEventLog {
    pub event_id: String,
    pub opportunity_id: String,
    pub opportunity_name: Option<String>,
    pub company_id: Option<String>,
    pub company_name: Option<String>,
    pub event_type: Option<String>,
    pub content: Option<String>,
    pub creator: Option<String>,
}

fn opt(value: Option<String>) -> String {
    value.unwrap_or_default()
}

// ============================================================================
// Store
// ============================================================================

/// Shared data-access facade over one spreadsheet.
///
/// Construction happens once at the composition root; clones share the
/// cache service and the row store client.
pub struct CrmStore<S: RowStore> {
    store: Arc<S>,
    cache: Arc<CacheService<S>>,
}

impl<S: RowStore> Clone for CrmStore<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: Arc::clone(&self.cache),
        }
    }
}

impl<S: RowStore> CrmStore<S> {
    pub fn new(store: Arc<S>, cache: Arc<CacheService<S>>) -> Self {
        Self { store, cache }
    }

    pub fn cache(&self) -> &Arc<CacheService<S>> {
        &self.cache
    }

    /// Status payload served to polling clients.
    pub fn system_status(&self) -> SystemStatus {
        SystemStatus {
            success: true,
            last_write_timestamp: Some(self.cache.last_write_timestamp()),
        }
    }

    // =========================================================================
    // Readers (cached)
    // =========================================================================

    pub async fn opportunities(&self) -> Arc<Vec<Opportunity>> {
        self.cache.fetch::<Opportunities>().await
    }

    pub async fn contacts(&self) -> Arc<Vec<Contact>> {
        self.cache.fetch::<Contacts>().await
    }

    pub async fn interactions(&self) -> Arc<Vec<Interaction>> {
        self.cache.fetch::<Interactions>().await
    }

    pub async fn event_logs(&self) -> Arc<Vec<EventLog>> {
        self.cache.fetch::<EventLogs>().await
    }

    pub async fn system_config(&self) -> Arc<Vec<SystemConfigEntry>> {
        self.cache.fetch::<SystemConfig>().await
    }

    pub async fn companies(&self) -> Arc<Vec<Company>> {
        self.cache.fetch::<CompanyList>().await
    }

    pub async fn filed_contacts(&self) -> Arc<Vec<FiledContact>> {
        self.cache.fetch::<ContactList>().await
    }

    pub async fn users(&self) -> Arc<Vec<User>> {
        self.cache.fetch::<Users>().await
    }

    pub async fn weekly_business(&self) -> Arc<Vec<WeeklyBusinessEntry>> {
        self.cache.fetch::<WeeklyBusiness>().await
    }

    pub async fn weekly_business_summary(&self) -> Arc<Vec<WeeklyBusinessSummary>> {
        self.cache.fetch::<WeeklyBusinessSummaries>().await
    }

    pub async fn opp_contact_links(&self) -> Arc<Vec<OppContactLink>> {
        self.cache.fetch::<OppContactLinks>().await
    }

    pub async fn announcements(&self) -> Arc<Vec<Announcement>> {
        self.cache.fetch::<Announcements>().await
    }

    // =========================================================================
    // Generic row operations
    // =========================================================================

    async fn append_and_invalidate(
        &self,
        key: DatasetKey,
        range: &str,
        row: Vec<String>,
    ) -> Result<(), ApiError> {
        self.store.append_row(range, row).await?;
        self.cache.invalidate(Some(key));
        Ok(())
    }

    /// Overwrite one row of a dataset in place.
    pub async fn update_row(
        &self,
        key: DatasetKey,
        range: &str,
        row_index: usize,
        row: Vec<String>,
    ) -> Result<(), ApiError> {
        let target = row_range(range, row_index).ok_or_else(|| malformed_range(range))?;
        self.store.update_range(&target, vec![row]).await?;
        self.cache.invalidate(Some(key));
        Ok(())
    }

    /// Blank out one row of a dataset. The row keeps its position so the
    /// row indices of records below it stay valid; parsers drop the blank
    /// row on the next read.
    pub async fn delete_row(
        &self,
        key: DatasetKey,
        range: &str,
        row_index: usize,
    ) -> Result<(), ApiError> {
        let target = row_range(range, row_index).ok_or_else(|| malformed_range(range))?;
        self.store.clear_range(&target).await?;
        self.cache.invalidate(Some(key));
        Ok(())
    }

    // =========================================================================
    // Opportunities
    // =========================================================================

    pub async fn create_opportunity(&self, input: NewOpportunity) -> Result<(), ApiError> {
        let now = now_string();
        let row = vec![
            input.opportunity_id.clone(),
            input.opportunity_name,
            opt(input.customer_company),
            opt(input.opportunity_type),
            opt(input.current_stage),
            opt(input.current_status),
            opt(input.assignee),
            opt(input.potential_specification),
            now.clone(),
            now,
        ];
        self.append_and_invalidate(DatasetKey::Opportunities, Opportunities::RANGE, row)
            .await?;
        info!(opportunity_id = %input.opportunity_id, "Opportunity created");
        Ok(())
    }

    /// Move an opportunity to a new stage (and optionally status).
    /// Returns `false` when no row carries the given id.
    pub async fn update_opportunity_stage(
        &self,
        opportunity_id: &str,
        stage: &str,
        status: Option<&str>,
    ) -> Result<bool, ApiError> {
        let Some(found) = self
            .cache
            .find_row_by_value(Opportunities::RANGE, 0, opportunity_id)
            .await?
        else {
            debug!(opportunity_id, "Stage update target not found");
            return Ok(false);
        };

        let mut row = found.row_data;
        // Stage E, status F, last update J per the Opportunities layout
        row.resize(10, String::new());
        row[4] = stage.to_string();
        if let Some(status) = status {
            row[5] = status.to_string();
        }
        row[9] = now_string();

        self.update_row(
            DatasetKey::Opportunities,
            Opportunities::RANGE,
            found.row_index,
            row,
        )
        .await?;
        info!(opportunity_id, stage, "Opportunity stage updated");
        Ok(true)
    }

    /// Remove an opportunity row. Returns `false` when the id is unknown.
    pub async fn delete_opportunity(&self, opportunity_id: &str) -> Result<bool, ApiError> {
        let Some(found) = self
            .cache
            .find_row_by_value(Opportunities::RANGE, 0, opportunity_id)
            .await?
        else {
            return Ok(false);
        };

        self.delete_row(DatasetKey::Opportunities, Opportunities::RANGE, found.row_index)
            .await?;
        info!(opportunity_id, "Opportunity deleted");
        Ok(true)
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    pub async fn create_contact(&self, input: NewContact) -> Result<(), ApiError> {
        let row = vec![
            input.name.clone(),
            opt(input.company),
            opt(input.position),
            opt(input.department),
            opt(input.phone),
            opt(input.mobile),
            opt(input.email),
            opt(input.source),
            "new".to_string(),
            now_string(),
        ];
        self.append_and_invalidate(DatasetKey::Contacts, Contacts::RANGE, row)
            .await?;
        info!(name = %input.name, "Contact created");
        Ok(())
    }

    // =========================================================================
    // Event logs
    // =========================================================================

    /// Record an event report. Event reports feed the opportunity activity
    /// columns and several aggregate views, so the blast radius is the
    /// whole cache, not just the event log slot.
    pub async fn log_event(&self, input: NewEventLog) -> Result<(), ApiError> {
        let now = now_string();
        let row = vec![
            input.event_id.clone(),
            input.opportunity_id,
            opt(input.opportunity_name),
            opt(input.company_id),
            opt(input.company_name),
            opt(input.event_type),
            opt(input.content),
            opt(input.creator),
            now.clone(),
            now,
        ];
        self.store.append_row(EventLogs::RANGE, row).await?;
        self.cache.invalidate(None);
        info!(event_id = %input.event_id, "Event logged");
        Ok(())
    }

    // =========================================================================
    // Announcements
    // =========================================================================

    pub async fn create_announcement(&self, input: NewAnnouncement) -> Result<(), ApiError> {
        let row = vec![
            input.id.clone(),
            input.title,
            opt(input.content),
            opt(input.creator),
            if input.is_pinned { "TRUE" } else { "FALSE" }.to_string(),
            "active".to_string(),
            now_string(),
        ];
        self.append_and_invalidate(DatasetKey::Announcements, Announcements::RANGE, row)
            .await?;
        info!(id = %input.id, "Announcement created");
        Ok(())
    }

    /// Remove an announcement row. Returns `false` when the id is unknown.
    pub async fn delete_announcement(&self, id: &str) -> Result<bool, ApiError> {
        let Some(found) = self
            .cache
            .find_row_by_value(Announcements::RANGE, 0, id)
            .await?
        else {
            return Ok(false);
        };

        self.delete_row(DatasetKey::Announcements, Announcements::RANGE, found.row_index)
            .await?;
        info!(id, "Announcement deleted");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockRowStore;
    use std::time::Duration;

    fn opportunity_rows() -> Vec<Vec<String>> {
        vec![
            vec!["id".into(), "name".into()],
            vec![
                "OPP-1".into(),
                "Line expansion".into(),
                "Acme".into(),
                "New customer".into(),
                "Lead".into(),
                "Active".into(),
            ],
        ]
    }

    fn make_store() -> (Arc<MockRowStore>, CrmStore<MockRowStore>) {
        let mock = Arc::new(MockRowStore::new());
        let cache = Arc::new(CacheService::new(
            Arc::clone(&mock),
            Duration::from_secs(30),
        ));
        let crm = CrmStore::new(Arc::clone(&mock), cache);
        (mock, crm)
    }

    #[test]
    fn test_row_range() {
        assert_eq!(
            row_range("Opportunities!A:J", 5).as_deref(),
            Some("Opportunities!A5:J5")
        );
        assert_eq!(row_range("Users!A:C", 2).as_deref(), Some("Users!A2:C2"));
        assert_eq!(row_range("NoBang", 2), None);
    }

    #[tokio::test]
    async fn test_create_opportunity_appends_and_invalidates() {
        let (mock, crm) = make_store();
        mock.set_rows(Opportunities::RANGE, opportunity_rows());

        crm.opportunities().await;
        let before = crm.cache().last_write_timestamp();

        crm.create_opportunity(NewOpportunity {
            opportunity_id: "OPP-2".into(),
            opportunity_name: "Renewal".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        let appended = mock.appended();
        assert_eq!(appended.len(), 1);
        assert_eq!(appended[0].0, Opportunities::RANGE);
        assert_eq!(appended[0].1[0], "OPP-2");

        assert!(crm.cache().last_write_timestamp() > before);

        // The stale entry is refetched on the next read
        crm.opportunities().await;
        assert_eq!(mock.calls_for(Opportunities::RANGE), 2);
    }

    #[tokio::test]
    async fn test_update_opportunity_stage_rewrites_row() {
        let (mock, crm) = make_store();
        mock.set_rows(Opportunities::RANGE, opportunity_rows());

        let updated = crm
            .update_opportunity_stage("opp-1", "Quotation", Some("Hot"))
            .await
            .unwrap();
        assert!(updated);

        let updates = mock.updated();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "Opportunities!A2:J2");
        let row = &updates[0].1[0];
        assert_eq!(row[4], "Quotation");
        assert_eq!(row[5], "Hot");
        assert!(!row[9].is_empty());
    }

    #[tokio::test]
    async fn test_update_unknown_opportunity_is_a_miss() {
        let (mock, crm) = make_store();
        mock.set_rows(Opportunities::RANGE, opportunity_rows());
        let before = crm.cache().last_write_timestamp();

        let updated = crm
            .update_opportunity_stage("OPP-404", "Quotation", None)
            .await
            .unwrap();

        assert!(!updated);
        assert!(mock.updated().is_empty());
        // No write happened, so the clock did not move
        assert_eq!(crm.cache().last_write_timestamp(), before);
    }

    #[tokio::test]
    async fn test_delete_announcement_clears_row() {
        let (mock, crm) = make_store();
        mock.set_rows(
            Announcements::RANGE,
            vec![
                vec!["id".into(), "title".into()],
                vec!["ANN-1".into(), "Old notice".into()],
            ],
        );

        let deleted = crm.delete_announcement("ANN-1").await.unwrap();
        assert!(deleted);
        assert_eq!(mock.cleared(), vec!["Announcements!A2:G2".to_string()]);
    }

    #[tokio::test]
    async fn test_log_event_invalidates_everything() {
        let (mock, crm) = make_store();
        mock.set_rows(Opportunities::RANGE, opportunity_rows());
        mock.set_rows(EventLogs::RANGE, vec![vec!["id".into()]]);

        crm.opportunities().await;
        crm.event_logs().await;

        crm.log_event(NewEventLog {
            event_id: "EVT-1".into(),
            opportunity_id: "OPP-1".into(),
            ..Default::default()
        })
        .await
        .unwrap();

        crm.opportunities().await;
        crm.event_logs().await;

        // Both datasets were refetched after the broad invalidation
        assert_eq!(mock.calls_for(Opportunities::RANGE), 2);
        assert_eq!(mock.calls_for(EventLogs::RANGE), 2);
    }

    #[tokio::test]
    async fn test_failed_write_does_not_invalidate() {
        let (mock, crm) = make_store();
        mock.set_fail_writes(true);
        let before = crm.cache().last_write_timestamp();

        let result = crm
            .create_contact(NewContact {
                name: "Jane Chen".into(),
                ..Default::default()
            })
            .await;

        assert!(result.is_err());
        assert_eq!(crm.cache().last_write_timestamp(), before);
    }

    #[tokio::test]
    async fn test_system_status_reports_clock() {
        let (_mock, crm) = make_store();
        crm.cache().invalidate(None);

        let status = crm.system_status();
        assert!(status.success);
        assert_eq!(
            status.last_write_timestamp,
            Some(crm.cache().last_write_timestamp())
        );
    }
}
