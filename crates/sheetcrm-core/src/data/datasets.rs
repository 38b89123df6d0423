//! The closed set of cached datasets.
//!
//! Every dataset the cache can hold is a [`DatasetKey`] variant bound at
//! compile time to its sheet range, row parser and presentation order
//! through a [`Dataset`] implementation. Unknown keys cannot exist: adding
//! a dataset means adding a variant and an implementation here.

use std::fmt;

use crate::models::{
    Announcement, Company, Contact, EventLog, FiledContact, Interaction, OppContactLink,
    Opportunity, SheetRecord, SystemConfigEntry, User, WeeklyBusinessEntry, WeeklyBusinessSummary,
};

/// Logical name of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKey {
    Opportunities,
    Contacts,
    Interactions,
    EventLogs,
    SystemConfig,
    CompanyList,
    ContactList,
    Users,
    WeeklyBusiness,
    WeeklyBusinessSummary,
    OppContactLinks,
    Announcements,
}

impl DatasetKey {
    pub const ALL: [DatasetKey; 12] = [
        DatasetKey::Opportunities,
        DatasetKey::Contacts,
        DatasetKey::Interactions,
        DatasetKey::EventLogs,
        DatasetKey::SystemConfig,
        DatasetKey::CompanyList,
        DatasetKey::ContactList,
        DatasetKey::Users,
        DatasetKey::WeeklyBusiness,
        DatasetKey::WeeklyBusinessSummary,
        DatasetKey::OppContactLinks,
        DatasetKey::Announcements,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKey::Opportunities => "opportunities",
            DatasetKey::Contacts => "contacts",
            DatasetKey::Interactions => "interactions",
            DatasetKey::EventLogs => "event_logs",
            DatasetKey::SystemConfig => "system_config",
            DatasetKey::CompanyList => "company_list",
            DatasetKey::ContactList => "contact_list",
            DatasetKey::Users => "users",
            DatasetKey::WeeklyBusiness => "weekly_business",
            DatasetKey::WeeklyBusinessSummary => "weekly_business_summary",
            DatasetKey::OppContactLinks => "opp_contact_links",
            DatasetKey::Announcements => "announcements",
        }
    }
}

impl fmt::Display for DatasetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compile-time configuration of one dataset: which cache slot it fills,
/// where its rows live, how a row becomes a record and how records are
/// ordered for presentation.
pub trait Dataset: 'static {
    type Record: SheetRecord + Clone + Send + Sync + 'static;

    const KEY: DatasetKey;

    /// A1 range covering the header row and all data columns
    const RANGE: &'static str;

    fn parse_row(row: &[String], index: usize) -> Option<Self::Record>;

    /// Presentation order; default is sheet order.
    fn sort(_records: &mut [Self::Record]) {}
}

pub struct Opportunities;

impl Dataset for Opportunities {
    type Record = Opportunity;
    const KEY: DatasetKey = DatasetKey::Opportunities;
    const RANGE: &'static str = "Opportunities!A:J";

    fn parse_row(row: &[String], index: usize) -> Option<Opportunity> {
        Opportunity::parse_row(row, index)
    }

    /// Newest first
    fn sort(records: &mut [Opportunity]) {
        records.sort_by(|a, b| b.created_time.cmp(&a.created_time));
    }
}

pub struct Contacts;

impl Dataset for Contacts {
    type Record = Contact;
    const KEY: DatasetKey = DatasetKey::Contacts;
    const RANGE: &'static str = "Contacts!A:J";

    fn parse_row(row: &[String], index: usize) -> Option<Contact> {
        Contact::parse_row(row, index)
    }

    fn sort(records: &mut [Contact]) {
        records.sort_by(|a, b| b.created_time.cmp(&a.created_time));
    }
}

pub struct Interactions;

impl Dataset for Interactions {
    type Record = Interaction;
    const KEY: DatasetKey = DatasetKey::Interactions;
    const RANGE: &'static str = "Interactions!A:F";

    fn parse_row(row: &[String], index: usize) -> Option<Interaction> {
        Interaction::parse_row(row, index)
    }

    fn sort(records: &mut [Interaction]) {
        records.sort_by(|a, b| b.created_time.cmp(&a.created_time));
    }
}

pub struct EventLogs;

impl Dataset for EventLogs {
    type Record = EventLog;
    const KEY: DatasetKey = DatasetKey::EventLogs;
    const RANGE: &'static str = "EventLogs!A:J";

    fn parse_row(row: &[String], index: usize) -> Option<EventLog> {
        EventLog::parse_row(row, index)
    }

    fn sort(records: &mut [EventLog]) {
        records.sort_by(|a, b| b.created_time.cmp(&a.created_time));
    }
}

pub struct SystemConfig;

impl Dataset for SystemConfig {
    type Record = SystemConfigEntry;
    const KEY: DatasetKey = DatasetKey::SystemConfig;
    const RANGE: &'static str = "SystemConfig!A:B";

    fn parse_row(row: &[String], index: usize) -> Option<SystemConfigEntry> {
        SystemConfigEntry::parse_row(row, index)
    }
}

pub struct CompanyList;

impl Dataset for CompanyList {
    type Record = Company;
    const KEY: DatasetKey = DatasetKey::CompanyList;
    const RANGE: &'static str = "CompanyList!A:F";

    fn parse_row(row: &[String], index: usize) -> Option<Company> {
        Company::parse_row(row, index)
    }

    fn sort(records: &mut [Company]) {
        records.sort_by(|a, b| a.company_name.to_lowercase().cmp(&b.company_name.to_lowercase()));
    }
}

pub struct ContactList;

impl Dataset for ContactList {
    type Record = FiledContact;
    const KEY: DatasetKey = DatasetKey::ContactList;
    const RANGE: &'static str = "ContactList!A:F";

    fn parse_row(row: &[String], index: usize) -> Option<FiledContact> {
        FiledContact::parse_row(row, index)
    }
}

pub struct Users;

impl Dataset for Users {
    type Record = User;
    const KEY: DatasetKey = DatasetKey::Users;
    const RANGE: &'static str = "Users!A:C";

    fn parse_row(row: &[String], index: usize) -> Option<User> {
        User::parse_row(row, index)
    }
}

pub struct WeeklyBusiness;

impl Dataset for WeeklyBusiness {
    type Record = WeeklyBusinessEntry;
    const KEY: DatasetKey = DatasetKey::WeeklyBusiness;
    const RANGE: &'static str = "WeeklyBusiness!A:E";

    fn parse_row(row: &[String], index: usize) -> Option<WeeklyBusinessEntry> {
        WeeklyBusinessEntry::parse_row(row, index)
    }

    /// Most recent week first, entries within a week in sheet order
    fn sort(records: &mut [WeeklyBusinessEntry]) {
        records.sort_by(|a, b| b.week_id.cmp(&a.week_id));
    }
}

pub struct WeeklyBusinessSummaries;

impl Dataset for WeeklyBusinessSummaries {
    type Record = WeeklyBusinessSummary;
    const KEY: DatasetKey = DatasetKey::WeeklyBusinessSummary;
    const RANGE: &'static str = "WeeklyBusinessSummary!A:C";

    fn parse_row(row: &[String], index: usize) -> Option<WeeklyBusinessSummary> {
        WeeklyBusinessSummary::parse_row(row, index)
    }

    fn sort(records: &mut [WeeklyBusinessSummary]) {
        records.sort_by(|a, b| b.week_id.cmp(&a.week_id));
    }
}

pub struct OppContactLinks;

impl Dataset for OppContactLinks {
    type Record = OppContactLink;
    const KEY: DatasetKey = DatasetKey::OppContactLinks;
    const RANGE: &'static str = "OppContactLinks!A:C";

    fn parse_row(row: &[String], index: usize) -> Option<OppContactLink> {
        OppContactLink::parse_row(row, index)
    }
}

pub struct Announcements;

impl Dataset for Announcements {
    type Record = Announcement;
    const KEY: DatasetKey = DatasetKey::Announcements;
    const RANGE: &'static str = "Announcements!A:G";

    fn parse_row(row: &[String], index: usize) -> Option<Announcement> {
        Announcement::parse_row(row, index)
    }

    /// Pinned announcements first, newest update first within each group
    fn sort(records: &mut [Announcement]) {
        records.sort_by(|a, b| {
            b.is_pinned
                .cmp(&a.is_pinned)
                .then_with(|| b.last_update_time.cmp(&a.last_update_time))
        });
    }
}
