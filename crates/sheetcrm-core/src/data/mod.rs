//! Dataset registry and the typed data-access facade.

pub mod datasets;
pub mod store;

pub use datasets::{Dataset, DatasetKey};
pub use store::{CrmStore, NewAnnouncement, NewContact, NewEventLog, NewOpportunity};
