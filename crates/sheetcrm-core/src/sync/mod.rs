//! Cross-client staleness protocol.
//!
//! Writes on any client advance the server's global write clock; every
//! other client runs a [`StalenessPoller`] that periodically compares its
//! snapshot of that clock against the server and prompts for a refresh when
//! it falls behind.

pub mod poller;
pub mod status;

pub use poller::{PollerEvent, PollerState, StalenessPoller};
pub use status::{HttpStatusSource, StatusSource, SystemStatus};
