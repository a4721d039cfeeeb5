//! Client side of the civix civic-engagement app: the REST backend, the persisted session,
//! and the Calendar and Issue pages built on top of them.

use std::sync::Arc;

pub mod api;
pub mod calendar;
pub mod config;
pub mod error;
pub mod issue;
pub mod session;

pub use api::{CivixBackend, HttpBackend, Versioned, MAX_CONFLICT_RETRIES};
pub use calendar::{CalendarPage, EventsFilter, Layout, ListView, Scope};
pub use config::{load_settings, Settings};
pub use error::ClientError;
pub use issue::{parse_item_route, IssuePage, SubmitOutcome};
pub use session::SessionStore;

/// Backend handle shared by every page opened from the same settings.
pub fn connect(settings: &Settings) -> Result<Arc<dyn CivixBackend>, ClientError> {
    Ok(Arc::new(HttpBackend::from_settings(settings)?))
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
