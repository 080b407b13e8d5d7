//! Paperless-ngx REST API access.
//!
//! Two endpoints are polled: `/api/statistics/` for document totals and
//! `/api/tasks/` for background consumer tasks. [`PaperlessApi`] combines both
//! into a [`Snapshot`] per poll cycle.

mod error;
mod fetch;
mod models;
mod stats;

pub use error::FetchError;
pub use fetch::fetch_json;
pub use models::{MimeTypeCount, RemoteSummary, RemoteTask};
pub use stats::{
    status_histogram, PaperlessApi, Snapshot, StatusHistogram, STATISTICS_PATH, TASKS_PATH,
};
