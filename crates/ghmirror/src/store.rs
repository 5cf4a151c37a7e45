//! Persistence for mirrored GitHub entities.
//!
//! Every kind goes through one generic [`upsert`], driven by the
//! [`MirrorEntity`] mapping for that kind.

mod errors;
mod mirror;
mod query;
mod status;
mod upsert;

pub use errors::{Result, StoreError};
pub use mirror::{MirrorEntity, PullScoped, RepoScoped};
pub use query::{count, find_issue, issue_numbers, pull_request_numbers, stored_repositories};
pub use status::{add_done, add_failed, add_total, ensure_status, status_for_org};
pub use upsert::{UpsertOutcome, upsert};
