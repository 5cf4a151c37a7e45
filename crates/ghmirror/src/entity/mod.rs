//! SeaORM entity definitions for the mirror schema.

pub mod entity_kind;
pub mod issue;
pub mod issue_comment;
pub mod organization;
pub mod prelude;
pub mod pull_request;
pub mod pull_request_comment;
pub mod pull_request_review;
pub mod repository;
pub mod sync_status;
pub mod user;
