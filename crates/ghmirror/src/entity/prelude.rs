//! Common re-exports for convenient entity usage.

pub use super::entity_kind::EntityKind;
pub use super::issue::{
    ActiveModel as IssueActiveModel, Column as IssueColumn, Entity as Issue, Model as IssueModel,
};
pub use super::issue_comment::{
    ActiveModel as IssueCommentActiveModel, Column as IssueCommentColumn, Entity as IssueComment,
    Model as IssueCommentModel,
};
pub use super::organization::{
    ActiveModel as OrganizationActiveModel, Column as OrganizationColumn,
    Entity as Organization, Model as OrganizationModel,
};
pub use super::pull_request::{
    ActiveModel as PullRequestActiveModel, Column as PullRequestColumn, Entity as PullRequest,
    Model as PullRequestModel,
};
pub use super::pull_request_comment::{
    ActiveModel as PullRequestCommentActiveModel, Column as PullRequestCommentColumn,
    Entity as PullRequestComment, Model as PullRequestCommentModel,
};
pub use super::pull_request_review::{
    ActiveModel as PullRequestReviewActiveModel, Column as PullRequestReviewColumn,
    Entity as PullRequestReview, Model as PullRequestReviewModel,
};
pub use super::repository::{
    ActiveModel as RepositoryActiveModel, Column as RepositoryColumn, Entity as Repository,
    Model as RepositoryModel,
};
pub use super::sync_status::{
    ActiveModel as SyncStatusActiveModel, Column as SyncStatusColumn, Entity as SyncStatus,
    Model as SyncStatusModel,
};
pub use super::user::{
    ActiveModel as UserActiveModel, Column as UserColumn, Entity as User, Model as UserModel,
};
