use thiserror::Error;

use crate::github::GitHubError;
use crate::queue::{JobDecodeError, QueueError};
use crate::shutdown::Cancelled;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Decode(#[from] JobDecodeError),

    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

impl SyncError {
    /// True when the error came from a shutdown request rather than a
    /// failed fetch or write.
    pub fn is_cancelled(&self) -> bool {
        matches!(
            self,
            SyncError::Cancelled(_) | SyncError::GitHub(GitHubError::Cancelled(_))
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_recognised_through_github_errors() {
        assert!(SyncError::from(Cancelled).is_cancelled());
        assert!(SyncError::from(GitHubError::from(Cancelled)).is_cancelled());
        assert!(!SyncError::from(GitHubError::NotFound("/x".into())).is_cancelled());
    }
}
