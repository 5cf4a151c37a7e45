//! Progress events emitted by producers and workers.
//!
//! The library never prints; the CLI subscribes with a [`ProgressCallback`]
//! and renders events as it sees fit.

use crate::entity::entity_kind::EntityKind;

/// Progress events emitted during producing and consuming.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SyncProgress {
    /// Starting to list children of a parent.
    ListingStarted {
        /// `org`, `owner/repo`, or `owner/repo#number`.
        parent: String,
        kind: EntityKind,
    },

    /// Published the jobs for one page of a listing.
    PagePublished {
        parent: String,
        kind: EntityKind,
        /// Page number (1-indexed).
        page: u32,
        /// Jobs published from this page.
        count: usize,
    },

    /// Finished listing children of a parent.
    ListingComplete {
        parent: String,
        kind: EntityKind,
        /// Total jobs published for this parent.
        published: u64,
    },

    /// Listing a parent failed; jobs already published stay queued.
    ListingFailed {
        parent: String,
        kind: EntityKind,
        error: String,
    },

    /// A job was fetched and stored.
    JobSynced { kind: EntityKind, identity: String },

    /// A job failed and was dropped.
    JobFailed {
        kind: EntityKind,
        identity: String,
        error: String,
    },

    /// A payload could not be decoded and was dropped.
    JobUndecodable { error: String },

    /// Finished an inline (queue-less) listing.
    InlineSynced {
        parent: String,
        kind: EntityKind,
        upserted: u64,
        failed: u64,
    },

    /// Warning message (non-fatal).
    Warning { message: String },
}

/// Callback for progress updates.
pub type ProgressCallback = Box<dyn Fn(SyncProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: SyncProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            SyncProgress::ListingComplete {
                parent: "acme".to_string(),
                kind: EntityKind::Repository,
                published: 10,
            },
        );
        emit(
            Some(&callback),
            SyncProgress::JobSynced {
                kind: EntityKind::User,
                identity: "octo".to_string(),
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            SyncProgress::Warning {
                message: "nobody listening".to_string(),
            },
        );
    }

    #[test]
    fn test_sync_progress_debug() {
        let event = SyncProgress::PagePublished {
            parent: "acme/widgets".to_string(),
            kind: EntityKind::Issue,
            page: 2,
            count: 100,
        };

        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("PagePublished"));
        assert!(debug_str.contains("acme/widgets"));
    }
}
