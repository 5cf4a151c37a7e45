use ghmirror::sync::SyncProgress;

/// Logging reporter using tracing for structured output.
pub struct LoggingReporter;

impl LoggingReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, event: SyncProgress) {
        match event {
            SyncProgress::ListingStarted { parent, kind } => {
                tracing::debug!(parent = %parent, %kind, "Listing");
            }

            SyncProgress::PagePublished {
                parent,
                kind,
                page,
                count,
            } => {
                tracing::debug!(parent = %parent, %kind, page, count, "Published page");
            }

            SyncProgress::ListingComplete {
                parent,
                kind,
                published,
            } => {
                tracing::info!(parent = %parent, %kind, published, "Listing complete");
            }

            SyncProgress::ListingFailed {
                parent,
                kind,
                error,
            } => {
                tracing::warn!(parent = %parent, %kind, error = %error, "Listing failed");
            }

            SyncProgress::JobSynced { kind, identity } => {
                tracing::debug!(%kind, identity = %identity, "Synced");
            }

            SyncProgress::JobFailed {
                kind,
                identity,
                error,
            } => {
                tracing::warn!(%kind, identity = %identity, error = %error, "Sync failed");
            }

            SyncProgress::JobUndecodable { error } => {
                tracing::warn!(error = %error, "Dropped undecodable job");
            }

            SyncProgress::InlineSynced {
                parent,
                kind,
                upserted,
                failed,
            } => {
                if failed > 0 {
                    tracing::warn!(parent = %parent, %kind, upserted, failed, "Synced with errors");
                } else {
                    tracing::debug!(parent = %parent, %kind, upserted, "Synced inline");
                }
            }

            SyncProgress::Warning { message } => {
                tracing::warn!("{}", message);
            }

            _ => {
                tracing::trace!("Unhandled progress event");
            }
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
