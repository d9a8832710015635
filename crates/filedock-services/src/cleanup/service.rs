use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

use crate::ingest::IngestService;

/// Periodic orphan sweep. Only started when a non-zero interval is configured;
/// the on-demand admin endpoint calls [`IngestService::sweep_orphans`] directly.
#[derive(Clone)]
pub struct OrphanSweepService {
    ingest: Arc<IngestService>,
    period: Duration,
}

impl OrphanSweepService {
    pub fn new(ingest: Arc<IngestService>, period: Duration) -> Self {
        Self { ingest, period }
    }

    /// Start the background sweep loop.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(self.period);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled orphan sweep");

                match self.ingest.sweep_orphans().await {
                    Ok(removed) => {
                        tracing::info!(removed, "Scheduled orphan sweep completed");
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled orphan sweep failed");
                    }
                }
            }
        })
    }
}
