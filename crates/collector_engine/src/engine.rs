use std::sync::Arc;
use std::time::Duration;

use collector_logging::{collector_info, collector_warn};
use futures_util::future::join_all;
use tokio_util::sync::CancellationToken;

use crate::{CredentialSource, PassReport, SyncOrchestrator};

/// Polls every group of a realm, one round at a time.
pub struct Engine {
    orchestrator: SyncOrchestrator,
    credentials: Arc<dyn CredentialSource>,
    realm: String,
    cancel: CancellationToken,
}

impl Engine {
    pub fn new(
        orchestrator: SyncOrchestrator,
        credentials: Arc<dyn CredentialSource>,
        realm: impl Into<String>,
    ) -> Self {
        Self {
            orchestrator,
            credentials,
            realm: realm.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Token that stops the engine at the next job boundary when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Runs one pass for every group concurrently and returns their reports in group order.
    pub async fn run_round(&self) -> Vec<PassReport> {
        let groups = self.credentials.groups(&self.realm);
        if groups.is_empty() {
            collector_warn!("No groups configured for realm={}", self.realm);
            return Vec::new();
        }
        let passes = groups
            .iter()
            .map(|group| self.orchestrator.run_pass(group, &self.cancel));
        join_all(passes).await
    }

    /// Runs rounds every `interval` until cancelled. Returns the number of rounds started.
    pub async fn run_until_cancelled(&self, interval: Duration) -> u64 {
        let mut round = 0;
        while !self.cancel.is_cancelled() {
            round += 1;
            collector_logging::set_round(round);
            let reports = self.run_round().await;
            collector_info!("Round finished groups={}", reports.len());

            tokio::select! {
                _ = self.cancel.cancelled() => {}
                _ = tokio::time::sleep(interval) => {}
            }
        }
        collector_info!("Stopping after {} rounds", round);
        round
    }
}
