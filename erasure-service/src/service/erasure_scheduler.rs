// src/service/erasure_scheduler.rs

use crate::log_with_context;
use crate::service::erasure_batch_runner::ErasureBatchRunner;
use crate::service::erasure_lifecycle_service::ErasureLifecycleService;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Recurring job: stale recovery followed by one erasure batch per tick.
pub struct ErasureScheduler {
    lifecycle: Arc<ErasureLifecycleService>,
    batch_runner: Arc<ErasureBatchRunner>,
    interval: Duration,
}

impl ErasureScheduler {
    pub fn new(
        lifecycle: Arc<ErasureLifecycleService>,
        batch_runner: Arc<ErasureBatchRunner>,
        interval: Duration,
    ) -> Self {
        Self {
            lifecycle,
            batch_runner,
            interval,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            // 処理が長引いた場合は溜まったティックを捨てる
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            log_with_context!(
                tracing::Level::INFO,
                "Erasure scheduler started",
                "interval_secs" => self.interval.as_secs()
            );

            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }

    pub async fn run_once(&self) {
        match self.lifecycle.recover_stale(Utc::now()).await {
            Ok(recovered) if !recovered.is_empty() => {
                log_with_context!(
                    tracing::Level::WARN,
                    "Recovered stale deletion requests",
                    "count" => recovered.len()
                );
            }
            Ok(_) => {}
            Err(e) => {
                log_with_context!(
                    tracing::Level::ERROR,
                    "Stale recovery failed",
                    "error" => e.to_string()
                );
            }
        }

        if let Err(e) = self
            .batch_runner
            .execute_pending_deletions(Utc::now())
            .await
        {
            log_with_context!(
                tracing::Level::ERROR,
                "Erasure batch failed",
                "error" => e.to_string()
            );
        }
    }
}
