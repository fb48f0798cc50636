// src/api/mod.rs
use crate::config::AppConfig;
use crate::service::erasure_batch_runner::ErasureBatchRunner;
use crate::service::erasure_lifecycle_service::ErasureLifecycleService;
use std::sync::Arc;

pub mod dto;
pub mod handlers;

/// 統一されたアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub lifecycle: Arc<ErasureLifecycleService>,
    pub batch_runner: Arc<ErasureBatchRunner>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        lifecycle: Arc<ErasureLifecycleService>,
        batch_runner: Arc<ErasureBatchRunner>,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            lifecycle,
            batch_runner,
            config,
        }
    }
}
