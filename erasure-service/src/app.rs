// src/app.rs

//! Service wiring for both store backends and the HTTP router.

use crate::api::handlers::admin_erasure_handler::admin_erasure_router;
use crate::api::handlers::erasure_handler::erasure_router;
use crate::api::handlers::system_handler::system_router;
use crate::api::AppState;
use crate::config::{AppConfig, NotificationConfig};
use crate::db::DbPool;
use crate::logging::{inject_request_context, logging_middleware};
use crate::repository::deletion_request_repository::{
    DeletionRequestRepository, DeletionRequestStore,
};
use crate::repository::erasure_audit_event_repository::ErasureAuditEventRepository;
use crate::repository::in_memory_deletion_request_store::InMemoryDeletionRequestStore;
use crate::repository::in_memory_marketplace_records::InMemoryMarketplaceRecords;
use crate::repository::marketplace_record_repository::MarketplaceRecordRepository;
use crate::repository::purge_backend::PurgeBackend;
use crate::repository::subject_directory::SubjectDirectory;
use crate::service::audit_sink::{AuditSink, DbAuditSink, TracingAuditSink};
use crate::service::cascade_executor::CascadeExecutor;
use crate::service::erasure_batch_runner::ErasureBatchRunner;
use crate::service::erasure_lifecycle_service::ErasureLifecycleService;
use crate::service::erasure_scheduler::ErasureScheduler;
use crate::service::notification_gateway::{
    LoggingNotificationGateway, NotificationError, NotificationGateway, SmtpNotificationGateway,
};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// The collaborators the erasure services are built from.
#[derive(Clone)]
pub struct ErasureComponents {
    pub store: Arc<dyn DeletionRequestStore>,
    pub purge_backend: Arc<dyn PurgeBackend>,
    pub directory: Arc<dyn SubjectDirectory>,
    pub notifier: Arc<dyn NotificationGateway>,
    pub audit: Arc<dyn AuditSink>,
}

impl ErasureComponents {
    /// PostgreSQL の永続化を使う構成
    pub fn postgres(db: DbPool, config: &AppConfig) -> Result<Self, NotificationError> {
        let records = Arc::new(MarketplaceRecordRepository::new(db.clone()));
        let directory: Arc<dyn SubjectDirectory> = records.clone();

        Ok(Self {
            store: Arc::new(DeletionRequestRepository::new(db.clone())),
            purge_backend: records,
            notifier: notification_gateway(&config.notification, Arc::clone(&directory))?,
            directory,
            audit: Arc::new(DbAuditSink::new(Arc::new(ErasureAuditEventRepository::new(
                db,
            )))),
        })
    }

    /// プロセス内メモリのみで動く構成
    pub fn in_memory(
        records: Arc<InMemoryMarketplaceRecords>,
        config: &AppConfig,
    ) -> Result<Self, NotificationError> {
        let directory: Arc<dyn SubjectDirectory> = records.clone();

        Ok(Self {
            store: Arc::new(InMemoryDeletionRequestStore::new()),
            purge_backend: records,
            notifier: notification_gateway(&config.notification, Arc::clone(&directory))?,
            directory,
            audit: Arc::new(TracingAuditSink),
        })
    }
}

fn notification_gateway(
    config: &NotificationConfig,
    directory: Arc<dyn SubjectDirectory>,
) -> Result<Arc<dyn NotificationGateway>, NotificationError> {
    if config.development_mode {
        return Ok(Arc::new(LoggingNotificationGateway::new(
            config.link_base_url.clone(),
        )));
    }
    Ok(Arc::new(SmtpNotificationGateway::new(config, directory)?))
}

pub fn build_state(components: ErasureComponents, config: Arc<AppConfig>) -> AppState {
    let erasure = config.erasure.clone();

    let lifecycle = Arc::new(ErasureLifecycleService::new(
        Arc::clone(&components.store),
        components.directory,
        components.notifier,
        Arc::clone(&components.audit),
        erasure.clone(),
    ));
    let executor = CascadeExecutor::new(components.purge_backend, erasure.db_timeout());
    let batch_runner = Arc::new(ErasureBatchRunner::new(
        components.store,
        executor,
        components.audit,
        erasure,
    ));

    AppState::new(lifecycle, batch_runner, config)
}

pub fn build_scheduler(state: &AppState) -> ErasureScheduler {
    ErasureScheduler::new(
        Arc::clone(&state.lifecycle),
        Arc::clone(&state.batch_runner),
        state.config.erasure.batch_interval(),
    )
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(system_router(state.clone()))
        .merge(erasure_router(state.clone()))
        .merge(admin_erasure_router(state))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(inject_request_context))
        .layer(TraceLayer::new_for_http())
}
