// src/service/erasure_lifecycle_service.rs

use crate::config::ErasureConfig;
use crate::domain::deletion_request_model::{
    DeletionRequest, DeletionStatus, NewDeletionRequest, RequestSelector, StatusTransition,
};
use crate::domain::erasure_audit_event_model::{AuditEventKind, ErasureAuditEvent};
use crate::domain::subject::SubjectType;
use crate::error::{AppError, AppResult};
use crate::log_with_context;
use crate::repository::deletion_request_repository::DeletionRequestStore;
use crate::repository::subject_directory::SubjectDirectory;
use crate::service::audit_sink::AuditSink;
use crate::service::notification_gateway::NotificationGateway;
use crate::service::token_issuer::{hash_token, TokenIssuer};
use crate::utils::error_helper::{conflict_error, not_found_error, with_timeout};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub const MAX_REASON_LENGTH: usize = 1000;

#[derive(Debug, Clone, Default)]
pub struct RequestDeletionOptions {
    /// 猶予期間なしで即時実行対象にする（運用者のみ）
    pub skip_grace_period: bool,
    pub reason: Option<String>,
}

/// A freshly created request together with the plaintext tokens. The tokens
/// are not recoverable from the store afterwards.
#[derive(Debug)]
pub struct CreatedDeletionRequest {
    pub request: DeletionRequest,
    pub verification_token: String,
    pub cancellation_token: String,
    /// Background delivery of the verification links.
    pub notification: JoinHandle<()>,
}

/// Request, verify and cancel erasure requests, plus the operator actions.
pub struct ErasureLifecycleService {
    store: Arc<dyn DeletionRequestStore>,
    directory: Arc<dyn SubjectDirectory>,
    notifier: Arc<dyn NotificationGateway>,
    audit: Arc<dyn AuditSink>,
    tokens: TokenIssuer,
    config: ErasureConfig,
}

impl ErasureLifecycleService {
    pub fn new(
        store: Arc<dyn DeletionRequestStore>,
        directory: Arc<dyn SubjectDirectory>,
        notifier: Arc<dyn NotificationGateway>,
        audit: Arc<dyn AuditSink>,
        config: ErasureConfig,
    ) -> Self {
        Self {
            store,
            directory,
            notifier,
            audit,
            tokens: TokenIssuer::new(),
            config,
        }
    }

    pub async fn request_deletion(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        options: RequestDeletionOptions,
    ) -> AppResult<CreatedDeletionRequest> {
        self.request_deletion_at(subject_id, subject_type, options, Utc::now())
            .await
    }

    pub async fn request_deletion_at(
        &self,
        subject_id: Uuid,
        subject_type: SubjectType,
        options: RequestDeletionOptions,
        now: DateTime<Utc>,
    ) -> AppResult<CreatedDeletionRequest> {
        let reason = options
            .reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        if reason
            .as_ref()
            .is_some_and(|r| r.chars().count() > MAX_REASON_LENGTH)
        {
            return Err(AppError::ValidationError(format!(
                "reason: must be at most {} characters",
                MAX_REASON_LENGTH
            )));
        }

        let exists = with_timeout(
            self.config.db_timeout(),
            "subject lookup",
            self.directory.subject_exists(subject_id, subject_type),
        )
        .await?;
        if !exists {
            return Err(AppError::SubjectNotFound {
                subject_id,
                subject_type,
            });
        }

        let open = with_timeout(
            self.config.db_timeout(),
            "open request lookup",
            self.store.find_active_by_subject(subject_id),
        )
        .await?;
        if open.is_some() {
            return Err(AppError::DuplicateRequest(subject_id));
        }

        let issued = self.tokens.issue_pair();
        let scheduled_deletion_at = if options.skip_grace_period {
            now
        } else {
            now + self.config.grace_period()
        };

        // 同時作成はストアの一意制約で弾かれる
        let request = with_timeout(
            self.config.db_timeout(),
            "deletion request insert",
            self.store.insert(NewDeletionRequest {
                subject_id,
                subject_type,
                requested_at: now,
                scheduled_deletion_at,
                verification_token_hash: issued.verification_token_hash,
                cancellation_token_hash: issued.cancellation_token_hash,
                reason,
            }),
        )
        .await?;

        log_with_context!(
            tracing::Level::INFO,
            "Deletion request created",
            "request_id" => request.id,
            "subject_id" => subject_id,
            "subject_type" => subject_type,
            "scheduled_deletion_at" => request.scheduled_deletion_at,
            "skip_grace_period" => options.skip_grace_period
        );

        self.record_audit(
            ErasureAuditEvent::for_request(&request, AuditEventKind::Requested, now).with_details(
                json!({
                    "scheduled_deletion_at": request.scheduled_deletion_at,
                    "skip_grace_period": options.skip_grace_period,
                }),
            ),
        )
        .await;

        let notification = self.dispatch_notification(
            &request,
            issued.verification_token.clone(),
            issued.cancellation_token.clone(),
        );

        Ok(CreatedDeletionRequest {
            request,
            verification_token: issued.verification_token,
            cancellation_token: issued.cancellation_token,
            notification,
        })
    }

    /// Sends the links on a separate task. Delivery problems are logged and
    /// audited; they never affect the request.
    fn dispatch_notification(
        &self,
        request: &DeletionRequest,
        verify_token: String,
        cancel_token: String,
    ) -> JoinHandle<()> {
        let notifier = Arc::clone(&self.notifier);
        let audit = Arc::clone(&self.audit);
        let limit = self.config.notification_timeout();
        let failure_event =
            ErasureAuditEvent::for_request(request, AuditEventKind::NotificationFailed, Utc::now());
        let subject_id = request.subject_id;
        let subject_type = request.subject_type;

        tokio::spawn(async move {
            let outcome = tokio::time::timeout(
                limit,
                notifier.send_verification_links(subject_id, subject_type, &verify_token, &cancel_token),
            )
            .await;

            let error = match outcome {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e.to_string(),
                Err(_) => format!("timed out after {}s", limit.as_secs()),
            };

            log_with_context!(
                tracing::Level::WARN,
                "Failed to deliver erasure verification links",
                "request_id" => failure_event.request_id,
                "subject_id" => subject_id,
                "error" => &error
            );

            let event = ErasureAuditEvent {
                occurred_at: Utc::now(),
                ..failure_event
            }
            .with_details(json!({ "error": error }));
            if let Err(e) = audit.record(event).await {
                log_with_context!(
                    tracing::Level::ERROR,
                    "Failed to record audit event",
                    "kind" => AuditEventKind::NotificationFailed,
                    "error" => e.to_string()
                );
            }
        })
    }

    pub async fn verify_deletion(&self, token: &str) -> AppResult<DeletionRequest> {
        self.verify_deletion_at(token, Utc::now()).await
    }

    /// pending_verification → verified. Unknown, used or late tokens all map
    /// to `InvalidToken` and leave every request untouched.
    pub async fn verify_deletion_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DeletionRequest> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }

        let request = with_timeout(
            self.config.db_timeout(),
            "verify transition",
            self.store.apply(
                RequestSelector::VerificationTokenHash(hash_token(token)),
                StatusTransition::verify(now),
            ),
        )
        .await?
        .ok_or(AppError::InvalidToken)?;

        log_with_context!(
            tracing::Level::INFO,
            "Deletion request verified",
            "request_id" => request.id,
            "subject_id" => request.subject_id,
            "scheduled_deletion_at" => request.scheduled_deletion_at
        );
        self.record_audit(ErasureAuditEvent::for_request(
            &request,
            AuditEventKind::Verified,
            now,
        ))
        .await;

        Ok(request)
    }

    pub async fn cancel_deletion(&self, token: &str) -> AppResult<DeletionRequest> {
        self.cancel_deletion_at(token, Utc::now()).await
    }

    /// pending_verification | verified → cancelled. Once a request has been
    /// claimed its cancellation token no longer matches anything.
    pub async fn cancel_deletion_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> AppResult<DeletionRequest> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AppError::InvalidToken);
        }

        let request = with_timeout(
            self.config.db_timeout(),
            "cancel transition",
            self.store.apply(
                RequestSelector::CancellationTokenHash(hash_token(token)),
                StatusTransition::cancel(now),
            ),
        )
        .await?
        .ok_or(AppError::InvalidToken)?;

        log_with_context!(
            tracing::Level::INFO,
            "Deletion request cancelled",
            "request_id" => request.id,
            "subject_id" => request.subject_id
        );
        self.record_audit(ErasureAuditEvent::for_request(
            &request,
            AuditEventKind::Cancelled,
            now,
        ))
        .await;

        Ok(request)
    }

    /// Operator re-queue: failed → verified, due immediately.
    pub async fn requeue_failed(
        &self,
        request_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<DeletionRequest> {
        let current = self
            .find_request(request_id)
            .await?
            .ok_or_else(|| {
                not_found_error("Deletion request", &request_id.to_string(), "requeue_failed")
            })?;

        if current.status != DeletionStatus::Failed {
            return Err(conflict_error(
                &format!(
                    "Only failed requests can be re-queued (current status: {})",
                    current.status
                ),
                "requeue_failed",
            ));
        }

        let open = with_timeout(
            self.config.db_timeout(),
            "open request lookup",
            self.store.find_active_by_subject(current.subject_id),
        )
        .await?;
        if open.is_some() {
            return Err(AppError::DuplicateRequest(current.subject_id));
        }

        let request = with_timeout(
            self.config.db_timeout(),
            "requeue transition",
            self.store
                .apply(RequestSelector::Id(request_id), StatusTransition::requeue(now)),
        )
        .await?
        .ok_or_else(|| conflict_error("Request changed status concurrently", "requeue_failed"))?;

        log_with_context!(
            tracing::Level::INFO,
            "Failed deletion request re-queued",
            "request_id" => request.id,
            "subject_id" => request.subject_id,
            "attempts" => request.attempts
        );
        self.record_audit(
            ErasureAuditEvent::for_request(&request, AuditEventKind::Requeued, now)
                .with_details(json!({ "previous_error": current.last_error })),
        )
        .await;

        Ok(request)
    }

    /// Returns requests stranded in `processing` past the stale threshold to
    /// `verified` so the next batch picks them up again.
    pub async fn recover_stale(&self, now: DateTime<Utc>) -> AppResult<Vec<DeletionRequest>> {
        let claimed_before = now - self.config.stale_threshold();
        let stale = with_timeout(
            self.config.db_timeout(),
            "stale request lookup",
            self.store.find_stale_processing(claimed_before),
        )
        .await?;

        let mut recovered = Vec::with_capacity(stale.len());
        for request in stale {
            let released = with_timeout(
                self.config.db_timeout(),
                "stale release transition",
                self.store.apply(
                    RequestSelector::Id(request.id),
                    StatusTransition::release_stale(now, claimed_before),
                ),
            )
            .await;

            match released {
                Ok(Some(request)) => {
                    log_with_context!(
                        tracing::Level::WARN,
                        "Stale processing request returned to verified",
                        "request_id" => request.id,
                        "subject_id" => request.subject_id,
                        "attempts" => request.attempts
                    );
                    self.record_audit(
                        ErasureAuditEvent::for_request(
                            &request,
                            AuditEventKind::StaleRecovered,
                            now,
                        )
                        .with_details(json!({ "claimed_before": claimed_before })),
                    )
                    .await;
                    recovered.push(request);
                }
                // 既に完了・失敗に遷移済み
                Ok(None) => {}
                Err(e) => {
                    log_with_context!(
                        tracing::Level::ERROR,
                        "Failed to release stale request",
                        "request_id" => request.id,
                        "error" => e.to_string()
                    );
                }
            }
        }

        Ok(recovered)
    }

    pub async fn get_request(&self, request_id: Uuid) -> AppResult<DeletionRequest> {
        self.find_request(request_id).await?.ok_or_else(|| {
            not_found_error("Deletion request", &request_id.to_string(), "get_request")
        })
    }

    async fn find_request(&self, request_id: Uuid) -> AppResult<Option<DeletionRequest>> {
        with_timeout(
            self.config.db_timeout(),
            "deletion request lookup",
            self.store.find_by_id(request_id),
        )
        .await
    }

    async fn record_audit(&self, event: ErasureAuditEvent) {
        let kind = event.kind;
        if let Err(e) = self.audit.record(event).await {
            log_with_context!(
                tracing::Level::ERROR,
                "Failed to record audit event",
                "kind" => kind,
                "error" => e.to_string()
            );
        }
    }
}
