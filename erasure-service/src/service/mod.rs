// src/service/mod.rs
pub mod audit_sink;
pub mod cascade_executor;
pub mod erasure_batch_runner;
pub mod erasure_lifecycle_service;
pub mod erasure_scheduler;
pub mod notification_gateway;
pub mod token_issuer;
