// src/domain/mod.rs
pub mod deletion_plan;
pub mod deletion_request_model;
pub mod erasure_audit_event_model;
pub mod subject;
