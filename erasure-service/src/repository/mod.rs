// src/repository/mod.rs
pub mod deletion_request_repository;
pub mod erasure_audit_event_repository;
pub mod in_memory_deletion_request_store;
pub mod in_memory_marketplace_records;
pub mod marketplace_record_repository;
pub mod purge_backend;
pub mod subject_directory;
