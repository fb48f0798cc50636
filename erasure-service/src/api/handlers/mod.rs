// src/api/handlers/mod.rs
pub mod admin_erasure_handler;
pub mod erasure_handler;
pub mod system_handler;
