// src/middleware/mod.rs

pub mod admin_auth;
