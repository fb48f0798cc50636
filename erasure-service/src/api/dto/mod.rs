// src/api/dto/mod.rs
pub mod erasure_dto;
