//! services/api/src/lib.rs
//!
//! The travel tracker API: persistence and catalog adapters, configuration,
//! and the HTTP/WebSocket surface around the core crate.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
