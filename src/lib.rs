//! Taskly - mood-aware task tracking with a small blog
//!
//! This library provides the storage, services and HTTP API; `main.rs`
//! wires them to a listener.

pub mod api;
pub mod cache;
pub mod config;
pub mod db;
pub mod models;
pub mod services;
