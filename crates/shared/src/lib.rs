//! Shared types and configuration for fxledger.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Currency codes
//! - Pagination types for history queries
//! - Configuration management

pub mod config;
pub mod types;

pub use config::AppConfig;
