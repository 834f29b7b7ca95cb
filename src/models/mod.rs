//! Data models for sql-batch.
//!
//! This module re-exports all model types used throughout the application.

pub mod credentials;
pub mod transaction;

// Re-export commonly used types
pub use credentials::{ConnectionCredentials, ServerEntry};
pub use transaction::Transaction;
