//! # inkpost-database
//!
//! PostgreSQL connection management and the concrete repositories backing
//! the job queue, reminders and the digest query.

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
