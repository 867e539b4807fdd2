//! # inkpost-core
//!
//! Core crate for Inkpost, the background delivery side of the blog.
//! Contains configuration schemas, typed identifiers, the outbound email
//! type with its [`Mailer`](traits::mailer::Mailer) seam, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Inkpost crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::AppError;
pub use result::AppResult;
