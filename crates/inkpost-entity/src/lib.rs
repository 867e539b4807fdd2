//! # inkpost-entity
//!
//! Domain entity models read and written by the Inkpost worker. Every
//! struct here is either a database table row (deriving `sqlx::FromRow`)
//! or a value object carried in a job payload.

pub mod category;
pub mod job;
pub mod reminder;
