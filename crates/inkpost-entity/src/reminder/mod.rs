//! Scheduled reminder entity.

pub mod model;

pub use model::{NewReminder, Reminder};
