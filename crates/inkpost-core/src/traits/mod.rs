//! Core traits defined in `inkpost-core` and implemented by other crates.

pub mod mailer;

pub use mailer::Mailer;
