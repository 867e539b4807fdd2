//! # inkpost-mail
//!
//! Implementations of [`Mailer`](inkpost_core::traits::Mailer): an SMTP
//! relay client built on `lettre` and an in-memory recorder used for
//! development and tests. [`provider::build_mailer`] picks one from
//! configuration.

pub mod address;
pub mod memory;
pub mod provider;
pub mod smtp;

pub use address::normalize_address;
pub use memory::MemoryMailer;
pub use provider::build_mailer;
pub use smtp::SmtpMailer;
