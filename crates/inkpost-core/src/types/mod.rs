//! Core type definitions used across the Inkpost workspace.

pub mod email;
pub mod id;

pub use email::{EmailBody, EmailMessage};
pub use id::*;
