//! Repository implementations for the entities the worker touches.

pub mod category;
pub mod job;
pub mod reminder;

pub use category::CategoryRepository;
pub use job::JobRepository;
pub use reminder::ReminderRepository;
