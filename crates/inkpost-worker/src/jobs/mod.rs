//! Built-in job handler implementations.

pub mod digest;
pub mod remind;
pub mod utility;

pub use digest::DigestJobHandler;
pub use remind::RemindJobHandler;
pub use utility::{LogJobHandler, MultiplyJobHandler};

use std::sync::Arc;

use inkpost_core::config::DigestConfig;
use inkpost_core::result::AppResult;
use inkpost_core::traits::mailer::Mailer;

use crate::executor::JobExecutor;
use crate::store::{CategorySource, ReminderStore};

/// Executor with every built-in handler registered.
pub fn build_executor(
    reminders: Arc<dyn ReminderStore>,
    categories: Arc<dyn CategorySource>,
    mailer: Arc<dyn Mailer>,
    sender: &str,
    digest: &DigestConfig,
) -> AppResult<JobExecutor> {
    let mut executor = JobExecutor::new();
    executor.register(Arc::new(RemindJobHandler::new(
        reminders,
        Arc::clone(&mailer),
        sender,
    )));
    executor.register(Arc::new(DigestJobHandler::new(
        categories, mailer, sender, digest,
    )?));
    executor.register(Arc::new(LogJobHandler));
    executor.register(Arc::new(MultiplyJobHandler));
    Ok(executor)
}
