//! Mail transport trait.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::types::email::EmailMessage;

/// Trait for outbound mail transports (SMTP relay, in-memory recorder).
///
/// A failed send returns an [`ErrorKind::ExternalService`] error; callers
/// decide whether that is worth a retry.
///
/// [`ErrorKind::ExternalService`]: crate::error::ErrorKind::ExternalService
#[async_trait]
pub trait Mailer: Send + Sync + std::fmt::Debug + 'static {
    /// Deliver a single message.
    async fn send(&self, message: &EmailMessage) -> AppResult<()>;

    /// Short transport name for logs.
    fn name(&self) -> &str;
}
