//! Message delivery abstraction

use async_trait::async_trait;

use crate::error::NewsError;

/// Delivers an already formatted digest message.
///
/// `Ok(())` means the endpoint acknowledged the message; only then may the
/// caller advance its seen-set.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NewsError>;
}
