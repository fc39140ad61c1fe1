//! services/api/src/adapters/notify.rs
//!
//! Delivers password-reset links by writing them to the service log.
//! Stands in for a mail gateway; it implements the `NotificationService` port.

use async_trait::async_trait;
use tracing::info;
use travel_tracker_core::ports::{NotificationService, PortResult};

#[derive(Clone, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationService for LogNotifier {
    async fn send_password_reset(&self, email: &str, link: &str) -> PortResult<()> {
        info!(%email, %link, "Password reset requested");
        Ok(())
    }
}
