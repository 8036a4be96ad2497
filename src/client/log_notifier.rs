use crate::domain::EmailAddress;

use super::notifier::{Notification, Notifier, NotifyError};

/// Stands in for email delivery outside production by dumping the
/// notification into the application log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait::async_trait]
impl Notifier for LogNotifier {
    async fn send(
        &self,
        recipient: &EmailAddress,
        notification: &Notification,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            recipient = %recipient,
            subject = %notification.subject(),
            template = notification.template_id(),
            context = %notification.context(),
            "Email delivery disabled, logging notification instead"
        );
        Ok(())
    }
}
