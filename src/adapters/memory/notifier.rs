//! Recording notifier.
//!
//! Captures staff notifications in memory so tests can assert on what was
//! dispatched. Can be switched into a failing mode to exercise the
//! handler's notification failure isolation.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::ports::{EscalationNotification, EscalationNotifier, NotifyError};

/// In-memory implementation of the EscalationNotifier port.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notifications: Arc<Mutex<Vec<EscalationNotification>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    /// Creates a notifier that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent notify call fail.
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    /// Returns the notifications dispatched so far.
    pub fn notifications(&self) -> Vec<EscalationNotification> {
        self.notifications.lock().unwrap().clone()
    }

    /// Returns how many notifications were dispatched.
    pub fn count(&self) -> usize {
        self.notifications.lock().unwrap().len()
    }
}

#[async_trait]
impl EscalationNotifier for RecordingNotifier {
    async fn notify(&self, notification: EscalationNotification) -> Result<(), NotifyError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::DeliveryFailed(
                "notifier configured to fail".to_string(),
            ));
        }
        self.notifications.lock().unwrap().push(notification);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ConversationId;

    #[tokio::test]
    async fn records_notifications() {
        let notifier = RecordingNotifier::new();
        notifier
            .notify(EscalationNotification::new(
                ConversationId::new(),
                "Emergency keywords detected in message",
                10,
            ))
            .await
            .unwrap();

        assert_eq!(notifier.count(), 1);
        assert_eq!(notifier.notifications()[0].priority, 10);
    }

    #[tokio::test]
    async fn failing_mode_rejects_deliveries() {
        let notifier = RecordingNotifier::new();
        notifier.fail_deliveries();

        let result = notifier
            .notify(EscalationNotification::new(ConversationId::new(), "x", 1))
            .await;
        assert!(result.is_err());
        assert_eq!(notifier.count(), 0);
    }
}
