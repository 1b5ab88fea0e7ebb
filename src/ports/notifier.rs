//! Escalation Notifier Port - Staff notification dispatch.
//!
//! Delivery mechanics (email, SMS, webhook, chat) live behind this port;
//! the dialog engine only states that staff must be told, why, and how
//! urgently.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ConversationId, Timestamp};

/// A staff notification request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationNotification {
    /// The conversation needing attention.
    pub conversation_id: ConversationId,
    /// Why staff is being pulled in.
    pub reason: String,
    /// Priority of the triggering rule (higher = more urgent).
    pub priority: i32,
    /// When the escalation fired.
    pub raised_at: Timestamp,
}

impl EscalationNotification {
    /// Creates a notification stamped with the current time.
    pub fn new(conversation_id: ConversationId, reason: impl Into<String>, priority: i32) -> Self {
        Self {
            conversation_id,
            reason: reason.into(),
            priority,
            raised_at: Timestamp::now(),
        }
    }
}

/// Errors raised by notification dispatch.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NotifyError {
    /// No delivery channel accepted the notification.
    #[error("delivery failed: {0}")]
    DeliveryFailed(String),

    /// The notification was rejected before dispatch.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Port for dispatching staff notifications.
#[async_trait]
pub trait EscalationNotifier: Send + Sync {
    /// Notifies staff that a conversation needs attention.
    async fn notify(&self, notification: EscalationNotification) -> Result<(), NotifyError>;
}
