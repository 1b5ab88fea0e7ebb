//! Messages exchanged within a conversation.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{MessageId, Timestamp};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSender {
    /// The hotel guest.
    Guest,
    /// A human staff member.
    Staff,
    /// The automated assistant.
    Assistant,
}

/// A single message in a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DialogMessage {
    /// Unique ID of this message.
    pub id: MessageId,
    /// Who sent it.
    pub sender: MessageSender,
    /// Message text.
    pub content: String,
    /// When the message was created.
    pub created_at: Timestamp,
}

impl DialogMessage {
    /// Creates a guest message stamped with the current time.
    pub fn guest(content: impl Into<String>) -> Self {
        Self::new(MessageSender::Guest, content)
    }

    /// Creates a staff message stamped with the current time.
    pub fn staff(content: impl Into<String>) -> Self {
        Self::new(MessageSender::Staff, content)
    }

    /// Creates an assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageSender::Assistant, content)
    }

    fn new(sender: MessageSender, content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            sender,
            content: content.into(),
            created_at: Timestamp::now(),
        }
    }

    /// Returns true if the guest authored this message.
    pub fn is_from_guest(&self) -> bool {
        self.sender == MessageSender::Guest
    }
}
