//! Conversation Store Port - Persistence interface for conversations.
//!
//! Storage mechanics (schema, transactions, tenancy) belong to the adapter;
//! the dialog engine only needs these four operations. The engine mutates a
//! working copy and persists via `save` as its final step, so an adapter
//! that applies `save` atomically gives the whole handling pass
//! commit-or-rollback semantics.

use async_trait::async_trait;

use crate::domain::dialog::{Conversation, DialogMessage};
use crate::domain::foundation::{ConversationId, DomainError, GuestId, HotelId};

/// Port for conversation persistence.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns the guest's active conversation for a hotel, creating one in
    /// the Greeting state if none exists.
    async fn get_or_create_active(
        &self,
        hotel_id: HotelId,
        guest_id: GuestId,
    ) -> Result<Conversation, DomainError>;

    /// Loads the most recent messages of a conversation, oldest first.
    async fn load_recent_messages(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<DialogMessage>, DomainError>;

    /// Appends a message to a conversation.
    async fn append_message(
        &self,
        conversation_id: ConversationId,
        message: DialogMessage,
    ) -> Result<(), DomainError>;

    /// Persists the conversation (state, status, context, timestamps).
    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError>;
}
