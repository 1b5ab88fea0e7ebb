//! In-memory conversation store.
//!
//! Backs the ConversationStore port with HashMaps behind an RwLock. `save`
//! replaces the stored conversation wholesale, which gives the handler its
//! commit-or-rollback boundary: nothing mid-flight is visible until save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::domain::dialog::{Conversation, DialogMessage};
use crate::domain::foundation::{ConversationId, DomainError, ErrorCode, GuestId, HotelId};
use crate::ports::ConversationStore;

#[derive(Default)]
struct StoreState {
    conversations: HashMap<ConversationId, Conversation>,
    active_index: HashMap<(HotelId, GuestId), ConversationId>,
    messages: HashMap<ConversationId, Vec<DialogMessage>>,
}

/// In-memory implementation of the ConversationStore port.
#[derive(Clone, Default)]
pub struct InMemoryConversationStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryConversationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a conversation, making it the active one for its guest pair.
    pub fn seed(&self, conversation: Conversation) {
        let mut state = self.state.write().expect("store lock poisoned");
        state.active_index.insert(
            (conversation.hotel_id(), conversation.guest_id()),
            conversation.id(),
        );
        state.conversations.insert(conversation.id(), conversation);
    }

    /// Returns a conversation by ID, if present.
    pub fn get(&self, conversation_id: ConversationId) -> Option<Conversation> {
        self.state
            .read()
            .expect("store lock poisoned")
            .conversations
            .get(&conversation_id)
            .cloned()
    }

    /// Returns all messages stored for a conversation.
    pub fn messages(&self, conversation_id: ConversationId) -> Vec<DialogMessage> {
        self.state
            .read()
            .expect("store lock poisoned")
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get_or_create_active(
        &self,
        hotel_id: HotelId,
        guest_id: GuestId,
    ) -> Result<Conversation, DomainError> {
        let mut state = self.state.write().expect("store lock poisoned");

        if let Some(id) = state.active_index.get(&(hotel_id, guest_id)).copied() {
            if let Some(conversation) = state.conversations.get(&id) {
                if conversation.is_open() {
                    return Ok(conversation.clone());
                }
            }
        }

        let conversation = Conversation::new(hotel_id, guest_id);
        state
            .active_index
            .insert((hotel_id, guest_id), conversation.id());
        state
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(conversation)
    }

    async fn load_recent_messages(
        &self,
        conversation_id: ConversationId,
        limit: usize,
    ) -> Result<Vec<DialogMessage>, DomainError> {
        let state = self.state.read().expect("store lock poisoned");
        let messages = state
            .messages
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }

    async fn append_message(
        &self,
        conversation_id: ConversationId,
        message: DialogMessage,
    ) -> Result<(), DomainError> {
        let mut state = self.state.write().expect("store lock poisoned");
        if !state.conversations.contains_key(&conversation_id) {
            return Err(DomainError::new(
                ErrorCode::ConversationNotFound,
                format!("Conversation {} not found", conversation_id),
            ));
        }
        state
            .messages
            .entry(conversation_id)
            .or_default()
            .push(message);
        Ok(())
    }

    async fn save(&self, conversation: &Conversation) -> Result<(), DomainError> {
        let mut state = self.state.write().expect("store lock poisoned");
        state
            .conversations
            .insert(conversation.id(), conversation.clone());
        Ok(())
    }
}
