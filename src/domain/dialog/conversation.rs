//! Conversation entity - one guest↔hotel dialog.

use crate::domain::foundation::{
    ConversationId, DomainError, ErrorCode, GuestId, HotelId, Timestamp,
};

use super::context::DialogContext;
use super::state::{ConversationStatus, DialogState};

/// A guest↔hotel dialog.
///
/// Created lazily on the first inbound message for a guest+hotel pair when
/// no active conversation exists. The dialog state only changes through the
/// registered transition table; status derives from state and is never
/// reversed automatically.
#[derive(Debug, Clone)]
pub struct Conversation {
    id: ConversationId,
    hotel_id: HotelId,
    guest_id: GuestId,
    status: ConversationStatus,
    current_state: DialogState,
    context: DialogContext,
    created_at: Timestamp,
    updated_at: Timestamp,
    last_message_at: Timestamp,
}

impl Conversation {
    /// Creates a new conversation in the Greeting state.
    pub fn new(hotel_id: HotelId, guest_id: GuestId) -> Self {
        let now = Timestamp::now();
        Self {
            id: ConversationId::new(),
            hotel_id,
            guest_id,
            status: ConversationStatus::Active,
            current_state: DialogState::Greeting,
            context: DialogContext::new(),
            created_at: now,
            updated_at: now,
            last_message_at: now,
        }
    }

    /// Reconstitutes a conversation from persistence.
    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: ConversationId,
        hotel_id: HotelId,
        guest_id: GuestId,
        status: ConversationStatus,
        current_state: DialogState,
        context: DialogContext,
        created_at: Timestamp,
        updated_at: Timestamp,
        last_message_at: Timestamp,
    ) -> Self {
        Self {
            id,
            hotel_id,
            guest_id,
            status,
            current_state,
            context,
            created_at,
            updated_at,
            last_message_at,
        }
    }

    // === Accessors ===

    pub fn id(&self) -> ConversationId {
        self.id
    }

    pub fn hotel_id(&self) -> HotelId {
        self.hotel_id
    }

    pub fn guest_id(&self) -> GuestId {
        self.guest_id
    }

    pub fn status(&self) -> ConversationStatus {
        self.status
    }

    pub fn current_state(&self) -> DialogState {
        self.current_state
    }

    pub fn context(&self) -> &DialogContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut DialogContext {
        &mut self.context
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn updated_at(&self) -> Timestamp {
        self.updated_at
    }

    pub fn last_message_at(&self) -> Timestamp {
        self.last_message_at
    }

    /// Returns true while the conversation still accepts guest messages.
    pub fn is_open(&self) -> bool {
        self.status.accepts_messages()
    }

    // === Mutations ===

    /// Records that an inbound message arrived now.
    pub fn record_inbound_message(&mut self) {
        let now = Timestamp::now();
        self.last_message_at = now;
        self.updated_at = now;
        self.context.last_message_at = Some(now);
    }

    /// Applies a transition that the state machine has already validated.
    ///
    /// Sets the state, derives the status, and refreshes timestamps. Only
    /// the dialog state machine calls this; everything else goes through
    /// `DialogStateMachine::transition_to`.
    pub(super) fn apply_transition(&mut self, target: DialogState) {
        self.current_state = target;
        if let Some(status) = ConversationStatus::derived_from(target) {
            self.status = status;
        }
        let now = Timestamp::now();
        self.last_message_at = now;
        self.updated_at = now;
    }

    /// Merges context gathered during message handling into the stored
    /// conversation memory.
    pub fn merge_context(&mut self, context: DialogContext) {
        self.context.merge(context);
        self.updated_at = Timestamp::now();
    }

    /// Archives a closed conversation.
    ///
    /// The only manual status move this core performs; everything else is
    /// derived from dialog state.
    pub fn archive(&mut self) -> Result<(), DomainError> {
        if self.status != ConversationStatus::Closed {
            return Err(DomainError::new(
                ErrorCode::InvalidStateTransition,
                format!("Cannot archive a {:?} conversation", self.status),
            ));
        }
        self.status = ConversationStatus::Archived;
        self.updated_at = Timestamp::now();
        Ok(())
    }
}
