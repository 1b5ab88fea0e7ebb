//! Dialog states and conversation status.
//!
//! `DialogState` tracks where a conversation sits in the guided flow;
//! `ConversationStatus` is the coarser lifecycle derived from it.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::StateMachine;

/// Where the conversation sits in the guided dialog flow.
///
/// Conversations progress Greeting → CollectingInfo → ProcessingRequest →
/// WaitingResponse, with Escalated and Completed reachable from every
/// non-terminal state. WaitingResponse can loop back to CollectingInfo when
/// the guest supplies more information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DialogState {
    /// First contact, nothing gathered yet.
    #[default]
    Greeting,

    /// Gathering the details needed to act on the request.
    CollectingInfo,

    /// Request understood, being worked.
    ProcessingRequest,

    /// Waiting for the guest to confirm or respond.
    WaitingResponse,

    /// Staff has been pulled in; the automated flow is paused.
    Escalated,

    /// Conversation finished. Terminal.
    Completed,
}

impl DialogState {
    /// Returns true if the automated dialog still owns this conversation.
    pub fn is_automated(&self) -> bool {
        !matches!(self, Self::Escalated | Self::Completed)
    }

    /// Returns true once the conversation has reached a resting state.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Escalated | Self::Completed)
    }
}

impl StateMachine for DialogState {
    fn can_transition_to(&self, target: &Self) -> bool {
        use DialogState::*;
        matches!(
            (self, target),
            // Normal forward flow
            (Greeting, CollectingInfo) |
            (CollectingInfo, ProcessingRequest) |
            (ProcessingRequest, WaitingResponse) |
            // Guest supplies more information after a staff reply
            (WaitingResponse, CollectingInfo) |
            // Escalation is reachable from every non-terminal state
            (Greeting, Escalated) |
            (CollectingInfo, Escalated) |
            (ProcessingRequest, Escalated) |
            (WaitingResponse, Escalated) |
            // Completion is reachable from every non-terminal state
            (Greeting, Completed) |
            (CollectingInfo, Completed) |
            (ProcessingRequest, Completed) |
            (WaitingResponse, Completed) |
            // Staff resolves an escalated conversation
            (Escalated, Completed)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use DialogState::*;
        match self {
            Greeting => vec![CollectingInfo, Escalated, Completed],
            CollectingInfo => vec![ProcessingRequest, Escalated, Completed],
            ProcessingRequest => vec![WaitingResponse, Escalated, Completed],
            WaitingResponse => vec![CollectingInfo, Escalated, Completed],
            Escalated => vec![Completed],
            Completed => vec![],
        }
    }
}

/// Coarse lifecycle of a conversation.
///
/// Status is derived from the dialog state: reaching Escalated forces
/// Escalated, reaching Completed forces Closed. The derivation never runs
/// in reverse; Closed → Archived is the only manual move this core makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Open and handled by the automated dialog.
    #[default]
    Active,

    /// Staff attention required.
    Escalated,

    /// Finished; kept for lookups until archived.
    Closed,

    /// Removed from active lookups.
    Archived,
}

impl ConversationStatus {
    /// Returns the status a dialog state forces, if any.
    pub fn derived_from(state: DialogState) -> Option<Self> {
        match state {
            DialogState::Escalated => Some(ConversationStatus::Escalated),
            DialogState::Completed => Some(ConversationStatus::Closed),
            _ => None,
        }
    }

    /// Returns true if new inbound messages attach to this conversation.
    pub fn accepts_messages(&self) -> bool {
        matches!(self, Self::Active | Self::Escalated)
    }
}
