//! Dialog module - the conversation dialog engine.
//!
//! Decides how each inbound guest message moves a conversation forward:
//! hybrid intent classification, a guarded state machine, and a
//! priority-ordered escalation rule engine.

mod classifier;
mod context;
mod conversation;
mod escalation;
mod intent;
mod keywords;
mod message;
mod state;
mod state_machine;

pub use classifier::{ClassifierConfig, ClassifierContext, IntentClassifier};
pub use context::{DialogContext, INTENT_HISTORY_CAP};
pub use conversation::Conversation;
pub use escalation::{
    EscalationRule, EscalationRuleEngine, EscalationTrigger, RuleCondition,
};
pub use intent::{Intent, IntentClassification, IntentRecord, URGENCY_MAX, URGENCY_MIN};
pub use keywords::KeywordLexicon;
pub use message::{DialogMessage, MessageSender};
pub use state::{ConversationStatus, DialogState};
pub use state_machine::{
    ActionHook, DialogStateMachine, Guard, TransitionResult, TransitionRule,
};
