//! Dialog state machine.
//!
//! Owns the registered transition table: each `(from, to)` edge carries an
//! optional guard predicate and an optional action hook. A transition that
//! is not registered is rejected outright; a guard or action failure leaves
//! the conversation untouched and is reported, never raised.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::foundation::{DomainError, Timestamp};

use super::context::DialogContext;
use super::conversation::Conversation;
use super::keywords::KeywordLexicon;
use super::state::DialogState;

/// Predicate deciding whether an edge applies for a given context.
pub type Guard = Box<dyn Fn(&DialogContext) -> bool + Send + Sync>;

/// Side-effect hook run while a transition is being applied.
///
/// Hooks run against a staged copy of the conversation; an `Err` aborts the
/// transition with no visible mutation.
pub type ActionHook = Box<dyn Fn(&mut Conversation, &DialogContext) -> Result<(), DomainError> + Send + Sync>;

/// A registered edge in the transition table.
pub struct TransitionRule {
    guard: Option<Guard>,
    action: Option<ActionHook>,
    description: String,
}

impl TransitionRule {
    /// Creates an always-applicable rule with no side effects.
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            guard: None,
            action: None,
            description: description.into(),
        }
    }

    /// Attaches a guard predicate.
    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    /// Attaches an action hook.
    pub fn with_action(mut self, action: ActionHook) -> Self {
        self.action = Some(action);
        self
    }

    /// Returns the human-readable description of this edge.
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl std::fmt::Debug for TransitionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionRule")
            .field("description", &self.description)
            .field("has_guard", &self.guard.is_some())
            .field("has_action", &self.action.is_some())
            .finish()
    }
}

/// Outcome of a transition attempt. Failure is reported, not raised.
#[derive(Debug, Clone)]
pub struct TransitionResult {
    /// Whether the transition was applied.
    pub success: bool,
    /// State before the attempt.
    pub previous_state: DialogState,
    /// State after the attempt (unchanged on failure).
    pub new_state: DialogState,
    /// When the attempt was made.
    pub timestamp: Timestamp,
    /// Human-readable description of what happened.
    pub message: String,
}

impl TransitionResult {
    fn applied(previous: DialogState, new: DialogState, message: impl Into<String>) -> Self {
        Self {
            success: true,
            previous_state: previous,
            new_state: new,
            timestamp: Timestamp::now(),
            message: message.into(),
        }
    }

    fn rejected(state: DialogState, message: impl Into<String>) -> Self {
        Self {
            success: false,
            previous_state: state,
            new_state: state,
            timestamp: Timestamp::now(),
            message: message.into(),
        }
    }
}

/// The dialog state machine with its guarded transition table.
pub struct DialogStateMachine {
    edges: HashMap<(DialogState, DialogState), TransitionRule>,
    lexicon: Arc<KeywordLexicon>,
}

impl DialogStateMachine {
    /// Creates a machine with the default transition table.
    pub fn new(lexicon: Arc<KeywordLexicon>) -> Self {
        let mut machine = Self {
            edges: HashMap::new(),
            lexicon,
        };
        machine.register_default_rules();
        machine
    }

    /// Creates a machine with an empty table (for tests and custom flows).
    pub fn empty(lexicon: Arc<KeywordLexicon>) -> Self {
        Self {
            edges: HashMap::new(),
            lexicon,
        }
    }

    /// Registers (or replaces) an edge in the table.
    pub fn register(&mut self, from: DialogState, to: DialogState, rule: TransitionRule) {
        self.edges.insert((from, to), rule);
    }

    /// Returns true if a registered edge exists and its guard passes.
    pub fn can_transition(
        &self,
        conversation: &Conversation,
        target: DialogState,
        context: &DialogContext,
    ) -> bool {
        match self.edges.get(&(conversation.current_state(), target)) {
            Some(rule) => rule.guard.as_ref().map_or(true, |guard| guard(context)),
            None => false,
        }
    }

    /// Attempts a transition.
    ///
    /// On success the edge's action hook runs, the state is set, the status
    /// is derived, `last_message_at` is refreshed, and `context` is merged
    /// into the conversation memory. On any failure the conversation is
    /// left exactly as it was.
    pub fn transition_to(
        &self,
        conversation: &mut Conversation,
        target: DialogState,
        context: &DialogContext,
        reason: &str,
    ) -> TransitionResult {
        let current = conversation.current_state();

        let rule = match self.edges.get(&(current, target)) {
            Some(rule) => rule,
            None => {
                debug!(
                    conversation_id = %conversation.id(),
                    from = ?current,
                    to = ?target,
                    "No registered transition"
                );
                return TransitionResult::rejected(
                    current,
                    format!("No transition registered from {:?} to {:?}", current, target),
                );
            }
        };

        if let Some(guard) = &rule.guard {
            if !guard(context) {
                debug!(
                    conversation_id = %conversation.id(),
                    from = ?current,
                    to = ?target,
                    "Transition guard rejected"
                );
                return TransitionResult::rejected(
                    current,
                    format!(
                        "Guard rejected transition from {:?} to {:?} ({})",
                        current, target, rule.description
                    ),
                );
            }
        }

        // Stage the mutation so a failing action hook leaves no trace.
        let mut staged = conversation.clone();
        if let Some(action) = &rule.action {
            if let Err(err) = action(&mut staged, context) {
                warn!(
                    conversation_id = %conversation.id(),
                    from = ?current,
                    to = ?target,
                    error = %err,
                    "Transition action failed"
                );
                return TransitionResult::rejected(
                    current,
                    format!(
                        "Action failed during transition from {:?} to {:?}: {}",
                        current, target, err
                    ),
                );
            }
        }

        staged.apply_transition(target);
        staged.merge_context(context.clone());
        *conversation = staged;

        TransitionResult::applied(
            current,
            target,
            format!("Transitioned from {:?} to {:?}: {}", current, target, reason),
        )
    }

    /// Builds the default transition table.
    ///
    /// Guard semantics: sentiment comparisons are strict (`< -0.5`), so a
    /// score of exactly -0.5 never escalates on sentiment alone.
    fn register_default_rules(&mut self) {
        use DialogState::*;

        // Forward flow
        self.register(
            Greeting,
            CollectingInfo,
            TransitionRule::new("Guest engaged, start collecting request details"),
        );
        self.register(
            CollectingInfo,
            ProcessingRequest,
            TransitionRule::new("All required information collected")
                .with_guard(Box::new(|ctx| ctx.has_all_required_info())),
        );
        self.register(
            ProcessingRequest,
            WaitingResponse,
            TransitionRule::new("Request dispatched, awaiting guest confirmation"),
        );
        self.register(
            WaitingResponse,
            CollectingInfo,
            TransitionRule::new("Guest supplied more information"),
        );

        // Completion
        self.register(
            ProcessingRequest,
            Completed,
            TransitionRule::new("Request resolved during processing")
                .with_guard(Box::new(|ctx| ctx.request_resolved)),
        );
        self.register(
            Escalated,
            Completed,
            TransitionRule::new("Staff resolved the escalated request")
                .with_guard(Box::new(|ctx| ctx.request_resolved)),
        );
        for from in [Greeting, CollectingInfo, WaitingResponse] {
            let lexicon = Arc::clone(&self.lexicon);
            self.register(
                from,
                Completed,
                TransitionRule::new("Guest confirmed satisfaction").with_guard(Box::new(
                    move |ctx| {
                        ctx.message_content
                            .as_deref()
                            .map(|text| lexicon.has_satisfaction_keyword(text))
                            .unwrap_or(false)
                    },
                )),
            );
        }

        // Escalation
        let lexicon = Arc::clone(&self.lexicon);
        self.register(
            Greeting,
            Escalated,
            TransitionRule::new("Distress detected at first contact")
                .with_guard(Box::new(move |ctx| {
                    has_negative_sentiment(ctx)
                        || is_emergency_classified(ctx)
                        || ctx
                            .message_content
                            .as_deref()
                            .map(|text| lexicon.has_emergency_keyword(text))
                            .unwrap_or(false)
                }))
                .with_action(Box::new(record_escalation)),
        );
        for from in [CollectingInfo, ProcessingRequest, WaitingResponse] {
            let lexicon = Arc::clone(&self.lexicon);
            self.register(
                from,
                Escalated,
                TransitionRule::new("Negative sentiment, escalation keyword, or repeated requests")
                    .with_guard(Box::new(move |ctx| {
                        has_negative_sentiment(ctx)
                            || is_emergency_classified(ctx)
                            || ctx
                                .message_content
                                .as_deref()
                                .map(|text| {
                                    lexicon.has_escalation_keyword(text)
                                        || lexicon.has_emergency_keyword(text)
                                })
                                .unwrap_or(false)
                            || ctx.repeat_count >= 3
                    }))
                    .with_action(Box::new(record_escalation)),
            );
        }
    }
}

/// Strict comparison: exactly -0.5 does not count as negative.
fn has_negative_sentiment(ctx: &DialogContext) -> bool {
    ctx.sentiment_score.map(|s| s < -0.5).unwrap_or(false)
}

/// An AI-detected emergency escalates even without a lexicon keyword hit.
fn is_emergency_classified(ctx: &DialogContext) -> bool {
    ctx.last_intent == Some(super::intent::Intent::Emergency)
}

/// Stamps the escalation time into the conversation's side-channel memory.
fn record_escalation(conversation: &mut Conversation, _ctx: &DialogContext) -> Result<(), DomainError> {
    conversation.context_mut().extra.insert(
        "escalated_at".to_string(),
        serde_json::Value::String(Timestamp::now().to_string()),
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{ConversationId, ErrorCode, GuestId, HotelId, StateMachine};
    use crate::domain::dialog::state::ConversationStatus;

    fn machine() -> DialogStateMachine {
        DialogStateMachine::new(Arc::new(KeywordLexicon::default()))
    }

    fn conversation_in(state: DialogState) -> Conversation {
        let now = Timestamp::now();
        Conversation::reconstitute(
            ConversationId::new(),
            HotelId::new(),
            GuestId::new(),
            ConversationStatus::Active,
            state,
            DialogContext::new(),
            now,
            now,
            now,
        )
    }

    mod edge_registry {
        use super::*;

        #[test]
        fn unregistered_transition_is_rejected() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::Greeting);
            let result = machine.transition_to(
                &mut conversation,
                DialogState::WaitingResponse,
                &DialogContext::new(),
                "skip ahead",
            );
            assert!(!result.success);
            assert_eq!(conversation.current_state(), DialogState::Greeting);
            assert!(result.message.contains("No transition registered"));
        }

        #[test]
        fn unguarded_edge_always_applies() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::Greeting);
            let result = machine.transition_to(
                &mut conversation,
                DialogState::CollectingInfo,
                &DialogContext::new(),
                "first message",
            );
            assert!(result.success);
            assert_eq!(result.previous_state, DialogState::Greeting);
            assert_eq!(result.new_state, DialogState::CollectingInfo);
            assert_eq!(conversation.current_state(), DialogState::CollectingInfo);
        }

        #[test]
        fn result_reports_states_on_failure_without_mutation() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::CollectingInfo);
            let result = machine.transition_to(
                &mut conversation,
                DialogState::ProcessingRequest,
                &DialogContext::new(),
                "no fields yet",
            );
            assert!(!result.success);
            assert_eq!(result.previous_state, DialogState::CollectingInfo);
            assert_eq!(result.new_state, DialogState::CollectingInfo);
        }
    }

    mod guards {
        use super::*;
        use serde_json::json;

        #[test]
        fn info_complete_guard_promotes_to_processing() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::CollectingInfo);
            let mut ctx = DialogContext {
                required_fields: vec!["room_number".into()],
                ..Default::default()
            };
            ctx.collect("room_number", json!("214"));

            assert!(machine.can_transition(&conversation, DialogState::ProcessingRequest, &ctx));
            let result = machine.transition_to(
                &mut conversation,
                DialogState::ProcessingRequest,
                &ctx,
                "details complete",
            );
            assert!(result.success);
        }

        #[test]
        fn sentiment_exactly_at_threshold_does_not_escalate() {
            let machine = machine();
            let conversation = conversation_in(DialogState::CollectingInfo);
            let ctx = DialogContext {
                sentiment_score: Some(-0.5),
                ..Default::default()
            };
            assert!(!machine.can_transition(&conversation, DialogState::Escalated, &ctx));
        }

        #[test]
        fn sentiment_below_threshold_escalates_from_any_working_state() {
            let machine = machine();
            let ctx = DialogContext {
                sentiment_score: Some(-0.51),
                ..Default::default()
            };
            for state in [
                DialogState::Greeting,
                DialogState::CollectingInfo,
                DialogState::ProcessingRequest,
                DialogState::WaitingResponse,
            ] {
                let conversation = conversation_in(state);
                assert!(
                    machine.can_transition(&conversation, DialogState::Escalated, &ctx),
                    "expected escalation from {:?}",
                    state
                );
            }
        }

        #[test]
        fn escalation_keyword_escalates_from_collecting() {
            let machine = machine();
            let conversation = conversation_in(DialogState::CollectingInfo);
            let ctx = DialogContext {
                message_content: Some("I demand to speak to your manager".into()),
                ..Default::default()
            };
            assert!(machine.can_transition(&conversation, DialogState::Escalated, &ctx));
        }

        #[test]
        fn repeat_count_of_three_escalates() {
            let machine = machine();
            let conversation = conversation_in(DialogState::ProcessingRequest);

            let calm = DialogContext {
                repeat_count: 2,
                ..Default::default()
            };
            assert!(!machine.can_transition(&conversation, DialogState::Escalated, &calm));

            let repeated = DialogContext {
                repeat_count: 3,
                ..Default::default()
            };
            assert!(machine.can_transition(&conversation, DialogState::Escalated, &repeated));
        }

        #[test]
        fn satisfaction_keyword_completes_waiting_response() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::WaitingResponse);
            let ctx = DialogContext {
                message_content: Some("Thank you, all fixed!".into()),
                ..Default::default()
            };
            let result = machine.transition_to(
                &mut conversation,
                DialogState::Completed,
                &ctx,
                "guest satisfied",
            );
            assert!(result.success);
            assert_eq!(conversation.status(), ConversationStatus::Closed);
        }

        #[test]
        fn request_resolved_completes_processing() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::ProcessingRequest);
            let ctx = DialogContext {
                request_resolved: true,
                ..Default::default()
            };
            let result = machine.transition_to(
                &mut conversation,
                DialogState::Completed,
                &ctx,
                "done",
            );
            assert!(result.success);
        }

        #[test]
        fn escalated_completes_only_when_resolved() {
            let machine = machine();
            let conversation = conversation_in(DialogState::Escalated);
            assert!(!machine.can_transition(
                &conversation,
                DialogState::Completed,
                &DialogContext::new()
            ));

            let resolved = DialogContext {
                request_resolved: true,
                ..Default::default()
            };
            assert!(machine.can_transition(&conversation, DialogState::Completed, &resolved));
        }
    }

    mod side_effects {
        use super::*;

        #[test]
        fn successful_transition_merges_context() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::Greeting);
            let ctx = DialogContext {
                sentiment_score: Some(0.6),
                message_content: Some("hi, quick question".into()),
                ..Default::default()
            };
            machine.transition_to(&mut conversation, DialogState::CollectingInfo, &ctx, "msg");
            assert_eq!(conversation.context().sentiment_score, Some(0.6));
            assert_eq!(
                conversation.context().message_content.as_deref(),
                Some("hi, quick question")
            );
        }

        #[test]
        fn escalation_transition_derives_status_and_stamps_context() {
            let machine = machine();
            let mut conversation = conversation_in(DialogState::CollectingInfo);
            let ctx = DialogContext {
                sentiment_score: Some(-0.9),
                ..Default::default()
            };
            let result =
                machine.transition_to(&mut conversation, DialogState::Escalated, &ctx, "angry");
            assert!(result.success);
            assert_eq!(conversation.status(), ConversationStatus::Escalated);
            assert!(conversation.context().extra.contains_key("escalated_at"));
        }

        #[test]
        fn failing_action_hook_leaves_conversation_unchanged() {
            let lexicon = Arc::new(KeywordLexicon::default());
            let mut machine = DialogStateMachine::empty(lexicon);
            machine.register(
                DialogState::Greeting,
                DialogState::CollectingInfo,
                TransitionRule::new("always fails").with_action(Box::new(|conversation, _| {
                    conversation.context_mut().repeat_count = 99;
                    Err(DomainError::new(ErrorCode::InternalError, "hook exploded"))
                })),
            );

            let mut conversation = conversation_in(DialogState::Greeting);
            let result = machine.transition_to(
                &mut conversation,
                DialogState::CollectingInfo,
                &DialogContext::new(),
                "msg",
            );

            assert!(!result.success);
            assert!(result.message.contains("hook exploded"));
            assert_eq!(conversation.current_state(), DialogState::Greeting);
            // The staged mutation from the hook must not leak.
            assert_eq!(conversation.context().repeat_count, 0);
        }
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arbitrary_state() -> impl Strategy<Value = DialogState> {
            prop_oneof![
                Just(DialogState::Greeting),
                Just(DialogState::CollectingInfo),
                Just(DialogState::ProcessingRequest),
                Just(DialogState::WaitingResponse),
                Just(DialogState::Escalated),
                Just(DialogState::Completed),
            ]
        }

        proptest! {
            /// Whatever sequence of targets is attempted, the conversation
            /// only ever sits in a defined state, and every applied
            /// transition corresponds to a registered enum-level edge.
            #[test]
            fn state_stays_within_the_defined_set(targets in prop::collection::vec(arbitrary_state(), 1..20)) {
                let machine = machine();
                let mut conversation = conversation_in(DialogState::Greeting);
                let ctx = DialogContext {
                    sentiment_score: Some(-0.9),
                    request_resolved: true,
                    ..Default::default()
                };

                for target in targets {
                    let before = conversation.current_state();
                    let result = machine.transition_to(&mut conversation, target, &ctx, "prop");
                    if result.success {
                        prop_assert!(before.can_transition_to(&target));
                        prop_assert_eq!(conversation.current_state(), target);
                    } else {
                        prop_assert_eq!(conversation.current_state(), before);
                    }
                }
            }
        }
    }
}
