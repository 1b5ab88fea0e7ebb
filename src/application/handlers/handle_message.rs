//! HandleMessage command handler.
//!
//! Orchestrates one inbound guest message end to end: classify, suggest and
//! apply a state transition, compute side-effect actions, dispatch staff
//! notifications, merge classification results into conversation memory,
//! and persist. `handle` never fails to its caller; every internal error
//! becomes a `success = false` outcome.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, error, info, warn};

use crate::domain::dialog::{
    ClassifierContext, Conversation, DialogContext, DialogMessage, DialogState,
    DialogStateMachine, EscalationRuleEngine, Intent, IntentClassification, IntentClassifier,
    IntentRecord, TransitionResult,
};
use crate::domain::foundation::{DomainError, GuestId, HotelId};
use crate::ports::{AIProvider, ConversationStore, EscalationNotification, EscalationNotifier};

/// Reason recorded when the emergency path escalates a conversation.
const EMERGENCY_REASON: &str = "Emergency detected in message";

/// Priority used when the emergency path fires without a matching rule.
const EMERGENCY_PRIORITY: i32 = 10;

/// Command to handle one inbound guest message.
#[derive(Debug, Clone)]
pub struct HandleMessageCommand {
    /// The hotel the guest is messaging.
    pub hotel_id: HotelId,
    /// The guest sending the message.
    pub guest_id: GuestId,
    /// Raw message text.
    pub content: String,
}

impl HandleMessageCommand {
    /// Creates a new command.
    pub fn new(hotel_id: HotelId, guest_id: GuestId, content: impl Into<String>) -> Self {
        Self {
            hotel_id,
            guest_id,
            content: content.into(),
        }
    }
}

/// Side-effect actions recorded while handling a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionTaken {
    /// The conversation was escalated on the emergency path.
    EmergencyEscalation,
    /// Message urgency was 4 or higher.
    HighPriorityFlagged,
    /// Message sentiment was below -0.5.
    NegativeSentimentDetected,
    /// The repeated-request counter reached its threshold.
    RepeatRequestEscalation,
    /// A staff notification was dispatched.
    StaffNotified,
}

impl std::fmt::Display for ActionTaken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ActionTaken::EmergencyEscalation => "emergency_escalation",
            ActionTaken::HighPriorityFlagged => "high_priority_flagged",
            ActionTaken::NegativeSentimentDetected => "negative_sentiment_detected",
            ActionTaken::RepeatRequestEscalation => "repeat_request_escalation",
            ActionTaken::StaffNotified => "staff_notified",
        };
        write!(f, "{}", s)
    }
}

/// Outcome of handling one message. Failure is reported, never raised.
#[derive(Debug)]
pub struct HandleMessageOutcome {
    /// Whether the message was fully handled and persisted.
    pub success: bool,
    /// The conversation after handling (absent on early failure).
    pub conversation: Option<Conversation>,
    /// The classification result for this message.
    pub intent: Option<IntentClassification>,
    /// The state transition that was attempted, if any.
    pub state_transition: Option<TransitionResult>,
    /// Side-effect actions that fired, in order.
    pub actions_taken: Vec<ActionTaken>,
    /// Error description when `success` is false.
    pub error: Option<String>,
}

impl HandleMessageOutcome {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            conversation: None,
            intent: None,
            state_transition: None,
            actions_taken: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Transition-suggestion triggers, evaluated in this fixed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    SentimentNegative,
    KeywordDetected,
    SatisfactionConfirmed,
    InfoComplete,
    MessageReceived,
    Timeout,
}

impl TransitionTrigger {
    /// Fixed evaluation order; the first trigger with an applicable guarded
    /// edge wins.
    pub const ORDER: [TransitionTrigger; 6] = [
        TransitionTrigger::SentimentNegative,
        TransitionTrigger::KeywordDetected,
        TransitionTrigger::SatisfactionConfirmed,
        TransitionTrigger::InfoComplete,
        TransitionTrigger::MessageReceived,
        TransitionTrigger::Timeout,
    ];

    /// The state this trigger would move the conversation to, if any.
    pub fn candidate_target(&self, from: DialogState) -> Option<DialogState> {
        use DialogState::*;
        match self {
            TransitionTrigger::SentimentNegative | TransitionTrigger::KeywordDetected => {
                match from {
                    Greeting | CollectingInfo | ProcessingRequest | WaitingResponse => {
                        Some(Escalated)
                    }
                    _ => None,
                }
            }
            TransitionTrigger::SatisfactionConfirmed => match from {
                Greeting | CollectingInfo | ProcessingRequest | WaitingResponse => Some(Completed),
                _ => None,
            },
            TransitionTrigger::InfoComplete => {
                (from == CollectingInfo).then_some(ProcessingRequest)
            }
            TransitionTrigger::MessageReceived => match from {
                Greeting => Some(CollectingInfo),
                ProcessingRequest => Some(WaitingResponse),
                WaitingResponse => Some(CollectingInfo),
                _ => None,
            },
            TransitionTrigger::Timeout => (from == WaitingResponse).then_some(Escalated),
        }
    }
}

impl std::fmt::Display for TransitionTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TransitionTrigger::SentimentNegative => "sentiment_negative",
            TransitionTrigger::KeywordDetected => "keyword_detected",
            TransitionTrigger::SatisfactionConfirmed => "satisfaction_confirmed",
            TransitionTrigger::InfoComplete => "info_complete",
            TransitionTrigger::MessageReceived => "message_received",
            TransitionTrigger::Timeout => "timeout",
        };
        write!(f, "{}", s)
    }
}

/// Handler tuning knobs.
#[derive(Debug, Clone)]
pub struct HandlerConfig {
    /// How many recent messages to load as classifier context.
    pub recent_message_limit: usize,
    /// Repeated-request count at which the escalation flag fires.
    pub repeat_escalation_threshold: u32,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            recent_message_limit: 5,
            repeat_escalation_threshold: 3,
        }
    }
}

/// Per-conversation serialization.
///
/// State-machine mutation and context merges are not safe under concurrent
/// writers, so handling is serialized per guest+hotel pair; different pairs
/// run fully in parallel.
#[derive(Default)]
struct ConversationLocks {
    inner: StdMutex<HashMap<(HotelId, GuestId), Arc<AsyncMutex<()>>>>,
}

impl ConversationLocks {
    fn acquire(&self, hotel_id: HotelId, guest_id: GuestId) -> Arc<AsyncMutex<()>> {
        let mut map = self.inner.lock().expect("conversation lock map poisoned");
        map.entry((hotel_id, guest_id))
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

/// Handler for inbound guest messages.
pub struct MessageHandler<S, A, N>
where
    S: ConversationStore,
    A: AIProvider,
    N: EscalationNotifier,
{
    store: Arc<S>,
    classifier: IntentClassifier<A>,
    state_machine: Arc<DialogStateMachine>,
    escalation: Arc<EscalationRuleEngine>,
    notifier: Arc<N>,
    locks: ConversationLocks,
    config: HandlerConfig,
}

impl<S, A, N> MessageHandler<S, A, N>
where
    S: ConversationStore + 'static,
    A: AIProvider + 'static,
    N: EscalationNotifier + 'static,
{
    /// Creates a handler with the given collaborators.
    pub fn new(
        store: Arc<S>,
        classifier: IntentClassifier<A>,
        state_machine: Arc<DialogStateMachine>,
        escalation: Arc<EscalationRuleEngine>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            store,
            classifier,
            state_machine,
            escalation,
            notifier,
            locks: ConversationLocks::default(),
            config: HandlerConfig::default(),
        }
    }

    /// Overrides the handler configuration.
    pub fn with_config(mut self, config: HandlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the escalation rule engine (rules are runtime-toggleable).
    pub fn escalation_engine(&self) -> &EscalationRuleEngine {
        &self.escalation
    }

    /// Handles one inbound guest message.
    ///
    /// Never fails to the caller: any internal error yields an outcome with
    /// `success = false` and `error` populated. Handling is serialized per
    /// conversation; the store is only written as the final step, so a
    /// failure mid-flight leaves the persisted conversation unchanged.
    pub async fn handle(&self, command: HandleMessageCommand) -> HandleMessageOutcome {
        if command.content.trim().is_empty() {
            return HandleMessageOutcome::failure("message content cannot be empty");
        }

        let lock = self.locks.acquire(command.hotel_id, command.guest_id);
        let _guard = lock.lock().await;

        match self.process(&command).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(
                    hotel_id = %command.hotel_id,
                    guest_id = %command.guest_id,
                    error = %err,
                    "Message handling failed"
                );
                HandleMessageOutcome::failure(err.to_string())
            }
        }
    }

    async fn process(
        &self,
        command: &HandleMessageCommand,
    ) -> Result<HandleMessageOutcome, DomainError> {
        // 1-2. Load or lazily create the active conversation and stamp the
        // inbound message time on the working copy.
        let mut conversation = self
            .store
            .get_or_create_active(command.hotel_id, command.guest_id)
            .await?;
        conversation.record_inbound_message();

        // 3. Classify with current state, stored context, and recent history.
        let recent = self
            .store
            .load_recent_messages(conversation.id(), self.config.recent_message_limit)
            .await?;
        let classification = self
            .classifier
            .classify(
                &command.content,
                &ClassifierContext {
                    state: conversation.current_state(),
                    recent_messages: &recent,
                    dialog: conversation.context(),
                },
            )
            .await;

        debug!(
            conversation_id = %conversation.id(),
            intent = %classification.intent,
            confidence = classification.confidence,
            urgency = classification.urgency_level,
            "Message classified"
        );

        // Evaluation context for guards and rules: stored memory plus what
        // this message just told us.
        let mut eval_ctx = conversation.context().clone();
        eval_ctx.message_content = Some(command.content.clone());
        eval_ctx.last_intent = Some(classification.intent);
        eval_ctx.last_confidence = Some(classification.confidence);
        eval_ctx.urgency_level = Some(classification.urgency_level);
        if let Some(score) = classification.sentiment_score {
            eval_ctx.sentiment_score = Some(score);
        }
        eval_ctx.current_state = Some(conversation.current_state());

        let mut actions = Vec::new();

        // 4-5. Emergency path transitions straight to Escalated; otherwise
        // the trigger list suggests the next state.
        let state_transition = if classification.is_emergency() {
            let result = self.state_machine.transition_to(
                &mut conversation,
                DialogState::Escalated,
                &eval_ctx,
                EMERGENCY_REASON,
            );
            if result.success {
                actions.push(ActionTaken::EmergencyEscalation);
            }
            Some(result)
        } else {
            self.suggest_transition(&conversation, &eval_ctx)
                .map(|(trigger, target)| {
                    self.state_machine.transition_to(
                        &mut conversation,
                        target,
                        &eval_ctx,
                        &format!("Triggered by {}", trigger),
                    )
                })
        };

        // A successful transition already merged the evaluation context;
        // otherwise fold it in here so memory still reflects this message.
        let transitioned = state_transition
            .as_ref()
            .map(|r| r.success)
            .unwrap_or(false);
        if !transitioned {
            conversation.merge_context(eval_ctx);
        }

        // 6. Side-effect actions from intent/urgency/sentiment.
        if classification.urgency_level >= 4 {
            actions.push(ActionTaken::HighPriorityFlagged);
        }
        if classification
            .sentiment_score
            .map(|s| s < -0.5)
            .unwrap_or(false)
        {
            actions.push(ActionTaken::NegativeSentimentDetected);
        }
        if classification.intent.counts_as_repeat_request() {
            let count = conversation.context_mut().increment_repeat_count();
            if count >= self.config.repeat_escalation_threshold {
                actions.push(ActionTaken::RepeatRequestEscalation);
            }
        }

        // 7. Merge classification results into conversation memory.
        {
            let context = conversation.context_mut();
            context.last_intent = Some(classification.intent);
            context.last_confidence = Some(classification.confidence);
            if let Some(score) = classification.sentiment_score {
                context.sentiment_score = Some(score);
            }
            context.urgency_level = Some(classification.urgency_level);
            context
                .entities
                .extend(classification.entities.clone());
            context.record_intent(IntentRecord::new(
                classification.intent,
                classification.confidence,
            ));
        }

        // Escalation dispatch: the rule engine decides whether staff must
        // be alerted, independent of whether the state moved.
        if self.dispatch_escalation(&conversation, &classification).await {
            actions.push(ActionTaken::StaffNotified);
        }

        // 8. Persist as the final step.
        self.store
            .append_message(conversation.id(), DialogMessage::guest(&command.content))
            .await?;
        self.store.save(&conversation).await?;

        Ok(HandleMessageOutcome {
            success: true,
            conversation: Some(conversation),
            intent: Some(classification),
            state_transition,
            actions_taken: actions,
            error: None,
        })
    }

    /// Walks the trigger list in fixed order and returns the first trigger
    /// whose candidate edge is registered and guard-approved.
    fn suggest_transition(
        &self,
        conversation: &Conversation,
        context: &DialogContext,
    ) -> Option<(TransitionTrigger, DialogState)> {
        let current = conversation.current_state();
        for trigger in TransitionTrigger::ORDER {
            let Some(target) = trigger.candidate_target(current) else {
                continue;
            };
            if target == current {
                continue;
            }
            if self.state_machine.can_transition(conversation, target, context) {
                return Some((trigger, target));
            }
        }
        None
    }

    /// Evaluates the escalation rules and notifies staff when one triggers.
    ///
    /// Returns true when a notification was dispatched. Notifier failures
    /// are logged, never propagated.
    async fn dispatch_escalation(
        &self,
        conversation: &Conversation,
        classification: &IntentClassification,
    ) -> bool {
        let mut rule_ctx = conversation.context().clone();
        rule_ctx.current_state = Some(conversation.current_state());

        let triggered = self.escalation.evaluate(&rule_ctx);
        let (reason, priority) = match triggered.first() {
            Some(top) => (top.description().to_string(), top.priority()),
            None if classification.intent == Intent::Emergency => {
                (EMERGENCY_REASON.to_string(), EMERGENCY_PRIORITY)
            }
            None => return false,
        };

        info!(
            conversation_id = %conversation.id(),
            reason = %reason,
            priority,
            "Escalation triggered, notifying staff"
        );

        match self
            .notifier
            .notify(EscalationNotification::new(
                conversation.id(),
                reason,
                priority,
            ))
            .await
        {
            Ok(()) => true,
            Err(err) => {
                warn!(
                    conversation_id = %conversation.id(),
                    error = %err,
                    "Staff notification failed"
                );
                false
            }
        }
    }
}
