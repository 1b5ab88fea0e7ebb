//! Escalation rule engine.
//!
//! Decides whether a conversation needs staff attention. Rules live on the
//! engine instance (not in module-level state), are kept sorted by
//! descending priority, and can be toggled at runtime. A rule whose
//! condition fails to evaluate is treated as non-triggering and logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::warn;

use crate::domain::foundation::{DomainError, ErrorCode, Timestamp};

use super::context::DialogContext;
use super::keywords::KeywordLexicon;
use super::state::DialogState;

/// Category of condition an escalation rule checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EscalationTrigger {
    KeywordsEmergency,
    SentimentNegative,
    UrgencyHigh,
    KeywordsComplaint,
    RepeatedRequests,
    Timeout,
}

/// Fallible predicate over the conversation context.
pub type RuleCondition = Box<dyn Fn(&DialogContext) -> Result<bool, DomainError> + Send + Sync>;

/// A single escalation rule.
pub struct EscalationRule {
    name: String,
    trigger: EscalationTrigger,
    priority: i32,
    description: String,
    condition: RuleCondition,
    enabled: AtomicBool,
}

impl EscalationRule {
    /// Creates an enabled rule.
    pub fn new(
        name: impl Into<String>,
        trigger: EscalationTrigger,
        priority: i32,
        description: impl Into<String>,
        condition: RuleCondition,
    ) -> Self {
        Self {
            name: name.into(),
            trigger,
            priority,
            description: description.into(),
            condition,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn trigger(&self) -> EscalationTrigger {
        self.trigger
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for EscalationRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EscalationRule")
            .field("name", &self.name)
            .field("trigger", &self.trigger)
            .field("priority", &self.priority)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

/// Priority-ordered escalation rule engine.
///
/// Mutations take a write lock and re-sort the registry; evaluation reads a
/// consistent snapshot, so its output order is deterministic.
pub struct EscalationRuleEngine {
    rules: RwLock<Vec<Arc<EscalationRule>>>,
}

impl EscalationRuleEngine {
    /// Creates an engine with the default hotel rule set.
    ///
    /// `response_timeout_hours` parameterizes the waiting-response timeout
    /// rule (24h in production).
    pub fn new(lexicon: Arc<KeywordLexicon>, response_timeout_hours: i64) -> Self {
        let engine = Self::empty();
        for rule in default_rules(lexicon, response_timeout_hours) {
            // Names in the default table are unique by construction.
            let _ = engine.add_rule(rule);
        }
        engine
    }

    /// Creates an engine with no rules.
    pub fn empty() -> Self {
        Self {
            rules: RwLock::new(Vec::new()),
        }
    }

    /// Adds a rule. Fails if a rule with the same name already exists.
    pub fn add_rule(&self, rule: EscalationRule) -> Result<(), DomainError> {
        let mut rules = self.rules.write().expect("escalation registry poisoned");
        if rules.iter().any(|r| r.name == rule.name) {
            return Err(DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Escalation rule '{}' already registered", rule.name),
            ));
        }
        rules.push(Arc::new(rule));
        sort_rules(&mut rules);
        Ok(())
    }

    /// Removes a rule by name. Returns true if a rule was removed.
    pub fn remove_rule(&self, name: &str) -> bool {
        let mut rules = self.rules.write().expect("escalation registry poisoned");
        let before = rules.len();
        rules.retain(|r| r.name != name);
        let removed = rules.len() != before;
        if removed {
            sort_rules(&mut rules);
        }
        removed
    }

    /// Enables or disables a rule by name. Returns true if the rule exists.
    pub fn set_rule_enabled(&self, name: &str, enabled: bool) -> bool {
        let rules = self.rules.write().expect("escalation registry poisoned");
        match rules.iter().find(|r| r.name == name) {
            Some(rule) => {
                rule.enabled.store(enabled, Ordering::SeqCst);
                true
            }
            None => false,
        }
    }

    /// Returns the triggered rules for a context, highest priority first.
    pub fn evaluate(&self, context: &DialogContext) -> Vec<Arc<EscalationRule>> {
        let snapshot: Vec<Arc<EscalationRule>> = {
            let rules = self.rules.read().expect("escalation registry poisoned");
            rules.clone()
        };

        snapshot
            .into_iter()
            .filter(|rule| rule.is_enabled())
            .filter(|rule| match (rule.condition)(context) {
                Ok(triggered) => triggered,
                Err(err) => {
                    warn!(
                        rule = %rule.name,
                        error = %err,
                        "Escalation rule condition failed, treating as non-triggering"
                    );
                    false
                }
            })
            .collect()
    }

    /// Returns true if any rule triggers for this context.
    pub fn should_escalate(&self, context: &DialogContext) -> bool {
        !self.evaluate(context).is_empty()
    }

    /// Returns the description of the highest-priority triggered rule.
    pub fn escalation_reason(&self, context: &DialogContext) -> Option<String> {
        self.evaluate(context)
            .first()
            .map(|rule| rule.description.clone())
    }

    /// Lists the registered rules, highest priority first.
    pub fn rules(&self) -> Vec<Arc<EscalationRule>> {
        self.rules.read().expect("escalation registry poisoned").clone()
    }
}

/// Descending priority; ties break on name so the order is total.
fn sort_rules(rules: &mut [Arc<EscalationRule>]) {
    rules.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.name.cmp(&b.name))
    });
}

/// The default hotel escalation table.
fn default_rules(
    lexicon: Arc<KeywordLexicon>,
    response_timeout_hours: i64,
) -> Vec<EscalationRule> {
    let emergency_lexicon = Arc::clone(&lexicon);
    let intensity_lexicon = Arc::clone(&lexicon);
    let complaint_lexicon = Arc::clone(&lexicon);

    vec![
        EscalationRule::new(
            "emergency_keywords",
            EscalationTrigger::KeywordsEmergency,
            10,
            "Emergency keywords detected in message",
            Box::new(move |ctx| {
                Ok(ctx
                    .message_content
                    .as_deref()
                    .map(|text| emergency_lexicon.has_emergency_keyword(text))
                    .unwrap_or(false))
            }),
        ),
        EscalationRule::new(
            "severe_negative_sentiment",
            EscalationTrigger::SentimentNegative,
            8,
            "Severely negative sentiment",
            Box::new(|ctx| Ok(ctx.sentiment_score.map(|s| s < -0.7).unwrap_or(false))),
        ),
        EscalationRule::new(
            "intense_negative_sentiment",
            EscalationTrigger::SentimentNegative,
            7,
            "Negative sentiment with intensity wording",
            Box::new(move |ctx| {
                let negative = ctx.sentiment_score.map(|s| s < -0.5).unwrap_or(false);
                let intense = ctx
                    .message_content
                    .as_deref()
                    .map(|text| intensity_lexicon.has_intensity_word(text))
                    .unwrap_or(false);
                Ok(negative && intense)
            }),
        ),
        EscalationRule::new(
            "high_urgency",
            EscalationTrigger::UrgencyHigh,
            7,
            "High urgency message",
            Box::new(|ctx| Ok(ctx.urgency_level.map(|u| u >= 4).unwrap_or(false))),
        ),
        EscalationRule::new(
            "complaint_keywords",
            EscalationTrigger::KeywordsComplaint,
            6,
            "Complaint keywords detected in message",
            Box::new(move |ctx| {
                Ok(ctx
                    .message_content
                    .as_deref()
                    .map(|text| complaint_lexicon.has_complaint_keyword(text))
                    .unwrap_or(false))
            }),
        ),
        EscalationRule::new(
            "repeated_requests",
            EscalationTrigger::RepeatedRequests,
            5,
            "Guest has repeated the request",
            Box::new(|ctx| Ok(ctx.repeat_count >= 3)),
        ),
        EscalationRule::new(
            "response_timeout",
            EscalationTrigger::Timeout,
            3,
            "No guest activity while waiting for a response",
            Box::new(move |ctx| {
                let waiting = ctx.current_state == Some(DialogState::WaitingResponse);
                let timed_out = ctx
                    .last_message_at
                    .map(|at| {
                        Timestamp::now().duration_since(&at)
                            >= chrono::Duration::hours(response_timeout_hours)
                    })
                    .unwrap_or(false);
                Ok(waiting && timed_out)
            }),
        ),
    ]
}
