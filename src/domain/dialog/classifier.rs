//! Hybrid intent classifier.
//!
//! Classification runs in up to three passes: an emergency keyword scan
//! that short-circuits everything, an AI-assisted pass against the
//! provider port, and a rule-based keyword-scoring pass used as fallback
//! and as a second opinion. `classify` never fails; every internal error
//! degrades to a low-confidence result.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use serde::Deserialize;

use crate::ports::{AIProvider, CompletionRequest, MessageRole};

use super::context::DialogContext;
use super::intent::{Intent, IntentClassification};
use super::keywords::KeywordLexicon;
use super::message::DialogMessage;
use super::state::DialogState;

/// Tuning knobs for the classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    /// AI results at or below this confidence get a rule-based second
    /// opinion.
    pub ai_confidence_threshold: f64,
    /// Bound on the AI call; timeout falls back to the rule pass.
    pub ai_timeout: Duration,
    /// How many recent messages to embed in the prompt.
    pub max_recent_messages: usize,
    /// Token budget for the AI response.
    pub max_tokens: u32,
    /// Sampling temperature for the AI call.
    pub temperature: f32,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ai_confidence_threshold: 0.7,
            ai_timeout: Duration::from_secs(10),
            max_recent_messages: 5,
            max_tokens: 512,
            temperature: 0.0,
        }
    }
}

/// Conversation context supplied to classification.
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    /// Current dialog state of the conversation.
    pub state: DialogState,
    /// Recent conversation messages, oldest first.
    pub recent_messages: &'a [DialogMessage],
    /// Stored conversation memory.
    pub dialog: &'a DialogContext,
}

/// Structured payload expected back from the AI provider.
///
/// Unknown intent strings deserialize to `Intent::Unknown` instead of
/// failing the parse.
#[derive(Debug, Deserialize)]
struct AiIntentPayload {
    intent: Intent,
    confidence: f64,
    #[serde(default)]
    entities: HashMap<String, serde_json::Value>,
    #[serde(default)]
    sentiment_score: Option<f64>,
    #[serde(default)]
    urgency_level: Option<u8>,
    #[serde(default)]
    reasoning: Option<String>,
}

/// Hybrid AI + rule-based intent classifier.
pub struct IntentClassifier<A: AIProvider> {
    provider: Arc<A>,
    lexicon: Arc<KeywordLexicon>,
    config: ClassifierConfig,
}

impl<A: AIProvider> IntentClassifier<A> {
    /// Creates a classifier with the given provider and lexicon.
    pub fn new(provider: Arc<A>, lexicon: Arc<KeywordLexicon>, config: ClassifierConfig) -> Self {
        Self {
            provider,
            lexicon,
            config,
        }
    }

    /// Classifies an inbound message. Never fails.
    ///
    /// Emergency keywords short-circuit immediately; otherwise an AI pass
    /// runs first and the rule-based pass backs it up whenever the AI is
    /// absent or unsure.
    pub async fn classify(
        &self,
        message_text: &str,
        context: &ClassifierContext<'_>,
    ) -> IntentClassification {
        let emergency = self.lexicon.emergency_matches(message_text);
        if !emergency.is_empty() {
            return IntentClassification::emergency(emergency);
        }

        let ai_result = self.ai_pass(message_text, context).await;

        if let Some(ref result) = ai_result {
            if result.confidence > self.config.ai_confidence_threshold {
                return result.clone();
            }
        }

        let rule_result = self.rule_pass(message_text);
        self.combine(ai_result, rule_result, message_text)
    }

    /// AI-assisted pass. Any failure is logged and treated as "no result".
    async fn ai_pass(
        &self,
        message_text: &str,
        context: &ClassifierContext<'_>,
    ) -> Option<IntentClassification> {
        let request = self.build_request(message_text, context);

        let response = match tokio::time::timeout(
            self.config.ai_timeout,
            self.provider.complete(request),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(err)) => {
                debug!(error = %err, "AI classification call failed, falling back to rules");
                return None;
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.config.ai_timeout.as_millis() as u64,
                    "AI classification call timed out, falling back to rules"
                );
                return None;
            }
        };

        match parse_ai_payload(&response.content) {
            Some(payload) => Some(classification_from_payload(payload)),
            None => {
                debug!("AI response did not contain a parsable intent payload");
                None
            }
        }
    }

    /// Rule-based pass: keyword hit ratio per intent category.
    ///
    /// Returns `None` when no category scores above zero.
    fn rule_pass(&self, message_text: &str) -> Option<IntentClassification> {
        let lower = message_text.to_lowercase();
        let mut best: Option<(Intent, f64, Vec<String>, usize)> = None;

        // Iterate the stable intent order so score ties resolve the same
        // way on every run.
        for intent in Intent::all() {
            let Some(words) = self.lexicon.keywords_for(*intent) else {
                continue;
            };
            let matched: Vec<String> = words
                .iter()
                .filter(|w| lower.contains(w.as_str()))
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            let score = matched.len() as f64 / words.len() as f64;
            let better = match &best {
                Some((_, best_score, _, _)) => score > *best_score,
                None => true,
            };
            if better {
                best = Some((*intent, score, matched, words.len()));
            }
        }

        let (intent, score, matched, list_len) = best?;
        let confidence = (score * 2.0).min(1.0);
        let mut urgency = intent.base_urgency();
        if self.lexicon.has_urgency_booster(&lower) {
            urgency = (urgency + 1).min(super::intent::URGENCY_MAX);
        }

        Some(
            IntentClassification::new(intent, confidence, urgency)
                .with_reasoning(format!(
                    "Matched {}/{} keywords for {}",
                    matched.len(),
                    list_len,
                    intent
                ))
                .with_keywords(matched),
        )
    }

    /// Combines AI and rule-based results.
    ///
    /// Agreement raises AI confidence by 0.2 (capped at 1.0); disagreement
    /// lowers it by 0.1 (floored at 0.1). The AI intent wins either way.
    fn combine(
        &self,
        ai_result: Option<IntentClassification>,
        rule_result: Option<IntentClassification>,
        message_text: &str,
    ) -> IntentClassification {
        match (ai_result, rule_result) {
            (Some(mut ai), Some(rule)) => {
                if ai.intent == rule.intent {
                    ai.confidence = (ai.confidence + 0.2).min(1.0);
                    ai.reasoning
                        .push_str("; rule-based pass agrees with this intent");
                    for keyword in rule.keywords {
                        if !ai.keywords.contains(&keyword) {
                            ai.keywords.push(keyword);
                        }
                    }
                } else {
                    ai.confidence = (ai.confidence - 0.1).max(0.1);
                    ai.reasoning.push_str(&format!(
                        "; rule-based pass disagrees, suggesting {}",
                        rule.intent
                    ));
                }
                ai
            }
            (Some(ai), None) => ai,
            (None, Some(rule)) => rule,
            (None, None) => {
                if has_word_tokens(message_text) {
                    IntentClassification::new(Intent::GeneralQuestion, 0.3, 1)
                        .with_reasoning("No classification signal; defaulting to general question")
                } else {
                    IntentClassification::unknown("No usable content in message")
                }
            }
        }
    }

    /// Builds the completion request for the AI pass.
    fn build_request(
        &self,
        message_text: &str,
        context: &ClassifierContext<'_>,
    ) -> CompletionRequest {
        let mut prompt = format!("Conversation state: {:?}\n", context.state);

        let recent = context.recent_messages;
        let start = recent.len().saturating_sub(self.config.max_recent_messages);
        if start < recent.len() {
            prompt.push_str("Recent messages:\n");
            for message in &recent[start..] {
                prompt.push_str(&format!("- {:?}: {}\n", message.sender, message.content));
            }
        }

        if let Some(last_intent) = context.dialog.last_intent {
            prompt.push_str(&format!("Previously classified intent: {}\n", last_intent));
        }

        prompt.push_str(&format!("\nGuest message: {}", message_text));

        CompletionRequest::new()
            .with_system_prompt(system_prompt())
            .with_message(MessageRole::User, prompt)
            .with_max_tokens(self.config.max_tokens)
            .with_temperature(self.config.temperature)
    }
}

/// System prompt describing the JSON contract the AI must honor.
fn system_prompt() -> String {
    let intents: Vec<String> = Intent::all()
        .iter()
        .filter(|i| **i != Intent::Unknown)
        .map(|i| i.to_string())
        .collect();
    format!(
        "You classify hotel guest messages. Respond with a single JSON object and \
         nothing else, shaped as {{\"intent\": \"...\", \"confidence\": 0.0-1.0, \
         \"sentiment_score\": -1.0-1.0, \"urgency_level\": 1-5, \"entities\": {{}}, \
         \"reasoning\": \"...\"}}. intent must be one of: {}.",
        intents.join(", ")
    )
}

/// Extracts and parses the JSON payload from the raw AI response.
///
/// Tolerates code fences and surrounding prose by slicing from the first
/// `{` to the last `}`.
fn parse_ai_payload(content: &str) -> Option<AiIntentPayload> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&content[start..=end]).ok()
}

/// Converts a parsed payload into a classification, enforcing invariants.
fn classification_from_payload(payload: AiIntentPayload) -> IntentClassification {
    // The emergency invariant holds no matter what the model reports.
    if payload.intent == Intent::Emergency {
        let mut result = IntentClassification::emergency(Vec::new());
        if let Some(score) = payload.sentiment_score {
            result = result.with_sentiment(score);
        }
        return result
            .with_entities(payload.entities)
            .with_reasoning(
                payload
                    .reasoning
                    .unwrap_or_else(|| "AI classified message as emergency".to_string()),
            );
    }

    let urgency = payload
        .urgency_level
        .unwrap_or_else(|| payload.intent.base_urgency());
    let mut result = IntentClassification::new(payload.intent, payload.confidence, urgency)
        .with_entities(payload.entities)
        .with_reasoning(
            payload
                .reasoning
                .unwrap_or_else(|| "AI classification".to_string()),
        );
    if let Some(score) = payload.sentiment_score {
        result = result.with_sentiment(score);
    }
    result
}

/// Returns true if the text contains at least one alphanumeric token.
fn has_word_tokens(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric())
}
