//! Conversation context - the mutable memory carried across messages.
//!
//! The context used to be an open string-keyed map in earlier designs; it is
//! modeled here as a typed structure with named optional fields, plus an
//! `extra` side channel for forward compatibility.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::Timestamp;

use super::intent::{Intent, IntentRecord};
use super::state::DialogState;

/// Maximum number of intent-history entries retained per conversation.
pub const INTENT_HISTORY_CAP: usize = 10;

/// Typed conversation memory.
///
/// Carried on the conversation, updated by the message handler, and read by
/// state-machine guards and escalation rule conditions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DialogContext {
    /// Sentiment of the latest classified message, in [-1, 1].
    pub sentiment_score: Option<f64>,
    /// Urgency of the latest classified message, in 1..=5.
    pub urgency_level: Option<u8>,
    /// Raw text of the latest inbound message.
    pub message_content: Option<String>,
    /// How many complaint/service requests the guest has repeated.
    pub repeat_count: u32,
    /// Set when the underlying request has been fulfilled.
    pub request_resolved: bool,
    /// Fields that must be collected before the request can be processed.
    pub required_fields: Vec<String>,
    /// Information collected from the guest so far, keyed by field name.
    pub collected_info: HashMap<String, serde_json::Value>,
    /// Entities extracted across messages (room number, dates, items).
    pub entities: HashMap<String, serde_json::Value>,
    /// Intent of the latest classified message.
    pub last_intent: Option<Intent>,
    /// Confidence of the latest classification.
    pub last_confidence: Option<f64>,
    /// Rolling history of classified intents, most recent last.
    /// Capped at [`INTENT_HISTORY_CAP`] entries.
    pub intent_history: Vec<IntentRecord>,
    /// When the guest last sent a message.
    pub last_message_at: Option<Timestamp>,
    /// Dialog state at evaluation time. Stamped by the handler before rule
    /// evaluation; not authoritative conversation state.
    pub current_state: Option<DialogState>,
    /// Forward-compatibility side channel for collaborators.
    pub extra: HashMap<String, serde_json::Value>,
}

impl DialogContext {
    /// Creates an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges another context into this one.
    ///
    /// Scalar fields overwrite when the incoming value is present; maps are
    /// extended key-by-key; `repeat_count` keeps the larger counter;
    /// `request_resolved` is sticky once set. Intent history entries are
    /// appended and re-capped.
    pub fn merge(&mut self, other: DialogContext) {
        if other.sentiment_score.is_some() {
            self.sentiment_score = other.sentiment_score;
        }
        if other.urgency_level.is_some() {
            self.urgency_level = other.urgency_level;
        }
        if other.message_content.is_some() {
            self.message_content = other.message_content;
        }
        self.repeat_count = self.repeat_count.max(other.repeat_count);
        self.request_resolved = self.request_resolved || other.request_resolved;
        if !other.required_fields.is_empty() {
            self.required_fields = other.required_fields;
        }
        self.collected_info.extend(other.collected_info);
        self.entities.extend(other.entities);
        if other.last_intent.is_some() {
            self.last_intent = other.last_intent;
        }
        if other.last_confidence.is_some() {
            self.last_confidence = other.last_confidence;
        }
        for record in other.intent_history {
            if !self.intent_history.contains(&record) {
                self.intent_history.push(record);
            }
        }
        self.cap_intent_history();
        if other.last_message_at.is_some() {
            self.last_message_at = other.last_message_at;
        }
        if other.current_state.is_some() {
            self.current_state = other.current_state;
        }
        self.extra.extend(other.extra);
    }

    /// Appends an intent record, dropping the oldest entries past the cap.
    pub fn record_intent(&mut self, record: IntentRecord) {
        self.intent_history.push(record);
        self.cap_intent_history();
    }

    /// Increments the repeated-request counter and returns the new value.
    pub fn increment_repeat_count(&mut self) -> u32 {
        self.repeat_count += 1;
        self.repeat_count
    }

    /// Returns true when every required field has been collected.
    ///
    /// A conversation with no required fields is never considered complete;
    /// the guard would otherwise promote every fresh conversation.
    pub fn has_all_required_info(&self) -> bool {
        !self.required_fields.is_empty()
            && self
                .required_fields
                .iter()
                .all(|field| self.collected_info.contains_key(field))
    }

    /// Stores a collected field value.
    pub fn collect(&mut self, field: impl Into<String>, value: serde_json::Value) {
        self.collected_info.insert(field.into(), value);
    }

    fn cap_intent_history(&mut self) {
        if self.intent_history.len() > INTENT_HISTORY_CAP {
            let overflow = self.intent_history.len() - INTENT_HISTORY_CAP;
            self.intent_history.drain(..overflow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    mod intent_history {
        use super::*;

        #[test]
        fn history_is_capped_at_ten_entries() {
            let mut ctx = DialogContext::new();
            for i in 0..15 {
                ctx.record_intent(IntentRecord::new(Intent::GeneralQuestion, i as f64 / 20.0));
            }
            assert_eq!(ctx.intent_history.len(), INTENT_HISTORY_CAP);
        }

        #[test]
        fn cap_drops_only_the_oldest_entries() {
            let mut ctx = DialogContext::new();
            for i in 0..12 {
                ctx.record_intent(IntentRecord::new(Intent::GeneralQuestion, i as f64 / 12.0));
            }
            // Entries 2..12 survive; 0 and 1 are gone.
            let expected_oldest = 2.0 / 12.0;
            assert!((ctx.intent_history[0].confidence - expected_oldest).abs() < 1e-9);
            let expected_newest = 11.0 / 12.0;
            let newest = ctx.intent_history.last().unwrap();
            assert!((newest.confidence - expected_newest).abs() < 1e-9);
        }
    }

    mod merge {
        use super::*;

        #[test]
        fn some_values_overwrite_and_none_preserves() {
            let mut base = DialogContext {
                sentiment_score: Some(0.4),
                urgency_level: Some(2),
                ..Default::default()
            };
            let incoming = DialogContext {
                sentiment_score: Some(-0.8),
                ..Default::default()
            };
            base.merge(incoming);
            assert_eq!(base.sentiment_score, Some(-0.8));
            assert_eq!(base.urgency_level, Some(2));
        }

        #[test]
        fn repeat_count_keeps_the_larger_value() {
            let mut base = DialogContext {
                repeat_count: 3,
                ..Default::default()
            };
            base.merge(DialogContext {
                repeat_count: 1,
                ..Default::default()
            });
            assert_eq!(base.repeat_count, 3);
        }

        #[test]
        fn request_resolved_is_sticky() {
            let mut base = DialogContext {
                request_resolved: true,
                ..Default::default()
            };
            base.merge(DialogContext::default());
            assert!(base.request_resolved);
        }

        #[test]
        fn maps_are_extended_not_replaced() {
            let mut base = DialogContext::new();
            base.collect("room_number", json!("412"));
            let mut incoming = DialogContext::new();
            incoming.collect("item", json!("towels"));

            base.merge(incoming);
            assert_eq!(base.collected_info.len(), 2);
        }
    }

    mod required_info {
        use super::*;

        #[test]
        fn incomplete_when_a_field_is_missing() {
            let mut ctx = DialogContext {
                required_fields: vec!["room_number".into(), "item".into()],
                ..Default::default()
            };
            ctx.collect("room_number", json!("412"));
            assert!(!ctx.has_all_required_info());
        }

        #[test]
        fn complete_when_all_fields_collected() {
            let mut ctx = DialogContext {
                required_fields: vec!["room_number".into(), "item".into()],
                ..Default::default()
            };
            ctx.collect("room_number", json!("412"));
            ctx.collect("item", json!("towels"));
            assert!(ctx.has_all_required_info());
        }

        #[test]
        fn no_required_fields_means_not_complete() {
            let ctx = DialogContext::new();
            assert!(!ctx.has_all_required_info());
        }
    }
}
