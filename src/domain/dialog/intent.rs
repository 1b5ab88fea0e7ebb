//! Intent vocabulary and classification results.
//!
//! An intent is the categorical judgment of what a guest wants from a
//! message. Classification results combine the intent with confidence,
//! sentiment, urgency, and any extracted entities.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::domain::foundation::Timestamp;

/// Lowest urgency on the 1-5 scale.
pub const URGENCY_MIN: u8 = 1;
/// Highest urgency on the 1-5 scale.
pub const URGENCY_MAX: u8 = 5;

/// Categorical judgment of what the guest wants.
///
/// Intent strings arriving from the AI provider deserialize through serde;
/// anything outside the known vocabulary falls back to `Unknown` instead of
/// failing the parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Guest or property safety is at risk. Always maximum urgency.
    Emergency,
    /// Guest is dissatisfied with service or stay.
    Complaint,
    /// Questions about availability, rates, or making a reservation.
    BookingInquiry,
    /// Guest wants something delivered or done (housekeeping, room service).
    RequestService,
    /// Something in the room is broken, dirty, or not working.
    RoomIssue,
    /// Guest is praising the stay or the staff.
    Compliment,
    /// Conversation opener with no actionable content.
    Greeting,
    /// Guest is wrapping up the conversation.
    Goodbye,
    /// Questions about arrival or check-in logistics.
    CheckInQuestion,
    /// Questions about departure or check-out logistics.
    CheckOutQuestion,
    /// Questions about pool, gym, spa, restaurant, parking, and similar.
    AmenityInquiry,
    /// Questions about charges, invoices, or payment.
    BillingQuestion,
    /// Guest is offering general feedback about the stay.
    Feedback,
    /// A question that fits no specific category.
    GeneralQuestion,
    /// Could not be classified.
    #[serde(other)]
    Unknown,
}

impl Intent {
    /// All known intents, in a stable order.
    pub fn all() -> &'static [Intent] {
        &[
            Intent::Emergency,
            Intent::Complaint,
            Intent::BookingInquiry,
            Intent::RequestService,
            Intent::RoomIssue,
            Intent::Compliment,
            Intent::Greeting,
            Intent::Goodbye,
            Intent::CheckInQuestion,
            Intent::CheckOutQuestion,
            Intent::AmenityInquiry,
            Intent::BillingQuestion,
            Intent::Feedback,
            Intent::GeneralQuestion,
            Intent::Unknown,
        ]
    }

    /// Static base urgency for the intent, before message-level boosts.
    pub fn base_urgency(&self) -> u8 {
        match self {
            Intent::Emergency => 5,
            Intent::Complaint => 3,
            Intent::RoomIssue => 3,
            Intent::RequestService => 2,
            Intent::BookingInquiry => 2,
            Intent::CheckInQuestion => 2,
            Intent::CheckOutQuestion => 2,
            Intent::BillingQuestion => 2,
            Intent::AmenityInquiry => 1,
            Intent::Compliment => 1,
            Intent::Greeting => 1,
            Intent::Goodbye => 1,
            Intent::Feedback => 1,
            Intent::GeneralQuestion => 1,
            Intent::Unknown => 1,
        }
    }

    /// Returns true for intents that count toward the repeated-request
    /// escalation counter.
    pub fn counts_as_repeat_request(&self) -> bool {
        matches!(self, Intent::Complaint | Intent::RequestService)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Intent::Emergency => "emergency",
            Intent::Complaint => "complaint",
            Intent::BookingInquiry => "booking_inquiry",
            Intent::RequestService => "request_service",
            Intent::RoomIssue => "room_issue",
            Intent::Compliment => "compliment",
            Intent::Greeting => "greeting",
            Intent::Goodbye => "goodbye",
            Intent::CheckInQuestion => "check_in_question",
            Intent::CheckOutQuestion => "check_out_question",
            Intent::AmenityInquiry => "amenity_inquiry",
            Intent::BillingQuestion => "billing_question",
            Intent::Feedback => "feedback",
            Intent::GeneralQuestion => "general_question",
            Intent::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// Classification result for a single inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentClassification {
    /// The classified intent.
    pub intent: Intent,
    /// Confidence in the classification, in [0, 1].
    pub confidence: f64,
    /// Sentiment of the message, in [-1, 1]. Negative means dissatisfaction.
    /// None when no signal was available.
    pub sentiment_score: Option<f64>,
    /// How time-sensitive the message is, in 1..=5.
    pub urgency_level: u8,
    /// Entities extracted from the message (room number, dates, items).
    pub entities: HashMap<String, serde_json::Value>,
    /// Keyword tokens that matched, in match order.
    pub keywords: Vec<String>,
    /// Free-text explanation of how the classification was reached.
    pub reasoning: String,
}

impl IntentClassification {
    /// Creates a classification, clamping confidence and urgency into range.
    pub fn new(intent: Intent, confidence: f64, urgency_level: u8) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            sentiment_score: None,
            urgency_level: clamp_urgency(urgency_level),
            entities: HashMap::new(),
            keywords: Vec::new(),
            reasoning: String::new(),
        }
    }

    /// Creates an emergency classification.
    ///
    /// Emergencies always carry confidence 1.0 and urgency 5.
    pub fn emergency(matched_keywords: Vec<String>) -> Self {
        Self {
            intent: Intent::Emergency,
            confidence: 1.0,
            sentiment_score: None,
            urgency_level: URGENCY_MAX,
            entities: HashMap::new(),
            keywords: matched_keywords,
            reasoning: "Emergency keyword detected".to_string(),
        }
    }

    /// Creates an unknown-intent classification with low confidence.
    pub fn unknown(reasoning: impl Into<String>) -> Self {
        Self {
            intent: Intent::Unknown,
            confidence: 0.1,
            sentiment_score: None,
            urgency_level: URGENCY_MIN,
            entities: HashMap::new(),
            keywords: Vec::new(),
            reasoning: reasoning.into(),
        }
    }

    /// Sets the sentiment score, clamped into [-1, 1].
    pub fn with_sentiment(mut self, score: f64) -> Self {
        self.sentiment_score = Some(score.clamp(-1.0, 1.0));
        self
    }

    /// Sets the matched keywords.
    pub fn with_keywords(mut self, keywords: Vec<String>) -> Self {
        self.keywords = keywords;
        self
    }

    /// Sets the reasoning string.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    /// Sets the extracted entities.
    pub fn with_entities(mut self, entities: HashMap<String, serde_json::Value>) -> Self {
        self.entities = entities;
        self
    }

    /// Returns true if this classification demands the emergency path.
    pub fn is_emergency(&self) -> bool {
        self.intent == Intent::Emergency
    }
}

/// One entry in a conversation's rolling intent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentRecord {
    pub intent: Intent,
    pub confidence: f64,
    pub recorded_at: Timestamp,
}

impl IntentRecord {
    /// Creates a record stamped with the current time.
    pub fn new(intent: Intent, confidence: f64) -> Self {
        Self {
            intent,
            confidence: clamp_confidence(confidence),
            recorded_at: Timestamp::now(),
        }
    }
}

fn clamp_confidence(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

fn clamp_urgency(value: u8) -> u8 {
    value.clamp(URGENCY_MIN, URGENCY_MAX)
}
