//! Keyword tables for rule-based classification and guard predicates.
//!
//! The lexicon is owned by the engines that use it rather than living in
//! module-level mutable state, so two engine instances can carry different
//! vocabularies (e.g. per deployment or per test).

use once_cell::sync::Lazy;
use std::collections::HashMap;

use super::intent::Intent;

/// Default emergency vocabulary. Any hit short-circuits classification.
static EMERGENCY_KEYWORDS: &[&str] = &[
    "emergency",
    "fire",
    "smoke",
    "ambulance",
    "police",
    "help me",
    "911",
    "heart attack",
    "bleeding",
    "unconscious",
    "gas leak",
    "flooding",
    "intruder",
    "break-in",
];

/// Phrases that signal a guest wants the conversation escalated to staff.
static ESCALATION_KEYWORDS: &[&str] = &[
    "manager",
    "supervisor",
    "unacceptable",
    "refund",
    "lawyer",
    "terrible",
    "worst",
    "never again",
    "front desk now",
];

/// Phrases that signal the guest considers the request handled.
static SATISFACTION_KEYWORDS: &[&str] = &[
    "thank",
    "thanks",
    "perfect",
    "resolved",
    "fixed",
    "solved",
    "all good",
    "great job",
    "no further",
];

/// Intensity words that sharpen a negative-sentiment signal.
static INTENSITY_WORDS: &[&str] = &[
    "absolutely",
    "extremely",
    "completely",
    "totally",
    "utterly",
    "really",
    "so ",
];

/// Tokens that bump rule-based urgency by one level.
static URGENCY_BOOSTERS: &[&str] = &["urgent", "immediately", "asap", "broken", "right now"];

/// Complaint vocabulary used by the escalation rule engine.
static COMPLAINT_KEYWORDS: &[&str] = &[
    "complaint",
    "terrible",
    "awful",
    "horrible",
    "disappointed",
    "unacceptable",
    "worst",
    "refund",
    "disgusting",
    "unhappy",
];

/// Per-intent keyword lists for the rule-based classification pass.
///
/// Emergency is intentionally absent: the short-circuit scan handles it
/// before the scoring pass runs.
static INTENT_KEYWORDS: Lazy<HashMap<Intent, Vec<&'static str>>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(
        Intent::Complaint,
        vec![
            "complaint", "terrible", "awful", "horrible", "disappointed", "unacceptable",
            "refund", "worst", "unhappy", "dirty",
        ],
    );
    map.insert(
        Intent::BookingInquiry,
        vec![
            "book", "booking", "reservation", "reserve", "availability", "available",
            "vacancy", "nightly rate", "extend my stay",
        ],
    );
    map.insert(
        Intent::RequestService,
        vec![
            "room service", "housekeeping", "towels", "pillow", "blanket", "toiletries",
            "bring", "send up", "laundry", "wake-up call",
        ],
    );
    map.insert(
        Intent::RoomIssue,
        vec![
            "broken", "not working", "leaking", "no hot water", "air conditioning", "ac ",
            "heating", "wifi", "tv", "noisy", "smell",
        ],
    );
    map.insert(
        Intent::Compliment,
        vec!["wonderful", "amazing", "excellent", "lovely", "fantastic", "great stay"],
    );
    map.insert(
        Intent::Greeting,
        vec!["hello", "hi there", "good morning", "good afternoon", "good evening", "hey"],
    );
    map.insert(
        Intent::Goodbye,
        vec!["goodbye", "bye", "see you", "that's all", "nothing else"],
    );
    map.insert(
        Intent::CheckInQuestion,
        vec!["check in", "check-in", "checkin", "early arrival", "arrive"],
    );
    map.insert(
        Intent::CheckOutQuestion,
        vec!["check out", "check-out", "checkout", "late checkout", "departure"],
    );
    map.insert(
        Intent::AmenityInquiry,
        vec!["pool", "gym", "spa", "restaurant", "breakfast", "parking", "bar", "sauna"],
    );
    map.insert(
        Intent::BillingQuestion,
        vec!["bill", "invoice", "charge", "charged", "payment", "receipt", "minibar"],
    );
    map.insert(
        Intent::Feedback,
        vec!["feedback", "suggestion", "survey", "review", "improve"],
    );
    map.insert(
        Intent::GeneralQuestion,
        vec!["what time", "where is", "how do i", "can you tell me", "question"],
    );
    map
});

/// Keyword vocabulary for classification and guard evaluation.
///
/// `Default` yields the production tables. Engines hold their own copy so
/// vocabulary changes never leak across instances.
#[derive(Debug, Clone)]
pub struct KeywordLexicon {
    emergency: Vec<String>,
    escalation: Vec<String>,
    satisfaction: Vec<String>,
    intensity: Vec<String>,
    urgency_boosters: Vec<String>,
    complaint: Vec<String>,
    intent_keywords: HashMap<Intent, Vec<String>>,
}

impl Default for KeywordLexicon {
    fn default() -> Self {
        Self {
            emergency: to_owned(EMERGENCY_KEYWORDS),
            escalation: to_owned(ESCALATION_KEYWORDS),
            satisfaction: to_owned(SATISFACTION_KEYWORDS),
            intensity: to_owned(INTENSITY_WORDS),
            urgency_boosters: to_owned(URGENCY_BOOSTERS),
            complaint: to_owned(COMPLAINT_KEYWORDS),
            intent_keywords: INTENT_KEYWORDS
                .iter()
                .map(|(intent, words)| (*intent, words.iter().map(|w| w.to_string()).collect()))
                .collect(),
        }
    }
}

impl KeywordLexicon {
    /// Creates an empty lexicon (useful in tests).
    pub fn empty() -> Self {
        Self {
            emergency: Vec::new(),
            escalation: Vec::new(),
            satisfaction: Vec::new(),
            intensity: Vec::new(),
            urgency_boosters: Vec::new(),
            complaint: Vec::new(),
            intent_keywords: HashMap::new(),
        }
    }

    /// Returns the emergency keywords found in `text`, in table order.
    pub fn emergency_matches(&self, text: &str) -> Vec<String> {
        matches_in(&self.emergency, text)
    }

    /// Returns true if `text` contains any emergency keyword.
    pub fn has_emergency_keyword(&self, text: &str) -> bool {
        !self.emergency_matches(text).is_empty()
    }

    /// Returns true if `text` contains any escalation phrase.
    pub fn has_escalation_keyword(&self, text: &str) -> bool {
        contains_any(&self.escalation, text)
    }

    /// Returns true if `text` contains any satisfaction phrase.
    pub fn has_satisfaction_keyword(&self, text: &str) -> bool {
        contains_any(&self.satisfaction, text)
    }

    /// Returns true if `text` contains an intensity word.
    pub fn has_intensity_word(&self, text: &str) -> bool {
        contains_any(&self.intensity, text)
    }

    /// Returns true if `text` contains an urgency booster token.
    pub fn has_urgency_booster(&self, text: &str) -> bool {
        contains_any(&self.urgency_boosters, text)
    }

    /// Returns true if `text` contains any complaint keyword.
    pub fn has_complaint_keyword(&self, text: &str) -> bool {
        contains_any(&self.complaint, text)
    }

    /// Returns the keyword list for an intent, if one exists.
    pub fn keywords_for(&self, intent: Intent) -> Option<&[String]> {
        self.intent_keywords.get(&intent).map(Vec::as_slice)
    }

    /// Iterates over all per-intent keyword lists.
    pub fn intent_keyword_lists(&self) -> impl Iterator<Item = (Intent, &[String])> {
        self.intent_keywords
            .iter()
            .map(|(intent, words)| (*intent, words.as_slice()))
    }

    /// Replaces the keyword list for an intent.
    pub fn set_intent_keywords(&mut self, intent: Intent, keywords: Vec<String>) {
        self.intent_keywords.insert(intent, keywords);
    }

    /// Adds an emergency keyword.
    pub fn add_emergency_keyword(&mut self, keyword: impl Into<String>) {
        self.emergency.push(keyword.into().to_lowercase());
    }
}

fn to_owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

fn contains_any(words: &[String], text: &str) -> bool {
    let lower = text.to_lowercase();
    words.iter().any(|w| lower.contains(w.as_str()))
}

fn matches_in(words: &[String], text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    words
        .iter()
        .filter(|w| lower.contains(w.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emergency_matching_is_case_insensitive() {
        let lexicon = KeywordLexicon::default();
        let matches = lexicon.emergency_matches("EMERGENCY fire in my room");
        assert_eq!(matches, vec!["emergency".to_string(), "fire".to_string()]);
    }

    #[test]
    fn no_emergency_match_on_calm_text() {
        let lexicon = KeywordLexicon::default();
        assert!(!lexicon.has_emergency_keyword("Could I get two extra towels?"));
    }

    #[test]
    fn satisfaction_keywords_match_thanks() {
        let lexicon = KeywordLexicon::default();
        assert!(lexicon.has_satisfaction_keyword("Thank you, all fixed!"));
    }

    #[test]
    fn escalation_keywords_match_refund_demand() {
        let lexicon = KeywordLexicon::default();
        assert!(lexicon.has_escalation_keyword("This is terrible, I want a refund"));
    }

    #[test]
    fn intensity_word_detected() {
        let lexicon = KeywordLexicon::default();
        assert!(lexicon.has_intensity_word("I am extremely disappointed"));
        assert!(!lexicon.has_intensity_word("I am disappointed"));
    }

    #[test]
    fn booking_keywords_present_for_scoring() {
        let lexicon = KeywordLexicon::default();
        let words = lexicon.keywords_for(Intent::BookingInquiry).unwrap();
        assert!(words.iter().any(|w| w == "book"));
    }

    #[test]
    fn empty_lexicon_matches_nothing() {
        let lexicon = KeywordLexicon::empty();
        assert!(!lexicon.has_emergency_keyword("fire"));
        assert!(lexicon.keywords_for(Intent::Complaint).is_none());
    }

    #[test]
    fn custom_emergency_keyword_is_honored() {
        let mut lexicon = KeywordLexicon::empty();
        lexicon.add_emergency_keyword("Mayday");
        assert!(lexicon.has_emergency_keyword("mayday mayday"));
    }
}
