//! Dialog engine tuning configuration.

use serde::Deserialize;

use crate::application::handlers::HandlerConfig;
use crate::domain::dialog::ClassifierConfig;

use super::ai::AiConfig;
use super::error::ValidationError;

/// Tuning knobs for the conversation dialog engine.
#[derive(Debug, Clone, Deserialize)]
pub struct DialogConfig {
    /// AI classifications at or below this confidence get a rule-based
    /// second opinion.
    #[serde(default = "default_confidence_threshold")]
    pub ai_confidence_threshold: f64,

    /// Recent messages supplied to the classifier as context.
    #[serde(default = "default_recent_messages")]
    pub recent_message_limit: usize,

    /// Repeated-request count at which escalation fires.
    #[serde(default = "default_repeat_threshold")]
    pub repeat_escalation_threshold: u32,

    /// Hours without guest activity before a waiting conversation times out.
    #[serde(default = "default_timeout_hours")]
    pub response_timeout_hours: i64,
}

impl DialogConfig {
    /// Validate dialog configuration.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(0.0..=1.0).contains(&self.ai_confidence_threshold) {
            return Err(ValidationError::invalid(
                "dialog.ai_confidence_threshold",
                "must be within [0, 1]",
            ));
        }
        if self.recent_message_limit == 0 {
            return Err(ValidationError::invalid(
                "dialog.recent_message_limit",
                "must be at least 1",
            ));
        }
        if self.repeat_escalation_threshold == 0 {
            return Err(ValidationError::invalid(
                "dialog.repeat_escalation_threshold",
                "must be at least 1",
            ));
        }
        if self.response_timeout_hours <= 0 {
            return Err(ValidationError::invalid(
                "dialog.response_timeout_hours",
                "must be positive",
            ));
        }
        Ok(())
    }

    /// Builds the classifier configuration.
    pub fn classifier_config(&self, ai: &AiConfig) -> ClassifierConfig {
        ClassifierConfig {
            ai_confidence_threshold: self.ai_confidence_threshold,
            ai_timeout: ai.timeout(),
            max_recent_messages: self.recent_message_limit,
            ..ClassifierConfig::default()
        }
    }

    /// Builds the message handler configuration.
    pub fn handler_config(&self) -> HandlerConfig {
        HandlerConfig {
            recent_message_limit: self.recent_message_limit,
            repeat_escalation_threshold: self.repeat_escalation_threshold,
        }
    }
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            ai_confidence_threshold: default_confidence_threshold(),
            recent_message_limit: default_recent_messages(),
            repeat_escalation_threshold: default_repeat_threshold(),
            response_timeout_hours: default_timeout_hours(),
        }
    }
}

fn default_confidence_threshold() -> f64 {
    0.7
}

fn default_recent_messages() -> usize {
    5
}

fn default_repeat_threshold() -> u32 {
    3
}

fn default_timeout_hours() -> i64 {
    24
}
