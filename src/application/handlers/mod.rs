//! Command handlers.

mod handle_message;

pub use handle_message::{
    ActionTaken, HandleMessageCommand, HandleMessageOutcome, HandlerConfig, MessageHandler,
    TransitionTrigger,
};
