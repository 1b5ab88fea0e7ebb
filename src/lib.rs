//! Guest Concierge - Hotel Guest Messaging Backend
//!
//! This crate implements the conversation dialog engine that decides, for
//! every inbound guest message, how the conversation should progress,
//! whether staff must be alerted, and which follow-up actions fire.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
