//! Core types for the email builder bridge: wire protocol, cross-context
//! channel, editor configuration model, config, and errors.

pub mod channel;
pub mod config;
pub mod document;
pub mod error;
pub mod protocol;
pub mod types;
