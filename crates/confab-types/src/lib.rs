//! Shared domain types for Confab.
//!
//! This crate contains the core domain types used across the Confab chat
//! system: chats, messages, completion request/stream shapes, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod config;
pub mod error;
pub mod llm;
