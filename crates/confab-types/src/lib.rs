//! Shared domain and wire types for Confab.
//!
//! This crate contains the types used across the Confab messaging server:
//! users and presence, persisted messages, the WebSocket wire protocol, and
//! the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod error;
pub mod event;
pub mod message;
pub mod user;
