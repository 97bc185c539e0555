//! Infrastructure implementations for Confab.
//!
//! SQLite-backed implementations of the repository traits and the identity
//! verifier defined in `confab-core`, plus data-dir resolution. Everything
//! here is swappable: the core only sees the traits.

pub mod config;
pub mod sqlite;
