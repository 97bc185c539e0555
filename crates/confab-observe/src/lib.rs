//! Observability setup for Confab.

pub mod tracing_setup;
