//! HTTP layer for Confab.
//!
//! Axum-based REST API at `/api/v1/` plus the `/ws` WebSocket endpoint,
//! with bearer token authentication, envelope response format, and CORS.

pub mod error;
pub mod extractors;
pub mod handlers;
pub mod response;
pub mod router;
