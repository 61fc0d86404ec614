//! HTTP surface: SSE match streaming, chat, and health checks.

pub mod chat;
pub mod rest;
pub mod sse;

pub use rest::{AppState, RestApi};
