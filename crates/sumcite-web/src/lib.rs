//! HTTP adapter for the `sumcite-rs` summarization engine.
//!
//! A thin axum layer: request bodies deserialize straight into the engine's
//! turn-request types, responses serialize straight back out, and every
//! [`SumciteError`](sumcite_rs::SumciteError) variant maps to one HTTP
//! status. All protocol semantics live in `sumcite-rs`.

pub mod api;

pub use api::{AppState, build_router};
