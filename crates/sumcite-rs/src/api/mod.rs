//! API interaction support: the retry policy applied to the
//! completion+parse step of every turn.
//!
//! - [`retry`] — [`RetryConfig`](retry::RetryConfig) attempt budget with
//!   backoff, and [`retry_completion`](retry::retry_completion), which
//!   exhausts the budget and propagates the final failure's cause instead
//!   of swallowing it.

pub mod retry;

pub use retry::{RetryConfig, retry_completion};
