//! Booking store integration tests
//!
//! Timer-driven suites run on a paused tokio clock, so debounce windows
//! elapse deterministically.

#[path = "../common/mod.rs"]
mod common;

mod pessimistic_save;
mod search_pipeline;
