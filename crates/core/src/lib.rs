//! Core types for the skybook booking store
//!
//! This crate defines the value types shared by every layer:
//! - FlightId: Identity of a cached flight
//! - Flight: Immutable flight record
//! - FlightFilter: Origin/destination prefix filter with urgency flag
//! - Basket: Selection set keyed by identity
//! - Error: Transport and store error hierarchy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod basket;
pub mod error;
pub mod filter;
pub mod flight;

pub use basket::Basket;
pub use error::{StoreError, StoreResult, TransportError, TransportResult};
pub use filter::FlightFilter;
pub use flight::{Flight, FlightId};
