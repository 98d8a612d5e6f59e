//! Booking store engine
//!
//! This crate orchestrates the lower layers:
//! - State: versioned slices over the entity cache, filter, basket and pointer
//! - Views: memoized derived collections keyed on slice versions
//! - Search: gated, debounced, switch-to-latest query stream
//! - Updates: pessimistic saves with per-identity tickets
//! - Loader: active record hydration
//!
//! The engine is the only component that knows about:
//! - The transport contract
//! - Background tasks and their cancellation
//! - Change notification

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
mod loader;
pub mod search;
mod shared;
pub mod state;
pub mod store;
pub mod transport;
mod update;
pub mod views;

pub use config::{StoreConfig, CONFIG_FILE_NAME};
pub use search::SearchGate;
pub use shared::StoreChange;
pub use state::{LoadStatus, SaveStatus, SearchPhase, SearchStatus, Slice, SliceVersions, StoreState};
pub use store::BookingStore;
pub use transport::{FlightTransport, InMemoryTransport, TransportStats};
pub use views::{Computed, ViewEngine, ViewKind};

pub use skybook_core::{
    Basket, Flight, FlightFilter, FlightId, StoreError, StoreResult, TransportError,
    TransportResult,
};
pub use skybook_storage::CacheDelta;
