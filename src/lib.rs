//! Skybook - Reactive client-side booking store for flights
//!
//! Skybook keeps a local cache of flights fetched from a remote source, a
//! search filter, a selection basket and an active-flight pointer, and
//! derives memoized views from them.
//!
//! # Quick Start
//!
//! ```ignore
//! use skybook::{BookingStore, InMemoryTransport, FlightFilter};
//! use std::sync::Arc;
//!
//! let transport = Arc::new(InMemoryTransport::with_flights(seed));
//! let store = BookingStore::with_defaults(transport)?;
//!
//! // Debounced, gated search; only the latest input's result is applied
//! store.search_text("London");
//! store.idle().await;
//!
//! let matching = store.filtered_flights();
//! ```
//!
//! # Architecture
//!
//! All operations go through [`BookingStore`]. Remote access is abstracted
//! by the [`FlightTransport`] trait; [`InMemoryTransport`] is provided for
//! tests and embedding.
//!
//! Internal implementation details (cache, controllers, change propagation)
//! are not exposed beyond the types needed to observe them.

// Re-export the public API from skybook-engine
pub use skybook_engine::*;
