//! Transport Relay between the page side and the background service.
//!
//! # Module Structure
//!
//! - [`protocol`] - request/response envelopes and action names
//! - [`background`] - the HTTP client serving requests in the background task
//! - [`client`] - the caller side: id correlation, readiness and timeouts

pub mod background;
pub mod client;
pub mod protocol;

pub use background::{
    error_details, BackendClient, RelayHandler, DEFAULT_BACKEND_URL, DEFAULT_REQUEST_TIMEOUT,
};
pub use client::{
    Relay, RelayOptions, DEFAULT_READY_TIMEOUT, DEFAULT_RELAY_TIMEOUT, TRANSPORT_MARGIN,
};
pub use protocol::{RelayAction, RelayRequest, RelayResponse};
