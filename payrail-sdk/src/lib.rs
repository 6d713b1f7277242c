//! Payrail SDK.
//!
//! Wire types shared by the server, the subscriber portal, and merchant
//! integrations, plus the session-token and API-key primitives. The typed
//! HTTP clients live behind the `client` feature.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
pub mod session;
