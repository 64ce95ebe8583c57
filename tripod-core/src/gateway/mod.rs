//! # HTTP Gateway
//!
//! Delivers transparency reports over HTTP(S). Every request fetches a fresh
//! snapshot from the configured metadata source and aggregates it; nothing is
//! cached between requests. A failed request answers `500` with a JSON error
//! body and leaves the server running.

mod error;
mod server;

pub use error::GatewayError;
pub use server::{
    GatewayServer, SharedGateway, router as gateway_router, run as run_gateway, shutdown_signal,
};
