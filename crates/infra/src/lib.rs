//! Infrastructure layer: circuit breakers, dispatch, downstream channels,
//! revocation backends and configuration.

pub mod breaker;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod revocation;
