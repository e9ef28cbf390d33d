//! Revocation store adapters.
//!
//! The in-memory store lives in `zyra-auth`; this module holds the networked
//! backends.

#[cfg(feature = "redis")]
mod redis_store;

#[cfg(feature = "redis")]
pub use redis_store::RedisRevocationStore;
