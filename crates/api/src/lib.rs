//! HTTP edge: routing, admission middleware and response mapping.

pub mod app;
pub mod context;
pub mod middleware;
