//! `zyra-core`: shared gateway primitives.
//!
//! Identifiers, downstream service names and the clock abstraction used by
//! the time-driven state machines. No IO lives here.

pub mod clock;
pub mod error;
pub mod id;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use id::SubjectId;
pub use service::ServiceName;
