//! Beacon domain core.
//!
//! Pure domain logic with zero internal dependencies so it can be shared by
//! the repository layer, the push engine, the HTTP server and the worker.

pub mod audience;
pub mod clock;
pub mod error;
pub mod lifecycle;
pub mod notification_types;
pub mod schedule;
pub mod types;
pub mod validation;
