//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - `Deserialize` DTOs for the inputs the service accepts

pub mod delivery;
pub mod device_token;
pub mod notification;
