//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod delivery_repo;
pub mod device_token_repo;
pub mod notification_repo;

pub use delivery_repo::DeliveryRepo;
pub use device_token_repo::DeviceTokenRepo;
pub use notification_repo::NotificationRepo;
