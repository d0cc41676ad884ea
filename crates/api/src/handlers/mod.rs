//! Request handlers.
//!
//! Handlers are thin: they extract path and body, call the
//! [`NotificationService`](beacon_push::NotificationService) held in
//! [`AppState`](crate::state::AppState), and wrap the result in a
//! [`DataResponse`](crate::response::DataResponse).

pub mod delivery;
pub mod notification;
pub mod token;
