//! Push transports.
//!
//! [`fcm::FcmSender`] talks to Firebase Cloud Messaging; [`log::LogSender`]
//! only logs and is used when FCM is not configured.

pub mod fcm;
pub mod log;
