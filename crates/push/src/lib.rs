//! Beacon push notification engine.
//!
//! - [`NotificationService`]: the operations the HTTP layer calls, from
//!   authoring and token registration through to the pull path.
//! - [`NotificationScheduler`]: background sweep that dispatches due
//!   scheduled notifications exactly once.
//! - [`Dispatcher`]: bounded, timeout-guarded fan-out to a [`PushSender`].
//! - [`delivery`]: push transports (FCM, and a logging fallback).

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod payload;
pub mod resolver;
pub mod scheduler;
pub mod sender;
pub mod service;

pub use config::SchedulerConfig;
pub use delivery::fcm::{AccessToken, FcmConfig, FcmSender};
pub use delivery::log::LogSender;
pub use dispatcher::{DispatchResult, Dispatcher, FailureKind, TokenFailure};
pub use error::ServiceError;
pub use payload::PushPayload;
pub use resolver::AudienceResolver;
pub use scheduler::{NotificationScheduler, SweepReport};
pub use sender::{PushError, PushSender};
pub use service::{CreatedNotification, NotificationService};
