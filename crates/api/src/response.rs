//! Success envelope shared by every handler.
//!
//! Errors use a different shape, `{ "error", "code" }`, produced by
//! [`AppError`](crate::error::AppError).

use serde::Serialize;

/// `{ "data": T }`
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
