//! Route handlers, grouped by resource.
//!
//! Successful responses are JSON objects with `"success": true` and the
//! payload under a named key.

pub(crate) mod beds;
pub(crate) mod locations;
pub(crate) mod patients;
pub(crate) mod reports;

use axum::Json;
use serde_json::Value;

use super::ApiError;

/// Result type of handlers answering with a JSON object.
pub(crate) type ApiResult = Result<Json<Value>, ApiError>;

/// Default page size for history and search listings.
pub(crate) const DEFAULT_LIMIT: usize = 50;
