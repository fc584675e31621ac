//! Result envelopes returned by every manager operation
//!
//! Operations never return `Err`: the outcome, timing, an echo of the
//! request and any classified error travel together in an [`Envelope`].

use docindex_store::ErrorKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

use crate::error::LifecycleError;

#[derive(Debug)]
pub struct Envelope<T> {
    /// Primary result (`exists`, `index_name`, `acknowledged`...); `None` on error
    pub value: Option<T>,
    pub took_ms: u64,
    /// Echo of the inputs
    pub request: serde_json::Value,
    pub error: Option<LifecycleError>,
    pub error_kind: Option<ErrorKind>,
    /// Raw reply from the store, when there was one
    pub response: Option<serde_json::Value>,
}

impl<T> Envelope<T> {
    pub(crate) fn ok(
        value: T,
        started: Instant,
        request: serde_json::Value,
        response: Option<serde_json::Value>,
    ) -> Self {
        Self {
            value: Some(value),
            took_ms: elapsed_ms(started),
            request,
            error: None,
            error_kind: None,
            response,
        }
    }

    pub(crate) fn failed(
        error: LifecycleError,
        started: Instant,
        request: serde_json::Value,
    ) -> Self {
        Self {
            value: None,
            took_ms: elapsed_ms(started),
            request,
            error_kind: Some(error.kind()),
            error: Some(error),
            response: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl Envelope<bool> {
    /// `true` only when the call succeeded and answered yes
    pub fn is_true(&self) -> bool {
        self.value == Some(true)
    }
}

/// Outcome code of `create_if_needed` / `create_alias_if_needed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CreateCode {
    AlreadyExists,
    Created,
    Error,
}

impl CreateCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreateCode::AlreadyExists => "ALREADY_EXISTS",
            CreateCode::Created => "CREATED",
            CreateCode::Error => "ERROR",
        }
    }
}

impl fmt::Display for CreateCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug)]
pub struct CreateResult {
    pub code: CreateCode,
    pub took_ms: u64,
    pub error: Option<LifecycleError>,
}

pub(crate) fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
