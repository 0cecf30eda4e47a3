//! Common error types used across the workspace.
//!
//! Each failure class is its own typed error; [`FieldHubError`] aggregates
//! them with `#[from]` conversions so `?` works across layers.

use crate::value::ValueKind;

/// Top-level error for every fieldhub operation.
#[derive(Debug, thiserror::Error)]
pub enum FieldHubError {
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("duplicate name")]
    DuplicateName(#[from] DuplicateNameError),

    #[error("type mismatch")]
    TypeMismatch(#[from] TypeMismatchError),

    #[error("transient read failure")]
    TransientRead(#[from] TransientReadError),

    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("notification delivery failed")]
    Delivery(#[from] DeliveryError),
}

/// A device, variable, method or subscription does not exist.
#[derive(Debug, thiserror::Error)]
#[error("{entity} '{id}' not found")]
pub struct NotFoundError {
    /// Kind of thing that was looked up (`"Device"`, `"Variable"`, …).
    pub entity: &'static str,
    /// The name or id that failed to resolve.
    pub id: String,
}

/// A registry insertion collided with an existing name.
#[derive(Debug, thiserror::Error)]
#[error("{entity} '{name}' already exists")]
pub struct DuplicateNameError {
    pub entity: &'static str,
    pub name: String,
}

/// A write carried a value whose kind differs from the variable's kind.
#[derive(Debug, thiserror::Error)]
#[error("variable '{variable}' expects {expected}, got {actual}")]
pub struct TypeMismatchError {
    pub variable: String,
    pub expected: ValueKind,
    pub actual: ValueKind,
}

/// A variable could not be read right now; a later attempt may succeed.
#[derive(Debug, thiserror::Error)]
#[error("variable '{variable}' is unreadable: {reason}")]
pub struct TransientReadError {
    pub variable: String,
    pub reason: &'static str,
}

/// Domain invariant violations.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("'{0}' is declared more than once")]
    DuplicateChild(String),

    #[error("sampling interval must be greater than zero")]
    ZeroInterval,

    #[error("at least one variable must be monitored")]
    NoVariables,

    #[error("subscription engine has been shut down")]
    EngineStopped,
}

/// A notification sink refused a notification.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The receiving side of a channel sink has gone away.
    #[error("notification receiver closed")]
    Closed,

    /// The sink panicked while handling the notification.
    #[error("notification sink panicked")]
    Panicked,
}
