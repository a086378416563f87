use thiserror::Error;

/// Errors raised while registering a route.
///
/// Every pattern is checked once, when it enters the route table, so that a
/// malformed pattern never reaches request handling.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("route pattern `{pattern}` declares unknown parameter type `{tag}`")]
    UnknownParamType { pattern: String, tag: String },

    #[error("route pattern `{pattern}` declares parameter `{name}` more than once")]
    DuplicateParam { pattern: String, name: String },

    #[error("invalid body schema for `{pattern}`: {message}")]
    InvalidSchema { pattern: String, message: String },
}

impl RouteError {
    pub(crate) fn invalid(pattern: &str, reason: impl Into<String>) -> Self {
        RouteError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.into(),
        }
    }
}
