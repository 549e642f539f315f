use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::time::Duration;

/// Dashboard error types.
///
/// Transport, status and malformed-body failures stay distinct here so callers
/// can log and test them, even though the polling store reports all three as a
/// single "request failed" message.
#[derive(Debug, Clone)]
pub enum DashboardError {
    /// The request never produced a response (connection refused, DNS, reset).
    Transport(String),
    /// The bounded request timeout elapsed.
    Timeout {
        /// Endpoint or resource-set name.
        resource: String,
        /// Configured limit.
        after: Duration,
    },
    /// The backend answered with a non-2xx status.
    Status {
        /// Endpoint or resource-set name.
        resource: String,
        /// HTTP status code.
        status: u16,
        /// `detail` field of the error body, when present.
        detail: Option<String>,
    },
    /// The body did not match the endpoint's schema.
    Malformed {
        /// Endpoint name.
        resource: String,
        /// Parser message.
        reason: String,
    },
    /// A local precondition failed before any request was sent.
    Validation(String),
    /// The view has not produced its first snapshot yet.
    NotReady(String),
    /// The view's first load failed and there is nothing to show.
    Unavailable(String),
    /// A CSV export could not be written.
    Export(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<DashboardError>,
        /// Additional context message.
        context: String,
    },
}

impl DashboardError {
    /// The message a user should see for this failure.
    ///
    /// The server-supplied `detail` wins; otherwise the error text itself.
    pub fn user_message(&self) -> String {
        match self {
            DashboardError::Status {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => detail.clone(),
            DashboardError::WithContext { source, .. } => source.user_message(),
            other => other.to_string(),
        }
    }

    /// Kind without context wrappers.
    pub fn root(&self) -> &DashboardError {
        match self {
            DashboardError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the failure came from the backend call (as opposed to local validation).
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self.root(),
            DashboardError::Transport(_)
                | DashboardError::Timeout { .. }
                | DashboardError::Status { .. }
                | DashboardError::Malformed { .. }
        )
    }
}

impl fmt::Display for DashboardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DashboardError::Transport(msg) => write!(f, "Request failed: {}", msg),
            DashboardError::Timeout { resource, after } => {
                write!(f, "{} timed out after {}s", resource, after.as_secs_f64())
            }
            DashboardError::Status {
                resource,
                status,
                detail,
            } => match detail {
                Some(detail) => write!(f, "{} returned {}: {}", resource, status, detail),
                None => write!(f, "{} returned {}", resource, status),
            },
            DashboardError::Malformed { resource, reason } => {
                write!(f, "Malformed response from {}: {}", resource, reason)
            }
            DashboardError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            DashboardError::NotReady(view) => write!(f, "{} is still loading", view),
            DashboardError::Unavailable(msg) => write!(f, "Unavailable: {}", msg),
            DashboardError::Export(msg) => write!(f, "Export failed: {}", msg),
            DashboardError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for DashboardError {}

impl IntoResponse for DashboardError {
    /// Maps each error variant to an HTTP status and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            DashboardError::Transport(msg) => {
                tracing::error!("Backend transport error: {}", msg);
                (StatusCode::BAD_GATEWAY, self.user_message())
            }
            DashboardError::Timeout { .. } => {
                tracing::error!("{}", self);
                (StatusCode::GATEWAY_TIMEOUT, self.user_message())
            }
            DashboardError::Status { status, .. } => {
                tracing::warn!("{}", self);
                // Client errors from the backend are the caller's problem, everything else is ours.
                let code = StatusCode::from_u16(*status)
                    .ok()
                    .filter(|s| s.is_client_error())
                    .unwrap_or(StatusCode::BAD_GATEWAY);
                (code, self.user_message())
            }
            DashboardError::Malformed { .. } => {
                tracing::error!("{}", self);
                (StatusCode::BAD_GATEWAY, self.user_message())
            }
            DashboardError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            DashboardError::NotReady(_) => (StatusCode::ACCEPTED, self.to_string()),
            DashboardError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            DashboardError::Export(msg) => {
                tracing::error!("CSV export failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Export failed".to_string(),
                )
            }
            DashboardError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return source.as_ref().clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

impl From<csv::Error> for DashboardError {
    fn from(err: csv::Error) -> Self {
        DashboardError::Export(err.to_string())
    }
}

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, DashboardError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, DashboardError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, DashboardError> {
    fn context(self, context: impl Into<String>) -> Result<T, DashboardError> {
        self.map_err(|e| DashboardError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, DashboardError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| DashboardError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_detail() {
        let err = DashboardError::Status {
            resource: "/api/settings/update".to_string(),
            status: 500,
            detail: Some("Failed to update settings".to_string()),
        };
        assert_eq!(err.user_message(), "Failed to update settings");
    }

    #[test]
    fn test_user_message_falls_back_to_display() {
        let err = DashboardError::Status {
            resource: "/api/summary".to_string(),
            status: 502,
            detail: None,
        };
        assert_eq!(err.user_message(), "/api/summary returned 502");
    }

    #[test]
    fn test_context_keeps_root_kind() {
        let err: Result<(), DashboardError> =
            Err(DashboardError::Transport("connection refused".to_string()));
        let wrapped = err.context("overview refresh").unwrap_err();

        assert!(wrapped.is_request_failure());
        assert!(matches!(wrapped.root(), DashboardError::Transport(_)));
        assert_eq!(
            wrapped.to_string(),
            "overview refresh: Request failed: connection refused"
        );
    }

    #[test]
    fn test_validation_is_not_request_failure() {
        let err = DashboardError::Validation("to_number is required".to_string());
        assert!(!err.is_request_failure());
    }

    #[test]
    fn test_status_mapping() {
        let not_found = DashboardError::Status {
            resource: "/api/credit-score/calculate".to_string(),
            status: 404,
            detail: Some("Customer not found".to_string()),
        };
        assert_eq!(not_found.into_response().status(), StatusCode::NOT_FOUND);

        let upstream = DashboardError::Status {
            resource: "/api/summary".to_string(),
            status: 500,
            detail: None,
        };
        assert_eq!(upstream.into_response().status(), StatusCode::BAD_GATEWAY);
    }
}
