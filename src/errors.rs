use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::error::DbErr;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::order_status::TransitionError;
use crate::models::sort_order::ReorderError;
use crate::notifications::PrintError;

fn current_request_id() -> Option<String> {
    crate::tracing::current_request_id().map(|rid| rid.as_str().to_string())
}

/// Error body returned by every failing endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "Conflict",
    "message": "Invalid transition: cannot mark_ready an order in status pending",
    "request_id": "req-abc123xyz",
    "timestamp": "2024-12-09T10:30:00.000Z"
}))]
pub struct ErrorResponse {
    /// HTTP status category (e.g., "Not Found", "Conflict")
    #[schema(example = "Not Found")]
    pub error: String,
    /// Human-readable error description
    pub message: String,
    /// Field-level validation messages, keyed by field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fields: Option<BTreeMap<String, Vec<String>>>,
    /// Unique request identifier for support and debugging
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "req-abc123xyz")]
    pub request_id: Option<String>,
    /// RFC 3339 timestamp when the error occurred
    pub timestamp: String,
}

#[derive(Debug, thiserror::Error, Serialize)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(
        #[from]
        #[serde(skip)]
        sea_orm::error::DbErr,
    ),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Field-level validation failure (422)
    #[error("Validation failed")]
    ValidationFailed(BTreeMap<String, Vec<String>>),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Concurrent modification: {0}")]
    ConcurrentModification(Uuid),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Event error: {0}")]
    EventError(String),

    #[error("Print error: {0}")]
    PrintError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Other error: {0}")]
    Other(
        #[from]
        #[serde(skip)]
        anyhow::Error,
    ),
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = BTreeMap::new();
        collect_field_errors(&err, "", &mut fields);
        ServiceError::ValidationFailed(fields)
    }
}

/// Nested structs are flattened into their parent's keys; list entries
/// become `name[i].field`.
fn collect_field_errors(
    err: &validator::ValidationErrors,
    prefix: &str,
    out: &mut BTreeMap<String, Vec<String>>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in err.errors() {
        match kind {
            ValidationErrorsKind::Field(errors) => {
                let messages = errors.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                });
                out.entry(format!("{}{}", prefix, field))
                    .or_default()
                    .extend(messages);
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(inner, prefix, out),
            ValidationErrorsKind::List(entries) => {
                for (index, inner) in entries {
                    let nested = format!("{}{}[{}].", prefix, field, index);
                    collect_field_errors(inner, &nested, out);
                }
            }
        }
    }
}

impl From<TransitionError> for ServiceError {
    fn from(err: TransitionError) -> Self {
        ServiceError::InvalidTransition(err.to_string())
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(err: serde_json::Error) -> Self {
        ServiceError::SerializationError(err.to_string())
    }
}

impl From<ReorderError> for ServiceError {
    fn from(err: ReorderError) -> Self {
        let ids = |ids: &[Uuid]| ids.iter().map(Uuid::to_string).collect::<Vec<_>>();
        let mut fields = BTreeMap::new();
        match &err {
            ReorderError::Empty => {
                fields.insert("items".to_string(), vec![err.to_string()]);
            }
            ReorderError::Duplicates(duplicates) => {
                fields.insert("items".to_string(), vec![err.to_string()]);
                fields.insert("duplicate_ids".to_string(), ids(duplicates));
            }
            ReorderError::Mismatch { missing, unknown } => {
                fields.insert("items".to_string(), vec![err.to_string()]);
                if !missing.is_empty() {
                    fields.insert("missing_ids".to_string(), ids(missing));
                }
                if !unknown.is_empty() {
                    fields.insert("unknown_ids".to_string(), ids(unknown));
                }
            }
        }
        ServiceError::ValidationFailed(fields)
    }
}

impl From<PrintError> for ServiceError {
    fn from(err: PrintError) -> Self {
        ServiceError::PrintError(err.to_string())
    }
}

impl ServiceError {
    /// Wraps a message as a database error.
    pub fn database_error_message(message: impl Into<String>) -> Self {
        ServiceError::DatabaseError(DbErr::Custom(message.into()))
    }

    /// Single-field validation failure.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = BTreeMap::new();
        fields.insert(field.to_string(), vec![message.into()]);
        ServiceError::ValidationFailed(fields)
    }

    /// Returns the HTTP status code for this error.
    /// This is the single source of truth for error-to-status mapping.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::ValidationError(_) | Self::ValidationFailed(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidTransition(_) | Self::ConcurrentModification(_) | Self::Conflict(_) => {
                StatusCode::CONFLICT
            }
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::EventError(_)
            | Self::PrintError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error message suitable for HTTP responses.
    /// Internal errors return generic messages to avoid leaking implementation details.
    pub fn response_message(&self) -> String {
        match self {
            Self::DatabaseError(_) => "Database error".to_string(),
            Self::EventError(_)
            | Self::PrintError(_)
            | Self::SerializationError(_)
            | Self::InternalError(_)
            | Self::Other(_) => "Internal server error".to_string(),
            Self::ConcurrentModification(id) => {
                format!(
                    "Order {} was modified by another request; reload and retry",
                    id
                )
            }
            _ => self.to_string(),
        }
    }

    fn fields(&self) -> Option<BTreeMap<String, Vec<String>>> {
        match self {
            Self::ValidationFailed(fields) => Some(fields.clone()),
            _ => None,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let err = ErrorResponse {
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message: self.response_message(),
            fields: self.fields(),
            request_id: current_request_id(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(err)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use validator::Validate;

    #[derive(Validate)]
    struct Sample {
        #[validate(length(min = 1, message = "name is required"))]
        name: String,
    }

    #[derive(Validate)]
    struct Wrapper {
        #[validate]
        inner: Sample,
        #[validate]
        lines: Vec<Sample>,
    }

    #[test]
    fn nested_errors_are_flattened() {
        let err: ServiceError = Wrapper {
            inner: Sample {
                name: String::new(),
            },
            lines: vec![
                Sample {
                    name: "ok".into(),
                },
                Sample {
                    name: String::new(),
                },
            ],
        }
        .validate()
        .unwrap_err()
        .into();

        match err {
            ServiceError::ValidationFailed(fields) => {
                assert!(fields.contains_key("name"));
                assert!(fields.contains_key("lines[1].name"));
                assert_eq!(fields.len(), 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn service_error_response_includes_request_id() {
        let response =
            crate::tracing::scope_request_id(crate::tracing::RequestId::new("req-123"), async {
                ServiceError::NotFound("missing".into()).into_response()
            })
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(payload.request_id.as_deref(), Some("req-123"));
    }

    #[tokio::test]
    async fn validation_failure_renders_field_messages() {
        let err: ServiceError = Sample {
            name: String::new(),
        }
        .validate()
        .unwrap_err()
        .into();

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let payload: ErrorResponse = serde_json::from_slice(&body).unwrap();
        let fields = payload.fields.expect("fields present");
        assert_eq!(fields["name"], vec!["name is required".to_string()]);
    }

    #[test]
    fn service_error_status_code_mapping() {
        assert_eq!(
            ServiceError::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ServiceError::InvalidTransition("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::ConcurrentModification(Uuid::nil()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ServiceError::field("driver_id", "required").status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ServiceError::Forbidden("x".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ServiceError::PrintError("printer offline".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn reorder_mismatch_lists_ids() {
        let stranger = Uuid::new_v4();
        let err: ServiceError = ReorderError::Mismatch {
            missing: vec![],
            unknown: vec![stranger],
        }
        .into();
        match err {
            ServiceError::ValidationFailed(fields) => {
                assert_eq!(fields["unknown_ids"], vec![stranger.to_string()]);
                assert!(!fields.contains_key("missing_ids"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn response_message_hides_internal_details() {
        assert_eq!(
            ServiceError::database_error_message("relation missing").response_message(),
            "Database error"
        );
        assert_eq!(
            ServiceError::PrintError("lp0 on fire".into()).response_message(),
            "Internal server error"
        );
        assert_eq!(
            ServiceError::Conflict("Section is in use".into()).response_message(),
            "Conflict: Section is in use"
        );
    }
}
