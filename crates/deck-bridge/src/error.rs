use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use deck_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("{0}")]
    Validation(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// Wire shape for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub kind: String,
}

impl BridgeError {
    fn status(&self) -> StatusCode {
        match self {
            BridgeError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            BridgeError::NotFound(_) => StatusCode::NOT_FOUND,
            BridgeError::BadRequest(_) => StatusCode::BAD_REQUEST,
            BridgeError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            BridgeError::Validation(_) => "validation",
            BridgeError::NotFound(_) => "not_found",
            BridgeError::BadRequest(_) => "bad_request",
            BridgeError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for BridgeError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.to_string(),
            kind: self.kind().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

impl From<StoreError> for BridgeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(message) => BridgeError::Validation(message),
            StoreError::NotFound { kind, id } => BridgeError::NotFound(format!("{kind}:{id}")),
            err @ StoreError::UnsupportedVersion { .. } => BridgeError::Internal(err.to_string()),
            err @ (StoreError::Io { .. } | StoreError::Json { .. }) => {
                BridgeError::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_bridge_kinds() {
        let err = BridgeError::from(StoreError::Validation("bad".to_string()));
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.kind(), "validation");

        let err = BridgeError::from(StoreError::NotFound {
            kind: "task",
            id: "T1".to_string(),
        });
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.to_string(), "not found: task:T1");

        let err = BridgeError::from(StoreError::UnsupportedVersion { found: 9 });
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
