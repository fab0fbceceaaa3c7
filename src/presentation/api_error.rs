// HTTP error mapping for handler results
use crate::domain::error::{DashboardError, ValidationError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Dashboard(#[from] DashboardError),

    /// An external feed failed.
    #[error(transparent)]
    Upstream(#[from] anyhow::Error),

    #[error("{0}")]
    Unprocessable(String),

    #[error("{0}")]
    Unauthorized(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Dashboard(err) => match err {
                DashboardError::Validation(ValidationError::UnknownType(_))
                | DashboardError::WidgetNotFound(_) => StatusCode::NOT_FOUND,
                DashboardError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
                DashboardError::SubscribeAuth(_) => StatusCode::UNAUTHORIZED,
                DashboardError::ConfigurationRead(_)
                | DashboardError::RecordRead(_)
                | DashboardError::Persist(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Upstream(err) => format!("{:#}", err),
            other => other.to_string(),
        };

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
