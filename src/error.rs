use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Failures a monitor request can end in. None of them are retried.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("No monitor for phase {0}")]
    UnknownPhase(i32),

    #[error("Invalid export status: {0:?}")]
    InvalidStatus(String),

    #[error("Required tables not found: {}", .0.join(", "))]
    MissingTables(Vec<String>),

    #[error("Query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
}

impl IntoResponse for MonitorError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            MonitorError::UnknownPhase(_) | MonitorError::InvalidStatus(_) => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            MonitorError::MissingTables(_) => {
                log::error!("{}", self);
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            MonitorError::Query(e) => {
                log::error!("Query failed: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Query failed".to_string())
            }
            MonitorError::Export(e) => {
                log::error!("Export failed: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Export failed".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
