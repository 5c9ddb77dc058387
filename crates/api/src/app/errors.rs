use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use meditrust_forecast::ForecastError;
use meditrust_infra::InfraError;
use meditrust_license::LicenseError;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

pub fn validation(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

pub fn model_unavailable(model: &str) -> axum::response::Response {
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "model_unavailable",
        format!("{model} model could not be loaded"),
    )
}

/// Malformed or non-JSON bodies are client errors.
pub fn json_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    validation(rejection.body_text())
}

pub fn forecast_error_to_response(err: ForecastError) -> axum::response::Response {
    match err {
        ForecastError::UnknownProduct(_) => {
            json_error(StatusCode::BAD_REQUEST, "unknown_product", err.to_string())
        }
        ForecastError::InvalidInput(msg) => validation(msg),
        ForecastError::Domain(e) => validation(e.to_string()),
        other => {
            tracing::error!(error = %other, "demand inference failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "inference_error", other.to_string())
        }
    }
}

pub fn license_error_to_response(err: LicenseError) -> axum::response::Response {
    match err {
        LicenseError::InvalidInput(msg) => validation(msg),
        other => {
            tracing::error!(error = %other, "license classification failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "inference_error", other.to_string())
        }
    }
}

pub fn infra_error_to_response(err: InfraError) -> axum::response::Response {
    match err {
        InfraError::Domain(e) => validation(e.to_string()),
        other => {
            tracing::error!(error = %other, "store operation failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", other.to_string())
        }
    }
}

/// A blocking inference task that panicked or was cancelled.
pub fn join_error_to_response(err: tokio::task::JoinError) -> axum::response::Response {
    tracing::error!(error = %err, "inference task failed");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "inference_error",
        "inference task failed",
    )
}
