use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn verify_license(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::VerifyLicenseRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let license_number = match body.license_number {
        Some(n) if !n.trim().is_empty() => n,
        _ => return errors::validation("License number is required"),
    };

    let Some(classifier) = services.license_classifier() else {
        return errors::model_unavailable("license");
    };

    let input = license_number.clone();
    let verdict = match tokio::task::spawn_blocking(move || classifier.classify(&input)).await {
        Ok(Ok(v)) => v,
        Ok(Err(e)) => return errors::license_error_to_response(e),
        Err(e) => return errors::join_error_to_response(e),
    };

    tracing::info!(verified = verdict.is_valid(), "license checked");

    (
        StatusCode::OK,
        Json(dto::VerifyLicenseResponse {
            verified: verdict.is_valid(),
            license_number,
        }),
    )
        .into_response()
}
