use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Next-order quantity for one product given its recent steps.
pub async fn predict(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::PredictRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let (product_id, seq) = match (body.product_id, body.seq) {
        (Some(p), Some(s)) if !dto::is_blank(&p) && !s.is_empty() => (p, s),
        _ => return errors::validation("Missing product_id or sequence"),
    };

    let Some(forecaster) = services.forecaster() else {
        return errors::model_unavailable("demand");
    };

    let product = match dto::parse_product_key(&product_id) {
        Ok(p) => p,
        Err(_) => {
            return errors::json_error(
                StatusCode::BAD_REQUEST,
                "unknown_product",
                format!("product id {product_id} not recognized"),
            );
        }
    };

    let predicted = match tokio::task::spawn_blocking(move || forecaster.predict(product, &seq)).await
    {
        Ok(Ok(q)) => q,
        Ok(Err(e)) => return errors::forecast_error_to_response(e),
        Err(e) => return errors::join_error_to_response(e),
    };

    tracing::info!(%product, predicted, "demand predicted");

    (
        StatusCode::OK,
        Json(dto::PredictResponse {
            predicted_quantity: predicted,
        }),
    )
        .into_response()
}
