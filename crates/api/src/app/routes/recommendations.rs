use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, rejection::JsonRejection},
    http::StatusCode,
    response::IntoResponse,
};

use meditrust_core::ProductKey;
use meditrust_forecast::recommend::{HISTORY_LIMIT, TOP_N, rank_user_history};

use crate::app::services::AppServices;
use crate::app::{dto, errors};

fn respond(products: Vec<dto::RecommendedProduct>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(dto::UserRecommendationsResponse {
            recommended_products: products,
        }),
    )
        .into_response()
}

/// Rank the user's recently ordered products by predicted demand and return
/// the top ones with their catalog data, best first.
pub async fn user_recommendations(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<dto::UserRecommendationsRequest>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(b) => b,
        Err(rejection) => return errors::json_rejection_to_response(rejection),
    };

    let user = match body.user_id.as_ref().filter(|v| !dto::is_blank(v)) {
        Some(v) => match dto::parse_user_id(v) {
            Ok(u) => u,
            Err(e) => return errors::validation(e.to_string()),
        },
        None => return errors::validation("Missing user_id"),
    };

    let Some(forecaster) = services.forecaster() else {
        return errors::model_unavailable("demand");
    };

    let lines = match services.orders.recent_lines(user, HISTORY_LIMIT).await {
        Ok(lines) => lines,
        Err(e) => return errors::infra_error_to_response(e),
    };
    if lines.is_empty() {
        return respond(Vec::new());
    }

    let ranked =
        match tokio::task::spawn_blocking(move || rank_user_history(&*forecaster, &lines, TOP_N))
            .await
        {
            Ok(r) => r,
            Err(e) => return errors::join_error_to_response(e),
        };
    if ranked.is_empty() {
        return respond(Vec::new());
    }

    let keys: Vec<ProductKey> = ranked.iter().map(|p| p.product).collect();
    let catalog = match services.catalog.find_by_keys(&keys).await {
        Ok(rows) => rows,
        Err(e) => return errors::infra_error_to_response(e),
    };

    let products: Vec<dto::RecommendedProduct> = ranked
        .iter()
        .filter_map(|p| {
            let medicine = catalog.iter().find(|m| m.sr_number == p.product)?.clone();
            Some(dto::RecommendedProduct {
                medicine,
                predicted_quantity: p.predicted_quantity,
            })
        })
        .collect();

    tracing::info!(%user, ranked = keys.len(), returned = products.len(), "recommendations built");
    respond(products)
}
