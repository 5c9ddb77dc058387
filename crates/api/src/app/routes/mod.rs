use axum::{
    Router,
    routing::{get, post},
};

pub mod demand;
pub mod license;
pub mod products;
pub mod recommendations;
pub mod system;

/// Router for every endpoint except `/health`.
pub fn router() -> Router {
    Router::new()
        .route("/verify-license", post(license::verify_license))
        .route("/predict", post(demand::predict))
        .route("/user_recommendations", post(recommendations::user_recommendations))
        .route("/api/products", get(products::list_products))
}
