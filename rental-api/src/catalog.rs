use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use rental_catalog::Product;
use uuid::Uuid;

use crate::{error::AppError, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/products", get(list_products))
        .route("/v1/products/{id}", get(get_product))
}

/// GET /v1/products
async fn list_products(State(state): State<AppState>) -> Result<Json<Vec<Product>>, AppError> {
    Ok(Json(state.products.list_products().await?))
}

/// GET /v1/products/{id}
async fn get_product(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>, AppError> {
    state
        .products
        .get_product(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("product {} not found", id)))
}
