use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch, post},
    Extension, Json, Router,
};
use chrono::Utc;
use rental_catalog::{NewPrice, Price};
use rental_offer::{BoardOffer, NewOffer, NewRating, Offer, OfferDetail, OfferFilter, OfferPatch, Rating};
use rental_shared::events::{topics, OfferStockChangedEvent};
use uuid::Uuid;

use crate::access::{require_offer_owner, require_point_owner};
use crate::error::{AppError, AppJson};
use crate::events::publish;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/offers", get(list_offers))
        .route("/v1/offers/board", get(board_offers))
        .route("/v1/offers/{id}", get(get_offer))
        .route("/v1/offers/{id}/prices", get(list_prices))
        .route("/v1/offers/{id}/ratings", get(list_ratings))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/offers", post(create_offer))
        .route("/v1/offers/{id}", patch(update_offer).delete(delete_offer))
        .route("/v1/offers/{id}/prices", post(add_price))
        .route("/v1/offers/{id}/ratings", post(add_rating))
}

/// POST /v1/offers
async fn create_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AppJson(req): AppJson<NewOffer>,
) -> Result<(StatusCode, Json<Offer>), AppError> {
    require_point_owner(&state, req.rental_point_id, &user).await?;
    let offer = state.offers.create_offer(req).await?;
    tracing::info!(offer_id = %offer.id, count = offer.count, "Offer created");
    Ok((StatusCode::CREATED, Json(offer)))
}

/// PATCH /v1/offers/{id}
/// Moving the offer to another rental point requires owning that one too.
async fn update_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(patch): AppJson<OfferPatch>,
) -> Result<Json<Offer>, AppError> {
    require_offer_owner(&state, id, &user).await?;
    if let Some(rental_point_id) = patch.rental_point_id {
        require_point_owner(&state, rental_point_id, &user).await?;
    }

    let update = state.offers.update_offer(id, patch).await?;

    if update.previous_count != update.offer.count {
        let event = OfferStockChangedEvent {
            offer_id: id,
            previous_count: update.previous_count,
            count: update.offer.count,
            timestamp: Utc::now().timestamp(),
        };
        publish(&state, topics::OFFER_STOCK_CHANGED, id, &event).await;
    }

    Ok(Json(update.offer))
}

/// DELETE /v1/offers/{id}
/// Removes the offer with its prices, ratings and reservations.
async fn delete_offer(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_offer_owner(&state, id, &user).await?;
    state.offers.delete_offer(id).await?;
    tracing::info!(offer_id = %id, "Offer deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /v1/offers/{id}
async fn get_offer(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OfferDetail>, AppError> {
    state
        .offers
        .get_offer(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("offer {} not found", id)))
}

/// GET /v1/offers?category=&city=&company=
async fn list_offers(
    State(state): State<AppState>,
    Query(filter): Query<OfferFilter>,
) -> Result<Json<Vec<OfferDetail>>, AppError> {
    Ok(Json(state.offers.list_offers(&filter).await?))
}

/// GET /v1/offers/board
async fn board_offers(State(state): State<AppState>) -> Result<Json<Vec<BoardOffer>>, AppError> {
    Ok(Json(state.offers.board_offers().await?))
}

/// POST /v1/offers/{id}/prices
async fn add_price(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(offer_id): Path<Uuid>,
    AppJson(req): AppJson<NewPrice>,
) -> Result<(StatusCode, Json<Price>), AppError> {
    require_offer_owner(&state, offer_id, &user).await?;
    let price = state.offers.add_price(offer_id, req).await?;
    Ok((StatusCode::CREATED, Json(price)))
}

/// GET /v1/offers/{id}/prices
async fn list_prices(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Vec<Price>>, AppError> {
    Ok(Json(state.offers.list_prices(offer_id).await?))
}

/// POST /v1/offers/{id}/ratings
async fn add_rating(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(offer_id): Path<Uuid>,
    AppJson(req): AppJson<NewRating>,
) -> Result<(StatusCode, Json<Rating>), AppError> {
    let rating = state.offers.add_rating(offer_id, user.id, req).await?;
    Ok((StatusCode::CREATED, Json(rating)))
}

/// GET /v1/offers/{id}/ratings
async fn list_ratings(
    State(state): State<AppState>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Vec<Rating>>, AppError> {
    Ok(Json(state.offers.list_ratings(offer_id).await?))
}
