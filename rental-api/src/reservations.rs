use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use chrono::Utc;
use rental_core::CoreError;
use rental_reservation::{NewReservation, Reservation, StatusUpdate};
use rental_shared::events::{topics, ReservationCreatedEvent, ReservationStatusChangedEvent};
use uuid::Uuid;

use crate::access::require_offer_owner;
use crate::error::{AppError, AppJson};
use crate::events::publish;
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/v1/offers/{id}/reservations",
            get(list_offer_reservations).post(create_reservation),
        )
        .route("/v1/reservations/{id}", get(get_reservation).patch(update_reservation))
}

/// POST /v1/offers/{id}/reservations
/// Stores a `new` reservation; the offer's stock is only taken on acceptance.
async fn create_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(offer_id): Path<Uuid>,
    AppJson(req): AppJson<NewReservation>,
) -> Result<(StatusCode, Json<Reservation>), AppError> {
    let reservation = state.reservations.create_reservation(offer_id, user.id, req).await?;
    state.metrics.reservation_created();

    let event = ReservationCreatedEvent {
        reservation_id: reservation.id,
        offer_id,
        user_id: user.id,
        count: reservation.count,
        timestamp: Utc::now().timestamp(),
    };
    publish(&state, topics::RESERVATION_CREATED, reservation.id, &event).await;

    Ok((StatusCode::CREATED, Json(reservation)))
}

/// GET /v1/offers/{id}/reservations
async fn list_offer_reservations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(offer_id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    require_offer_owner(&state, offer_id, &user).await?;
    Ok(Json(state.reservations.list_offer_reservations(offer_id).await?))
}

/// GET /v1/reservations/{id}
/// Visible to the customer who made it and to the offer's operator.
async fn get_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = find_reservation(&state, id).await?;
    if reservation.user_id != user.id {
        require_offer_owner(&state, reservation.offer_id, &user).await?;
    }
    Ok(Json(reservation))
}

/// PATCH /v1/reservations/{id}
/// Body: `{"status": "...", "count": n}`. `count` is optional.
/// Only the operator owning the offer moves a reservation.
async fn update_reservation(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    AppJson(update): AppJson<StatusUpdate>,
) -> Result<Json<Reservation>, AppError> {
    let reservation = find_reservation(&state, id).await?;
    require_offer_owner(&state, reservation.offer_id, &user).await?;

    let change = match state.reservations.update_status(id, update).await {
        Ok(change) => change,
        Err(err @ CoreError::InsufficientInventory { .. }) => {
            state.metrics.inventory_rejected();
            tracing::info!(reservation_id = %id, "Acceptance rejected: {}", err);
            return Err(err.into());
        }
        Err(err) => return Err(err.into()),
    };

    let transition = change.transition;
    state.metrics.transition(&transition);
    tracing::info!(
        reservation_id = %id,
        from = %transition.from,
        to = %transition.to,
        offer_count = transition.offer_count,
        "Reservation status changed"
    );

    let event = ReservationStatusChangedEvent {
        reservation_id: id,
        offer_id: change.reservation.offer_id,
        from_status: transition.from.to_string(),
        to_status: transition.to.to_string(),
        count: transition.count,
        offer_count: transition.offer_count,
        timestamp: Utc::now().timestamp(),
    };
    publish(&state, topics::RESERVATION_STATUS_CHANGED, id, &event).await;

    Ok(Json(change.reservation))
}

async fn find_reservation(state: &AppState, id: Uuid) -> Result<Reservation, AppError> {
    state
        .reservations
        .get_reservation(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("reservation {} not found", id)))
}
