use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use rental_core::{Company, CompanyWithPoints, NewCompany, NewRentalPoint, RentalPoint, RentalPointSummary};
use rental_offer::OfferDetail;
use rental_reservation::Reservation;
use uuid::Uuid;

use crate::access::{require_company_owner, require_point_owner};
use crate::error::{AppError, AppJson};
use crate::middleware::CurrentUser;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/companies/board", get(board_companies))
        .route("/v1/companies/board/{id}", get(board_company))
        .route("/v1/companies/{company_id}/rental-points", get(company_rental_points))
        .route("/v1/rental-points", get(list_rental_points))
        .route("/v1/rental-points/{id}", get(get_rental_point))
        .route("/v1/rental-points/{id}/offers", get(rental_point_offers))
}

pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .route("/v1/companies", post(create_company))
        .route("/v1/companies/me", get(my_company))
        .route("/v1/companies/{company_id}/rental-points", post(create_rental_point))
        .route("/v1/rental-points/{id}/reservations", get(rental_point_reservations))
}

/// POST /v1/companies
async fn create_company(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    AppJson(req): AppJson<NewCompany>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let company = state.companies.create_company(user.id, req).await?;
    tracing::info!(company_id = %company.id, user_id = %user.id, "Company created");
    Ok((StatusCode::CREATED, Json(company)))
}

/// GET /v1/companies/me
async fn my_company(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<CompanyWithPoints>, AppError> {
    state
        .companies
        .company_for_user(user.id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("User has no company".into()))
}

/// GET /v1/companies/board
async fn board_companies(State(state): State<AppState>) -> Result<Json<Vec<CompanyWithPoints>>, AppError> {
    Ok(Json(state.companies.list_companies().await?))
}

/// GET /v1/companies/board/{id}
async fn board_company(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<CompanyWithPoints>, AppError> {
    state
        .companies
        .get_company(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError(format!("company {} not found", id)))
}

/// POST /v1/companies/{company_id}/rental-points
/// Only the owner of the company may add points to it.
async fn create_rental_point(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(company_id): Path<Uuid>,
    AppJson(req): AppJson<NewRentalPoint>,
) -> Result<(StatusCode, Json<RentalPoint>), AppError> {
    let company = state
        .companies
        .get_company(company_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("company {} not found", company_id)))?;

    require_company_owner(&company.company, &user)?;

    let point = state.companies.create_rental_point(company_id, req).await?;
    Ok((StatusCode::CREATED, Json(point)))
}

/// GET /v1/companies/{company_id}/rental-points
async fn company_rental_points(
    State(state): State<AppState>,
    Path(company_id): Path<Uuid>,
) -> Result<Json<Vec<RentalPointSummary>>, AppError> {
    Ok(Json(state.companies.list_rental_points(Some(company_id)).await?))
}

/// GET /v1/rental-points
async fn list_rental_points(State(state): State<AppState>) -> Result<Json<Vec<RentalPointSummary>>, AppError> {
    Ok(Json(state.companies.list_rental_points(None).await?))
}

/// GET /v1/rental-points/{id}
async fn get_rental_point(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<RentalPointSummary>, AppError> {
    find_rental_point(&state, id).await.map(Json)
}

/// GET /v1/rental-points/{id}/offers
async fn rental_point_offers(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<OfferDetail>>, AppError> {
    find_rental_point(&state, id).await?;
    Ok(Json(state.offers.list_rental_point_offers(id).await?))
}

/// GET /v1/rental-points/{id}/reservations
/// Operator view; only the owning company sees it.
async fn rental_point_reservations(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Reservation>>, AppError> {
    require_point_owner(&state, id, &user).await?;
    Ok(Json(state.reservations.list_rental_point_reservations(id).await?))
}

async fn find_rental_point(state: &AppState, id: Uuid) -> Result<RentalPointSummary, AppError> {
    state
        .companies
        .get_rental_point(id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("rental point {} not found", id)))
}
