use rental_core::Company;
use uuid::Uuid;

use crate::{error::AppError, middleware::CurrentUser, state::AppState};

pub(crate) fn require_company_owner(company: &Company, user: &CurrentUser) -> Result<(), AppError> {
    if company.user_id != user.id {
        return Err(AppError::AuthorizationError("Not the owner of this company".into()));
    }
    Ok(())
}

/// Operators act on rental points of the company they own.
pub(crate) async fn require_point_owner(
    state: &AppState,
    rental_point_id: Uuid,
    user: &CurrentUser,
) -> Result<(), AppError> {
    let point = state
        .companies
        .get_rental_point(rental_point_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("rental point {} not found", rental_point_id)))?;

    let company = state
        .companies
        .get_company(point.point.company_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("company {} not found", point.point.company_id)))?;

    require_company_owner(&company.company, user)
}

pub(crate) async fn require_offer_owner(state: &AppState, offer_id: Uuid, user: &CurrentUser) -> Result<(), AppError> {
    let offer = state
        .offers
        .get_offer(offer_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError(format!("offer {} not found", offer_id)))?;

    require_point_owner(state, offer.offer.rental_point_id, user).await
}
