use async_trait::async_trait;
use rental_catalog::{NewPrice, Price, Product};
use rental_offer::{BoardOffer, NewOffer, NewRating, Offer, OfferDetail, OfferFilter, OfferPatch, Rating};
use rental_reservation::{NewReservation, Reservation, StatusUpdate, Transition};
use serde::Serialize;
use uuid::Uuid;

use crate::company::{Company, CompanyWithPoints, NewCompany, NewRentalPoint, RentalPoint, RentalPointSummary};
use crate::CoreResult;

/// Repository trait for companies and their rental points
#[async_trait]
pub trait CompanyRepository: Send + Sync {
    /// Fails with `Conflict` when the user already owns a company.
    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> CoreResult<Company>;

    async fn get_company(&self, id: Uuid) -> CoreResult<Option<CompanyWithPoints>>;

    async fn company_for_user(&self, user_id: Uuid) -> CoreResult<Option<CompanyWithPoints>>;

    async fn list_companies(&self) -> CoreResult<Vec<CompanyWithPoints>>;

    async fn create_rental_point(&self, company_id: Uuid, point: NewRentalPoint) -> CoreResult<RentalPoint>;

    /// All rental points, or only those of `company_id`.
    async fn list_rental_points(&self, company_id: Option<Uuid>) -> CoreResult<Vec<RentalPointSummary>>;

    async fn get_rental_point(&self, id: Uuid) -> CoreResult<Option<RentalPointSummary>>;
}

/// Repository trait for product catalog access
#[async_trait]
pub trait ProductRepository: Send + Sync {
    async fn list_products(&self) -> CoreResult<Vec<Product>>;

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>>;
}

/// An offer after an operator edit, with the stock it had before.
#[derive(Debug, Clone)]
pub struct OfferUpdate {
    pub offer: Offer,
    pub previous_count: i32,
}

/// Repository trait for offer data access
#[async_trait]
pub trait OfferRepository: Send + Sync {
    async fn create_offer(&self, offer: NewOffer) -> CoreResult<Offer>;

    /// Operator edit. Serialized with reservation transitions on the same offer.
    async fn update_offer(&self, id: Uuid, patch: OfferPatch) -> CoreResult<OfferUpdate>;

    async fn delete_offer(&self, id: Uuid) -> CoreResult<()>;

    async fn get_offer(&self, id: Uuid) -> CoreResult<Option<OfferDetail>>;

    async fn list_offers(&self, filter: &OfferFilter) -> CoreResult<Vec<OfferDetail>>;

    async fn list_rental_point_offers(&self, rental_point_id: Uuid) -> CoreResult<Vec<OfferDetail>>;

    /// Active offers only.
    async fn board_offers(&self) -> CoreResult<Vec<BoardOffer>>;

    async fn add_price(&self, offer_id: Uuid, price: NewPrice) -> CoreResult<Price>;

    async fn list_prices(&self, offer_id: Uuid) -> CoreResult<Vec<Price>>;

    async fn add_rating(&self, offer_id: Uuid, user_id: Uuid, rating: NewRating) -> CoreResult<Rating>;

    async fn list_ratings(&self, offer_id: Uuid) -> CoreResult<Vec<Rating>>;
}

/// Result of a committed status transition.
#[derive(Debug, Clone, Serialize)]
pub struct ReservationChange {
    pub reservation: Reservation,
    pub transition: Transition,
}

/// Repository trait for reservation data access
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Stores a `new` reservation. Offer stock is left untouched.
    async fn create_reservation(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        reservation: NewReservation,
    ) -> CoreResult<Reservation>;

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>>;

    async fn list_offer_reservations(&self, offer_id: Uuid) -> CoreResult<Vec<Reservation>>;

    async fn list_rental_point_reservations(&self, rental_point_id: Uuid) -> CoreResult<Vec<Reservation>>;

    /// Applies a status transition and the matching stock adjustment as one
    /// unit: either both the offer and the reservation are written, or
    /// neither is. Concurrent calls touching the same offer are serialized.
    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> CoreResult<ReservationChange>;
}
