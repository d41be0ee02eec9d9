pub mod company;
pub mod events;
pub mod repository;

use rental_catalog::CatalogError;
use rental_offer::OfferError;
use rental_reservation::ReservationError;

pub use company::{Address, Company, CompanyWithPoints, NewCompany, NewRentalPoint, RentalPoint, RentalPointSummary};
pub use events::EventPublisher;
pub use repository::{
    CompanyRepository, OfferRepository, OfferUpdate, ProductRepository, ReservationChange, ReservationRepository,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Validation failed: {0}")]
    ValidationError(String),
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory { requested: i32, available: i32 },
    #[error("Storage error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl CoreError {
    pub fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        CoreError::NotFound(format!("{} {}", what, id))
    }

    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        CoreError::Backend(Box::new(err))
    }
}

impl From<ReservationError> for CoreError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InsufficientInventory { requested, available } => {
                CoreError::InsufficientInventory { requested, available }
            }
            ReservationError::Validation(msg) => CoreError::ValidationError(msg),
            err @ ReservationError::UnknownStatus(_) => CoreError::backend(err),
        }
    }
}

impl From<OfferError> for CoreError {
    fn from(err: OfferError) -> Self {
        CoreError::ValidationError(err.to_string())
    }
}

impl From<CatalogError> for CoreError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::InvalidPrice(_) => CoreError::ValidationError(err.to_string()),
            CatalogError::UnknownTimeUnit(_) => CoreError::backend(err),
        }
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
