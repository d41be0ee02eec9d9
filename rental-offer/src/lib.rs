pub mod models;
pub mod rating;
pub mod filters;

pub use models::{BoardOffer, NewOffer, Offer, OfferDetail, OfferPatch};
pub use rating::{general_rating, NewRating, Rating};
pub use filters::{OfferFilter, OfferLabels};

/// Maximum length of free-text descriptions and comments.
pub const TEXT_MAX_LEN: usize = 2000;

#[derive(Debug, thiserror::Error)]
pub enum OfferError {
    #[error("Invalid offer: {0}")]
    InvalidOffer(String),

    #[error("Invalid rating: {0}")]
    InvalidRating(String),
}
