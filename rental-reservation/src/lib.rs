pub mod models;
pub mod lifecycle;

pub use models::{NewReservation, Reservation, ReservationStatus, StatusUpdate};
pub use lifecycle::{StockAdjustment, Transition};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ReservationError {
    #[error("Insufficient inventory: requested {requested}, available {available}")]
    InsufficientInventory {
        requested: i32,
        available: i32,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unknown reservation status: {0}")]
    UnknownStatus(String),
}
