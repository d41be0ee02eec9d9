pub mod product;
pub mod pricing;

pub use product::Product;
pub use pricing::{sort_tariffs, NewPrice, Price, TimeUnit};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Unknown time unit: {0}")]
    UnknownTimeUnit(String),
}
