use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An item that can be rented out. Offers point at a product; products are
/// reference data maintained outside the public API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    /// Name of the category the product belongs to, if any.
    pub category: Option<String>,
}

impl Product {
    pub fn new(name: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
        }
    }
}
