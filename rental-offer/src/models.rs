use chrono::{DateTime, Utc};
use rental_catalog::Price;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rating::Rating;
use crate::{OfferError, TEXT_MAX_LEN};

/// A batch of identical items a rental point puts up for rent.
///
/// `count` is the stock still available for new acceptances. It never goes
/// below zero: operator edits are validated and reservation transitions
/// check availability before taking stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Offer {
    pub id: Uuid,
    pub is_active: bool,
    pub description: String,
    pub count: i32,
    pub is_for_child: bool,
    pub is_female: bool,
    pub is_male: bool,
    pub is_unisex: bool,
    pub product_id: Option<Uuid>,
    pub rental_point_id: Uuid,
    pub created_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewOffer {
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub description: String,
    pub count: i32,
    #[serde(default)]
    pub is_for_child: bool,
    #[serde(default)]
    pub is_female: bool,
    #[serde(default)]
    pub is_male: bool,
    #[serde(default)]
    pub is_unisex: bool,
    pub product_id: Option<Uuid>,
    pub rental_point_id: Uuid,
}

impl NewOffer {
    pub fn validate(&self) -> Result<(), OfferError> {
        validate_count(self.count)?;
        validate_description(&self.description)
    }

    pub fn into_offer(self) -> Offer {
        Offer {
            id: Uuid::new_v4(),
            is_active: self.is_active,
            description: self.description,
            count: self.count,
            is_for_child: self.is_for_child,
            is_female: self.is_female,
            is_male: self.is_male,
            is_unisex: self.is_unisex,
            product_id: self.product_id,
            rental_point_id: self.rental_point_id,
            created_at: Utc::now(),
        }
    }
}

/// Operator edit of an offer. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferPatch {
    pub is_active: Option<bool>,
    pub description: Option<String>,
    pub count: Option<i32>,
    pub is_for_child: Option<bool>,
    pub is_female: Option<bool>,
    pub is_male: Option<bool>,
    pub is_unisex: Option<bool>,
    pub product_id: Option<Uuid>,
    pub rental_point_id: Option<Uuid>,
}

impl OfferPatch {
    pub fn validate(&self) -> Result<(), OfferError> {
        if let Some(count) = self.count {
            validate_count(count)?;
        }
        if let Some(description) = &self.description {
            validate_description(description)?;
        }
        Ok(())
    }

    pub fn apply(self, offer: &mut Offer) {
        if let Some(v) = self.is_active {
            offer.is_active = v;
        }
        if let Some(v) = self.description {
            offer.description = v;
        }
        if let Some(v) = self.count {
            offer.count = v;
        }
        if let Some(v) = self.is_for_child {
            offer.is_for_child = v;
        }
        if let Some(v) = self.is_female {
            offer.is_female = v;
        }
        if let Some(v) = self.is_male {
            offer.is_male = v;
        }
        if let Some(v) = self.is_unisex {
            offer.is_unisex = v;
        }
        if self.product_id.is_some() {
            offer.product_id = self.product_id;
        }
        if let Some(v) = self.rental_point_id {
            offer.rental_point_id = v;
        }
    }
}

fn validate_count(count: i32) -> Result<(), OfferError> {
    if count < 0 {
        return Err(OfferError::InvalidOffer("count must not be negative".into()));
    }
    Ok(())
}

fn validate_description(description: &str) -> Result<(), OfferError> {
    if description.chars().count() > TEXT_MAX_LEN {
        return Err(OfferError::InvalidOffer(format!(
            "description is longer than {} characters",
            TEXT_MAX_LEN
        )));
    }
    Ok(())
}

/// Full view of an offer as shown in the operator's cabinet.
#[derive(Debug, Clone, Serialize)]
pub struct OfferDetail {
    #[serde(flatten)]
    pub offer: Offer,
    pub product: Option<String>,
    pub category: Option<String>,
    pub prices: Vec<Price>,
    pub ratings: Vec<Rating>,
    pub general_rating: f64,
}

/// Compact offer shown on the public board.
#[derive(Debug, Clone, Serialize)]
pub struct BoardOffer {
    pub id: Uuid,
    pub is_active: bool,
    pub description: String,
    pub count: i32,
    pub product_id: Option<Uuid>,
    /// Human readable address of the rental point.
    pub rental_point: String,
}

impl BoardOffer {
    pub fn new(offer: &Offer, rental_point: String) -> Self {
        Self {
            id: offer.id,
            is_active: offer.is_active,
            description: offer.description.clone(),
            count: offer.count,
            product_id: offer.product_id,
            rental_point,
        }
    }
}
