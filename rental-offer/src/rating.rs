use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{OfferError, TEXT_MAX_LEN};

pub const MIN_MARK: i16 = 1;
pub const MAX_MARK: i16 = 5;

/// A user's mark for an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Rating {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub mark: i16,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRating {
    pub mark: i16,
    #[serde(default)]
    pub comment: String,
}

impl NewRating {
    pub fn validate(&self) -> Result<(), OfferError> {
        if !(MIN_MARK..=MAX_MARK).contains(&self.mark) {
            return Err(OfferError::InvalidRating(format!(
                "mark must be between {} and {}",
                MIN_MARK, MAX_MARK
            )));
        }
        if self.comment.chars().count() > TEXT_MAX_LEN {
            return Err(OfferError::InvalidRating(format!(
                "comment is longer than {} characters",
                TEXT_MAX_LEN
            )));
        }
        Ok(())
    }

    pub fn into_rating(self, offer_id: Uuid, user_id: Uuid) -> Rating {
        Rating {
            id: Uuid::new_v4(),
            offer_id,
            user_id,
            mark: self.mark,
            comment: self.comment,
        }
    }
}

/// Average mark rounded to two decimals, `0.0` when nothing was rated.
pub fn general_rating<I>(marks: I) -> f64
where
    I: IntoIterator<Item = i16>,
{
    let (sum, n) = marks
        .into_iter()
        .fold((0i64, 0i64), |(sum, n), mark| (sum + i64::from(mark), n + 1));

    if n == 0 {
        return 0.0;
    }

    let avg = sum as f64 / n as f64;
    (avg * 100.0).round() / 100.0
}
