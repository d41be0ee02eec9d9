use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::ReservationError;

/// Reservation status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    #[default]
    New,
    Accepted,
    Canceled,
    Declined,
    Done,
}

impl ReservationStatus {
    pub const ALL: [ReservationStatus; 5] = [
        ReservationStatus::New,
        ReservationStatus::Accepted,
        ReservationStatus::Canceled,
        ReservationStatus::Declined,
        ReservationStatus::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::New => "new",
            ReservationStatus::Accepted => "accepted",
            ReservationStatus::Canceled => "canceled",
            ReservationStatus::Declined => "declined",
            ReservationStatus::Done => "done",
        }
    }

    /// Whether a reservation in this status has stock taken from its offer.
    pub fn holds_inventory(&self) -> bool {
        matches!(self, ReservationStatus::Accepted)
    }
}

impl fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReservationStatus {
    type Err = ReservationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReservationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ReservationError::UnknownStatus(s.to_string()))
    }
}

/// A user's request to hold some quantity of an offer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reservation {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub count: i32,
    pub datetime_from: Option<DateTime<Utc>>,
    pub datetime_to: Option<DateTime<Utc>>,
    pub status: ReservationStatus,
    pub created_at: DateTime<Utc>,
}

fn default_count() -> i32 {
    1
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReservation {
    #[serde(default = "default_count")]
    pub count: i32,
    pub datetime_from: Option<DateTime<Utc>>,
    pub datetime_to: Option<DateTime<Utc>>,
}

impl NewReservation {
    pub fn validate(&self) -> Result<(), ReservationError> {
        validate_count(self.count)?;

        if let (Some(from), Some(to)) = (self.datetime_from, self.datetime_to) {
            if from > to {
                return Err(ReservationError::Validation(
                    "datetime_from must not be after datetime_to".into(),
                ));
            }
        }
        Ok(())
    }

    /// Builds a `new` reservation. Offer stock is not touched here: an
    /// unconfirmed request does not hold inventory.
    pub fn into_reservation(self, offer_id: Uuid, user_id: Uuid) -> Reservation {
        Reservation {
            id: Uuid::new_v4(),
            offer_id,
            user_id,
            count: self.count,
            datetime_from: self.datetime_from,
            datetime_to: self.datetime_to,
            status: ReservationStatus::New,
            created_at: Utc::now(),
        }
    }
}

/// Status transition requested by a rental point operator.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status: ReservationStatus,
    /// Overrides the reserved quantity; the stored count is kept when absent.
    pub count: Option<i32>,
}

impl StatusUpdate {
    pub fn new(status: ReservationStatus) -> Self {
        Self { status, count: None }
    }

    pub fn with_count(status: ReservationStatus, count: i32) -> Self {
        Self { status, count: Some(count) }
    }
}

pub(crate) fn validate_count(count: i32) -> Result<(), ReservationError> {
    if count <= 0 {
        return Err(ReservationError::Validation("count must be positive".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_value(ReservationStatus::Accepted).unwrap(), "accepted");
        let parsed: ReservationStatus = serde_json::from_str("\"declined\"").unwrap();
        assert_eq!(parsed, ReservationStatus::Declined);
        assert!(serde_json::from_str::<ReservationStatus>("\"pending\"").is_err());
    }

    #[test]
    fn test_status_from_str() {
        for status in ReservationStatus::ALL {
            assert_eq!(status.to_string().parse::<ReservationStatus>().unwrap(), status);
        }
        assert_eq!(
            "ACCEPTED".parse::<ReservationStatus>(),
            Err(ReservationError::UnknownStatus("ACCEPTED".into()))
        );
    }

    #[test]
    fn test_new_reservation_defaults_to_one_item() {
        let req: NewReservation = serde_json::from_str("{}").unwrap();
        assert_eq!(req.count, 1);
        assert!(req.validate().is_ok());

        let reservation = req.into_reservation(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(reservation.status, ReservationStatus::New);
    }

    #[test]
    fn test_non_positive_count_rejected() {
        for count in [0, -2] {
            let req = NewReservation { count, datetime_from: None, datetime_to: None };
            assert!(matches!(req.validate(), Err(ReservationError::Validation(_))));
        }
    }

    #[test]
    fn test_inverted_window_rejected() {
        let now = Utc::now();
        let req = NewReservation {
            count: 1,
            datetime_from: Some(now),
            datetime_to: Some(now - Duration::hours(2)),
        };
        assert!(req.validate().is_err());

        let req = NewReservation { count: 1, datetime_from: Some(now), datetime_to: None };
        assert!(req.validate().is_ok());
    }
}
