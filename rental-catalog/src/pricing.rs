use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::CatalogError;

/// Unit a rental period or tariff is expressed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Minute,
    #[default]
    Hour,
    Day,
}

impl TimeUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeUnit::Minute => "minute",
            TimeUnit::Hour => "hour",
            TimeUnit::Day => "day",
        }
    }

    pub fn minutes(&self) -> i64 {
        match self {
            TimeUnit::Minute => 1,
            TimeUnit::Hour => 60,
            TimeUnit::Day => 24 * 60,
        }
    }
}

impl fmt::Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeUnit {
    type Err = CatalogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minute" => Ok(TimeUnit::Minute),
            "hour" => Ok(TimeUnit::Hour),
            "day" => Ok(TimeUnit::Day),
            other => Err(CatalogError::UnknownTimeUnit(other.to_string())),
        }
    }
}

/// A tariff of an offer: starting from `time_from` units of rental the
/// price is `price_per_time` per `price_per_time_unit`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Price {
    pub id: Uuid,
    pub offer_id: Uuid,
    pub time_from: i32,
    pub time_from_unit: TimeUnit,
    pub price_per_time: f64,
    pub price_per_time_unit: TimeUnit,
}

impl Price {
    /// Rental length (in minutes) from which this tariff applies.
    pub fn threshold_minutes(&self) -> i64 {
        i64::from(self.time_from) * self.time_from_unit.minutes()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPrice {
    pub time_from: i32,
    #[serde(default)]
    pub time_from_unit: TimeUnit,
    pub price_per_time: f64,
    #[serde(default)]
    pub price_per_time_unit: TimeUnit,
}

impl NewPrice {
    pub fn validate(&self) -> Result<(), CatalogError> {
        if self.time_from < 0 {
            return Err(CatalogError::InvalidPrice("time_from must not be negative".into()));
        }
        if !self.price_per_time.is_finite() || self.price_per_time < 0.0 {
            return Err(CatalogError::InvalidPrice(
                "price_per_time must be a non-negative number".into(),
            ));
        }
        Ok(())
    }

    pub fn into_price(self, offer_id: Uuid) -> Price {
        Price {
            id: Uuid::new_v4(),
            offer_id,
            time_from: self.time_from,
            time_from_unit: self.time_from_unit,
            price_per_time: self.price_per_time,
            price_per_time_unit: self.price_per_time_unit,
        }
    }
}

/// Orders tariffs from the shortest to the longest rental threshold.
pub fn sort_tariffs(prices: &mut [Price]) {
    prices.sort_by_key(Price::threshold_minutes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(time_from: i32, unit: TimeUnit) -> Price {
        NewPrice {
            time_from,
            time_from_unit: unit,
            price_per_time: 100.0,
            price_per_time_unit: TimeUnit::Hour,
        }
        .into_price(Uuid::new_v4())
    }

    #[test]
    fn test_time_unit_round_trip_through_str() {
        for unit in [TimeUnit::Minute, TimeUnit::Hour, TimeUnit::Day] {
            assert_eq!(unit.as_str().parse::<TimeUnit>().unwrap(), unit);
        }
        assert!("week".parse::<TimeUnit>().is_err());
    }

    #[test]
    fn test_new_price_defaults_to_hours() {
        let req: NewPrice = serde_json::from_str(r#"{"time_from": 2, "price_per_time": 150.5}"#).unwrap();
        assert_eq!(req.time_from_unit, TimeUnit::Hour);
        assert_eq!(req.price_per_time_unit, TimeUnit::Hour);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_negative_values_rejected() {
        let req = NewPrice {
            time_from: -1,
            time_from_unit: TimeUnit::Day,
            price_per_time: 10.0,
            price_per_time_unit: TimeUnit::Day,
        };
        assert!(req.validate().is_err());

        let req = NewPrice {
            time_from: 1,
            time_from_unit: TimeUnit::Day,
            price_per_time: -10.0,
            price_per_time_unit: TimeUnit::Day,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_tariffs_sorted_by_threshold() {
        let mut prices = vec![price(1, TimeUnit::Day), price(30, TimeUnit::Minute), price(2, TimeUnit::Hour)];
        sort_tariffs(&mut prices);

        let thresholds: Vec<i64> = prices.iter().map(Price::threshold_minutes).collect();
        assert_eq!(thresholds, vec![30, 120, 1440]);
    }
}
