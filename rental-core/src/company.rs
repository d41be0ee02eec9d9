use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{CoreError, CoreResult};

const NAME_MAX_LEN: usize = 200;
const DESCRIPTION_MAX_LEN: usize = 2000;
const PHONE_MAX_LEN: usize = 20;
const ADDRESS_MAX_LEN: usize = 1000;

/// A rental business. Every user owns at most one company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewCompany {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl NewCompany {
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::ValidationError("company name is required".into()));
        }
        check_len("name", &self.name, NAME_MAX_LEN)?;
        check_len("description", &self.description, DESCRIPTION_MAX_LEN)
    }

    pub fn into_company(self, user_id: Uuid) -> Company {
        Company {
            id: Uuid::new_v4(),
            user_id,
            name: self.name,
            description: self.description,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Address {
    #[serde(default)]
    pub address: String,
    pub city: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Address {
    pub fn validate(&self) -> CoreResult<()> {
        check_len("address", &self.address, ADDRESS_MAX_LEN)?;
        if let Some(lat) = self.latitude {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(CoreError::ValidationError("latitude must be within [-90, 90]".into()));
            }
        }
        if let Some(lon) = self.longitude {
            if !(-180.0..=180.0).contains(&lon) {
                return Err(CoreError::ValidationError("longitude must be within [-180, 180]".into()));
            }
        }
        Ok(())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.address.is_empty() {
            return f.write_str(&self.address);
        }
        match &self.city {
            Some(city) => f.write_str(city),
            None => f.write_str("not specified"),
        }
    }
}

/// A pick-up location of a company.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RentalPoint {
    pub id: Uuid,
    pub company_id: Uuid,
    pub phone: String,
    pub is_delivery: bool,
    pub schedule: Option<serde_json::Value>,
    pub address: Address,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewRentalPoint {
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub is_delivery: bool,
    pub schedule: Option<serde_json::Value>,
    #[serde(default)]
    pub address: Address,
}

impl NewRentalPoint {
    pub fn validate(&self) -> CoreResult<()> {
        check_len("phone", &self.phone, PHONE_MAX_LEN)?;
        self.address.validate()
    }

    pub fn into_rental_point(self, company_id: Uuid) -> RentalPoint {
        RentalPoint {
            id: Uuid::new_v4(),
            company_id,
            phone: self.phone,
            is_delivery: self.is_delivery,
            schedule: self.schedule,
            address: self.address,
        }
    }
}

/// Rental point together with the average mark of all its offers.
#[derive(Debug, Clone, Serialize)]
pub struct RentalPointSummary {
    #[serde(flatten)]
    pub point: RentalPoint,
    pub general_rating: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CompanyWithPoints {
    #[serde(flatten)]
    pub company: Company,
    pub rental_points: Vec<RentalPoint>,
}

fn check_len(field: &str, value: &str, max: usize) -> CoreResult<()> {
    if value.chars().count() > max {
        return Err(CoreError::ValidationError(format!(
            "{} is longer than {} characters",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_company_requires_name() {
        let req = NewCompany { name: "  ".into(), description: String::new() };
        assert!(req.validate().is_err());

        let req = NewCompany { name: "x".repeat(NAME_MAX_LEN + 1), description: String::new() };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_coordinates_are_bounded() {
        let mut address = Address { latitude: Some(91.0), ..Default::default() };
        assert!(address.validate().is_err());

        address.latitude = Some(55.79);
        address.longitude = Some(-181.0);
        assert!(address.validate().is_err());

        address.longitude = Some(49.12);
        assert!(address.validate().is_ok());
    }

    #[test]
    fn test_address_display_falls_back_to_city() {
        let address = Address { city: Some("Kazan".into()), ..Default::default() };
        assert_eq!(address.to_string(), "Kazan");
        assert_eq!(Address::default().to_string(), "not specified");

        let address = Address { address: "Baumana 1".into(), city: Some("Kazan".into()), ..Default::default() };
        assert_eq!(address.to_string(), "Baumana 1");
    }

    #[test]
    fn test_long_phone_rejected() {
        let req: NewRentalPoint = serde_json::from_value(serde_json::json!({
            "phone": "+7 (900) 000-00-00-0000"
        }))
        .unwrap();
        assert!(req.validate().is_err());
    }
}
