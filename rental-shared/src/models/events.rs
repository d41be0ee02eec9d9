use uuid::Uuid;

/// Topic names used when publishing domain events.
pub mod topics {
    pub const RESERVATION_CREATED: &str = "reservation.created";
    pub const RESERVATION_STATUS_CHANGED: &str = "reservation.status_changed";
    pub const OFFER_STOCK_CHANGED: &str = "offer.stock_changed";
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationCreatedEvent {
    pub reservation_id: Uuid,
    pub offer_id: Uuid,
    pub user_id: Uuid,
    pub count: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ReservationStatusChangedEvent {
    pub reservation_id: Uuid,
    pub offer_id: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub count: i32,
    /// Offer stock after the transition was applied.
    pub offer_count: i32,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct OfferStockChangedEvent {
    pub offer_id: Uuid,
    pub previous_count: i32,
    pub count: i32,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_changed_payload_shape() {
        let event = ReservationStatusChangedEvent {
            reservation_id: Uuid::new_v4(),
            offer_id: Uuid::new_v4(),
            from_status: "new".to_string(),
            to_status: "accepted".to_string(),
            count: 3,
            offer_count: 2,
            timestamp: 0,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["from_status"], "new");
        assert_eq!(value["to_status"], "accepted");
        assert_eq!(value["offer_count"], 2);
    }
}
