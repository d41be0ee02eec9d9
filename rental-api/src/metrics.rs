use axum::{extract::State, http::header, response::IntoResponse};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use rental_reservation::Transition;

use crate::{error::AppError, state::AppState};

/// Reservation counters exposed at `/metrics`.
pub struct Metrics {
    registry: Registry,
    reservations_created: IntCounter,
    transitions: IntCounterVec,
    inventory_rejections: IntCounter,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let reservations_created =
            IntCounter::new("rental_reservations_created_total", "Reservations created")?;
        let transitions = IntCounterVec::new(
            Opts::new("rental_reservation_transitions_total", "Committed reservation status transitions"),
            &["from", "to"],
        )?;
        let inventory_rejections = IntCounter::new(
            "rental_inventory_rejections_total",
            "Acceptances rejected for insufficient stock",
        )?;

        registry.register(Box::new(reservations_created.clone()))?;
        registry.register(Box::new(transitions.clone()))?;
        registry.register(Box::new(inventory_rejections.clone()))?;

        Ok(Self { registry, reservations_created, transitions, inventory_rejections })
    }

    pub fn reservation_created(&self) {
        self.reservations_created.inc();
    }

    pub fn transition(&self, transition: &Transition) {
        self.transitions
            .with_label_values(&[transition.from.as_str(), transition.to.as_str()])
            .inc();
    }

    pub fn inventory_rejected(&self) {
        self.inventory_rejections.inc();
    }

    pub fn render(&self) -> Result<(String, Vec<u8>), prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        Ok((encoder.format_type().to_string(), buffer))
    }
}

/// GET /metrics
pub async fn metrics_handler(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let (content_type, body) = state
        .metrics
        .render()
        .map_err(|e| AppError::InternalServerError(format!("Metrics encoding failed: {}", e)))?;

    Ok(([(header::CONTENT_TYPE, content_type)], body))
}
