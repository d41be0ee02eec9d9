use serde::Serialize;

use crate::models::{validate_count, Reservation, ReservationStatus, StatusUpdate};
use crate::ReservationError;

/// Effect a status transition has on the offer's available stock.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "amount", rename_all = "lowercase")]
pub enum StockAdjustment {
    Unchanged,
    /// Stock taken from the offer.
    Take(i32),
    /// Stock returned to the offer.
    Release(i32),
}

impl StockAdjustment {
    /// Stock left on the offer once the adjustment is applied.
    pub fn apply(self, available: i32) -> Result<i32, ReservationError> {
        match self {
            StockAdjustment::Unchanged => Ok(available),
            StockAdjustment::Take(n) if n > available => {
                Err(ReservationError::InsufficientInventory { requested: n, available })
            }
            StockAdjustment::Take(n) => Ok(available - n),
            StockAdjustment::Release(n) => available
                .checked_add(n)
                .ok_or_else(|| ReservationError::Validation("offer stock overflow".into())),
        }
    }

    /// Signed change of the offer stock.
    pub fn delta(self) -> i32 {
        match self {
            StockAdjustment::Unchanged => 0,
            StockAdjustment::Take(n) => -n,
            StockAdjustment::Release(n) => n,
        }
    }
}

/// An approved transition, ready to be written.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Transition {
    pub from: ReservationStatus,
    pub to: ReservationStatus,
    /// Reserved quantity after the transition.
    pub count: i32,
    pub adjustment: StockAdjustment,
    /// Offer stock after the transition.
    pub offer_count: i32,
}

/// Decides how a status update affects stock without mutating anything.
///
/// Rules, evaluated against the stored status:
/// - moving into `accepted` from any other status takes the requested
///   quantity, failing with `InsufficientInventory` when the offer has less;
/// - `accepted -> accepted` only moves the difference between the held and
///   the requested quantity, so re-accepting never takes stock twice;
/// - leaving `accepted` returns the quantity that was actually held;
/// - any other move leaves stock alone.
pub fn plan(
    reservation: &Reservation,
    update: &StatusUpdate,
    available: i32,
) -> Result<Transition, ReservationError> {
    let requested = update.count.unwrap_or(reservation.count);
    validate_count(requested)?;

    let from = reservation.status;
    let to = update.status;
    let held = reservation.count;

    let adjustment = match (from.holds_inventory(), to.holds_inventory()) {
        (false, true) => StockAdjustment::Take(requested),
        (true, true) if requested > held => StockAdjustment::Take(requested - held),
        (true, true) if requested < held => StockAdjustment::Release(held - requested),
        (true, true) => StockAdjustment::Unchanged,
        (true, false) => StockAdjustment::Release(held),
        (false, false) => StockAdjustment::Unchanged,
    };

    let offer_count = adjustment.apply(available)?;

    Ok(Transition {
        from,
        to,
        count: requested,
        adjustment,
        offer_count,
    })
}

/// Plans the transition and, when it is allowed, writes it to both the
/// reservation and the offer stock. On error neither is modified.
///
/// Callers must hold whatever lock serializes access to the offer for the
/// whole call.
pub fn apply(
    reservation: &mut Reservation,
    offer_count: &mut i32,
    update: &StatusUpdate,
) -> Result<Transition, ReservationError> {
    let transition = plan(reservation, update, *offer_count)?;

    *offer_count = transition.offer_count;
    reservation.status = transition.to;
    reservation.count = transition.count;

    Ok(transition)
}
