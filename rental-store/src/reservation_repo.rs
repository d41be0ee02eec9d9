use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rental_core::repository::{ReservationChange, ReservationRepository};
use rental_core::{CoreError, CoreResult};
use rental_reservation::{lifecycle, NewReservation, Reservation, StatusUpdate, StockAdjustment};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgReservationRepository {
    pool: PgPool,
}

impl PgReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const RESERVATION_COLUMNS: &str =
    "r.id, r.offer_id, r.user_id, r.count, r.datetime_from, r.datetime_to, r.status, r.created_at";

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    offer_id: Uuid,
    user_id: Uuid,
    count: i32,
    datetime_from: Option<DateTime<Utc>>,
    datetime_to: Option<DateTime<Utc>>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = CoreError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        Ok(Reservation {
            id: row.id,
            offer_id: row.offer_id,
            user_id: row.user_id,
            count: row.count,
            datetime_from: row.datetime_from,
            datetime_to: row.datetime_to,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

fn into_reservations(rows: Vec<ReservationRow>) -> CoreResult<Vec<Reservation>> {
    rows.into_iter().map(Reservation::try_from).collect()
}

#[async_trait]
impl ReservationRepository for PgReservationRepository {
    async fn create_reservation(
        &self,
        offer_id: Uuid,
        user_id: Uuid,
        reservation: NewReservation,
    ) -> CoreResult<Reservation> {
        reservation.validate()?;
        let reservation = reservation.into_reservation(offer_id, user_id);

        sqlx::query(
            r#"
            INSERT INTO reservations (id, offer_id, user_id, count, datetime_from, datetime_to, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id)
        .bind(reservation.offer_id)
        .bind(reservation.user_id)
        .bind(reservation.count)
        .bind(reservation.datetime_from)
        .bind(reservation.datetime_to)
        .bind(reservation.status.as_str())
        .bind(reservation.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            CoreError::NotFound(_) => CoreError::not_found("offer", offer_id),
            other => other,
        })?;

        Ok(reservation)
    }

    async fn get_reservation(&self, id: Uuid) -> CoreResult<Option<Reservation>> {
        let row: Option<ReservationRow> =
            sqlx::query_as(&format!("SELECT {} FROM reservations r WHERE r.id = $1", RESERVATION_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err)?;

        row.map(Reservation::try_from).transpose()
    }

    async fn list_offer_reservations(&self, offer_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reservations r WHERE r.offer_id = $1 ORDER BY r.created_at DESC",
            RESERVATION_COLUMNS
        ))
        .bind(offer_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_reservations(rows)
    }

    async fn list_rental_point_reservations(&self, rental_point_id: Uuid) -> CoreResult<Vec<Reservation>> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}
            FROM reservations r
            JOIN offers o ON o.id = r.offer_id
            WHERE o.rental_point_id = $1
            ORDER BY r.created_at DESC
            "#,
            RESERVATION_COLUMNS
        ))
        .bind(rental_point_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        into_reservations(rows)
    }

    async fn update_status(&self, id: Uuid, update: StatusUpdate) -> CoreResult<ReservationChange> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Offer first, then reservation: the order offer edits and the
        // offer delete cascade take them in.
        let stock: Option<(i32,)> = sqlx::query_as(
            "SELECT o.count FROM offers o JOIN reservations r ON r.offer_id = o.id WHERE r.id = $1 FOR UPDATE OF o",
        )
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let (mut offer_count,) = stock.ok_or_else(|| CoreError::not_found("reservation", id))?;

        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {} FROM reservations r WHERE r.id = $1 FOR UPDATE",
            RESERVATION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?;

        let mut reservation = Reservation::try_from(row.ok_or_else(|| CoreError::not_found("reservation", id))?)?;

        // Dropping `tx` on error rolls back and releases both locks.
        let transition = lifecycle::apply(&mut reservation, &mut offer_count, &update)?;

        if transition.adjustment != StockAdjustment::Unchanged {
            sqlx::query("UPDATE offers SET count = $2 WHERE id = $1")
                .bind(reservation.offer_id)
                .bind(offer_count)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        sqlx::query("UPDATE reservations SET status = $2, count = $3 WHERE id = $1")
            .bind(reservation.id)
            .bind(reservation.status.as_str())
            .bind(reservation.count)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        debug!(
            reservation_id = %reservation.id,
            from = %transition.from,
            to = %transition.to,
            offer_count,
            "Reservation transition committed"
        );

        Ok(ReservationChange { reservation, transition })
    }
}
