use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rental_catalog::{sort_tariffs, NewPrice, Price};
use rental_core::repository::{OfferRepository, OfferUpdate};
use rental_core::{Address, CoreError, CoreResult};
use rental_offer::{general_rating, BoardOffer, NewOffer, NewRating, Offer, OfferDetail, OfferFilter, OfferPatch, Rating};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgOfferRepository {
    pool: PgPool,
}

impl PgOfferRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_offer(&self, offer_id: Uuid) -> CoreResult<()> {
        let exists: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM offers WHERE id = $1")
            .bind(offer_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        exists.map(|_| ()).ok_or_else(|| CoreError::not_found("offer", offer_id))
    }

    /// Attaches prices and ratings to a page of offers with one query each.
    async fn load_details(&self, rows: Vec<OfferDetailRow>) -> CoreResult<Vec<OfferDetail>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.offer.id).collect();

        let price_rows: Vec<PriceRow> = sqlx::query_as(&format!("{} WHERE offer_id = ANY($1)", PRICE_SELECT))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let rating_rows: Vec<RatingRow> = sqlx::query_as(&format!("{} WHERE offer_id = ANY($1)", RATING_SELECT))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut prices: HashMap<Uuid, Vec<Price>> = HashMap::new();
        for row in price_rows {
            let price = Price::try_from(row)?;
            prices.entry(price.offer_id).or_default().push(price);
        }

        let mut ratings: HashMap<Uuid, Vec<Rating>> = HashMap::new();
        for row in rating_rows {
            let rating = Rating::from(row);
            ratings.entry(rating.offer_id).or_default().push(rating);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let mut offer_prices = prices.remove(&row.offer.id).unwrap_or_default();
                sort_tariffs(&mut offer_prices);
                let offer_ratings = ratings.remove(&row.offer.id).unwrap_or_default();

                OfferDetail {
                    general_rating: general_rating(offer_ratings.iter().map(|r| r.mark)),
                    offer: row.offer.into(),
                    product: row.product,
                    category: row.category,
                    prices: offer_prices,
                    ratings: offer_ratings,
                }
            })
            .collect())
    }
}

const OFFER_COLUMNS: &str = "o.id, o.is_active, o.description, o.count, o.is_for_child, o.is_female, \
     o.is_male, o.is_unisex, o.product_id, o.rental_point_id, o.created_at";

fn detail_select() -> String {
    format!(
        r#"
        SELECT {}, p.name AS product, c.name AS category
        FROM offers o
        JOIN rental_points rp ON rp.id = o.rental_point_id
        JOIN companies co ON co.id = rp.company_id
        LEFT JOIN products p ON p.id = o.product_id
        LEFT JOIN categories c ON c.id = p.category_id
        "#,
        OFFER_COLUMNS
    )
}

const PRICE_SELECT: &str =
    "SELECT id, offer_id, time_from, time_from_unit, price_per_time, price_per_time_unit FROM prices";

const RATING_SELECT: &str = "SELECT id, offer_id, user_id, mark, comment FROM ratings";

#[derive(sqlx::FromRow)]
struct OfferRow {
    id: Uuid,
    is_active: bool,
    description: String,
    count: i32,
    is_for_child: bool,
    is_female: bool,
    is_male: bool,
    is_unisex: bool,
    product_id: Option<Uuid>,
    rental_point_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<OfferRow> for Offer {
    fn from(row: OfferRow) -> Self {
        Offer {
            id: row.id,
            is_active: row.is_active,
            description: row.description,
            count: row.count,
            is_for_child: row.is_for_child,
            is_female: row.is_female,
            is_male: row.is_male,
            is_unisex: row.is_unisex,
            product_id: row.product_id,
            rental_point_id: row.rental_point_id,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct OfferDetailRow {
    #[sqlx(flatten)]
    offer: OfferRow,
    product: Option<String>,
    category: Option<String>,
}

#[derive(sqlx::FromRow)]
struct BoardRow {
    #[sqlx(flatten)]
    offer: OfferRow,
    address: String,
    city: Option<String>,
}

#[derive(sqlx::FromRow)]
struct PriceRow {
    id: Uuid,
    offer_id: Uuid,
    time_from: i32,
    time_from_unit: String,
    price_per_time: f64,
    price_per_time_unit: String,
}

impl TryFrom<PriceRow> for Price {
    type Error = CoreError;

    fn try_from(row: PriceRow) -> Result<Self, Self::Error> {
        Ok(Price {
            id: row.id,
            offer_id: row.offer_id,
            time_from: row.time_from,
            time_from_unit: row.time_from_unit.parse()?,
            price_per_time: row.price_per_time,
            price_per_time_unit: row.price_per_time_unit.parse()?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RatingRow {
    id: Uuid,
    offer_id: Uuid,
    user_id: Uuid,
    mark: i16,
    comment: String,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Rating { id: row.id, offer_id: row.offer_id, user_id: row.user_id, mark: row.mark, comment: row.comment }
    }
}

#[async_trait]
impl OfferRepository for PgOfferRepository {
    async fn create_offer(&self, offer: NewOffer) -> CoreResult<Offer> {
        offer.validate()?;
        let offer = offer.into_offer();

        sqlx::query(
            r#"
            INSERT INTO offers (id, is_active, description, count, is_for_child, is_female, is_male, is_unisex,
                                product_id, rental_point_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(offer.id)
        .bind(offer.is_active)
        .bind(&offer.description)
        .bind(offer.count)
        .bind(offer.is_for_child)
        .bind(offer.is_female)
        .bind(offer.is_male)
        .bind(offer.is_unisex)
        .bind(offer.product_id)
        .bind(offer.rental_point_id)
        .bind(offer.created_at)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(offer)
    }

    async fn update_offer(&self, id: Uuid, patch: OfferPatch) -> CoreResult<OfferUpdate> {
        patch.validate()?;

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Same row lock as reservation transitions, so an edit never races
        // a stock adjustment.
        let row: Option<OfferRow> =
            sqlx::query_as(&format!("SELECT {} FROM offers o WHERE o.id = $1 FOR UPDATE", OFFER_COLUMNS))
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;

        let mut offer = Offer::from(row.ok_or_else(|| CoreError::not_found("offer", id))?);
        let previous_count = offer.count;
        patch.apply(&mut offer);

        sqlx::query(
            r#"
            UPDATE offers
            SET is_active = $2, description = $3, count = $4, is_for_child = $5, is_female = $6,
                is_male = $7, is_unisex = $8, product_id = $9, rental_point_id = $10
            WHERE id = $1
            "#,
        )
        .bind(offer.id)
        .bind(offer.is_active)
        .bind(&offer.description)
        .bind(offer.count)
        .bind(offer.is_for_child)
        .bind(offer.is_female)
        .bind(offer.is_male)
        .bind(offer.is_unisex)
        .bind(offer.product_id)
        .bind(offer.rental_point_id)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;

        Ok(OfferUpdate { offer, previous_count })
    }

    async fn delete_offer(&self, id: Uuid) -> CoreResult<()> {
        let result = sqlx::query("DELETE FROM offers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        if result.rows_affected() == 0 {
            return Err(CoreError::not_found("offer", id));
        }
        Ok(())
    }

    async fn get_offer(&self, id: Uuid) -> CoreResult<Option<OfferDetail>> {
        let row: Option<OfferDetailRow> = sqlx::query_as(&format!("{} WHERE o.id = $1", detail_select()))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        match row {
            Some(row) => Ok(self.load_details(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }

    async fn list_offers(&self, filter: &OfferFilter) -> CoreResult<Vec<OfferDetail>> {
        let [category, city, company] = filter.like_patterns();

        let rows: Vec<OfferDetailRow> = sqlx::query_as(&format!(
            r#"
            {}
            WHERE ($1::text IS NULL OR c.name ILIKE $1)
              AND ($2::text IS NULL OR rp.city ILIKE $2)
              AND ($3::text IS NULL OR co.name ILIKE $3)
            ORDER BY o.created_at DESC
            "#,
            detail_select()
        ))
        .bind(category)
        .bind(city)
        .bind(company)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        self.load_details(rows).await
    }

    async fn list_rental_point_offers(&self, rental_point_id: Uuid) -> CoreResult<Vec<OfferDetail>> {
        let rows: Vec<OfferDetailRow> = sqlx::query_as(&format!(
            "{} WHERE o.rental_point_id = $1 ORDER BY o.created_at DESC",
            detail_select()
        ))
        .bind(rental_point_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        self.load_details(rows).await
    }

    async fn board_offers(&self) -> CoreResult<Vec<BoardOffer>> {
        let rows: Vec<BoardRow> = sqlx::query_as(&format!(
            r#"
            SELECT {}, rp.address, rp.city
            FROM offers o
            JOIN rental_points rp ON rp.id = o.rental_point_id
            WHERE o.is_active
            ORDER BY o.created_at DESC
            "#,
            OFFER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let address = Address { address: row.address, city: row.city, ..Default::default() };
                BoardOffer::new(&row.offer.into(), address.to_string())
            })
            .collect())
    }

    async fn add_price(&self, offer_id: Uuid, price: NewPrice) -> CoreResult<Price> {
        price.validate()?;
        self.ensure_offer(offer_id).await?;
        let price = price.into_price(offer_id);

        sqlx::query(
            r#"
            INSERT INTO prices (id, offer_id, time_from, time_from_unit, price_per_time, price_per_time_unit)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(price.id)
        .bind(price.offer_id)
        .bind(price.time_from)
        .bind(price.time_from_unit.as_str())
        .bind(price.price_per_time)
        .bind(price.price_per_time_unit.as_str())
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(price)
    }

    async fn list_prices(&self, offer_id: Uuid) -> CoreResult<Vec<Price>> {
        self.ensure_offer(offer_id).await?;

        let rows: Vec<PriceRow> = sqlx::query_as(&format!("{} WHERE offer_id = $1", PRICE_SELECT))
            .bind(offer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        let mut prices = rows.into_iter().map(Price::try_from).collect::<CoreResult<Vec<_>>>()?;
        sort_tariffs(&mut prices);
        Ok(prices)
    }

    async fn add_rating(&self, offer_id: Uuid, user_id: Uuid, rating: NewRating) -> CoreResult<Rating> {
        rating.validate()?;
        self.ensure_offer(offer_id).await?;
        let rating = rating.into_rating(offer_id, user_id);

        sqlx::query("INSERT INTO ratings (id, offer_id, user_id, mark, comment) VALUES ($1, $2, $3, $4, $5)")
            .bind(rating.id)
            .bind(rating.offer_id)
            .bind(rating.user_id)
            .bind(rating.mark)
            .bind(&rating.comment)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rating)
    }

    async fn list_ratings(&self, offer_id: Uuid) -> CoreResult<Vec<Rating>> {
        self.ensure_offer(offer_id).await?;

        let rows: Vec<RatingRow> = sqlx::query_as(&format!("{} WHERE offer_id = $1", RATING_SELECT))
            .bind(offer_id)
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
