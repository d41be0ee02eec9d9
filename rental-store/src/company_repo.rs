use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rental_core::repository::CompanyRepository;
use rental_core::{
    Address, Company, CompanyWithPoints, CoreError, CoreResult, NewCompany, NewRentalPoint, RentalPoint,
    RentalPointSummary,
};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgCompanyRepository {
    pool: PgPool,
}

impl PgCompanyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn points_by_company(&self, company_ids: &[Uuid]) -> CoreResult<HashMap<Uuid, Vec<RentalPoint>>> {
        let rows: Vec<RentalPointRow> = sqlx::query_as(&format!(
            "SELECT {} FROM rental_points rp WHERE rp.company_id = ANY($1) ORDER BY rp.address",
            POINT_COLUMNS
        ))
        .bind(company_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut grouped: HashMap<Uuid, Vec<RentalPoint>> = HashMap::new();
        for row in rows {
            let point = RentalPoint::from(row);
            grouped.entry(point.company_id).or_default().push(point);
        }
        Ok(grouped)
    }

    async fn with_points(&self, companies: Vec<CompanyRow>) -> CoreResult<Vec<CompanyWithPoints>> {
        let ids: Vec<Uuid> = companies.iter().map(|c| c.id).collect();
        let mut points = self.points_by_company(&ids).await?;

        Ok(companies
            .into_iter()
            .map(|row| {
                let rental_points = points.remove(&row.id).unwrap_or_default();
                CompanyWithPoints { company: row.into(), rental_points }
            })
            .collect())
    }

    async fn one_with_points(&self, row: Option<CompanyRow>) -> CoreResult<Option<CompanyWithPoints>> {
        match row {
            Some(row) => Ok(self.with_points(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

const POINT_COLUMNS: &str =
    "rp.id, rp.company_id, rp.phone, rp.is_delivery, rp.schedule, rp.address, rp.city, rp.latitude, rp.longitude";

#[derive(sqlx::FromRow)]
struct CompanyRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    description: String,
    created_at: DateTime<Utc>,
}

impl From<CompanyRow> for Company {
    fn from(row: CompanyRow) -> Self {
        Company {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RentalPointRow {
    id: Uuid,
    company_id: Uuid,
    phone: String,
    is_delivery: bool,
    schedule: Option<serde_json::Value>,
    address: String,
    city: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

impl From<RentalPointRow> for RentalPoint {
    fn from(row: RentalPointRow) -> Self {
        RentalPoint {
            id: row.id,
            company_id: row.company_id,
            phone: row.phone,
            is_delivery: row.is_delivery,
            schedule: row.schedule,
            address: Address {
                address: row.address,
                city: row.city,
                latitude: row.latitude,
                longitude: row.longitude,
            },
        }
    }
}

#[derive(sqlx::FromRow)]
struct RentalPointSummaryRow {
    #[sqlx(flatten)]
    point: RentalPointRow,
    general_rating: f64,
}

impl From<RentalPointSummaryRow> for RentalPointSummary {
    fn from(row: RentalPointSummaryRow) -> Self {
        RentalPointSummary { point: row.point.into(), general_rating: row.general_rating }
    }
}

fn summary_query(filter: &str) -> String {
    format!(
        r#"
        SELECT {}, COALESCE(ROUND(AVG(r.mark)::numeric, 2), 0)::float8 AS general_rating
        FROM rental_points rp
        LEFT JOIN offers o ON o.rental_point_id = rp.id
        LEFT JOIN ratings r ON r.offer_id = o.id
        WHERE {}
        GROUP BY rp.id
        ORDER BY rp.address
        "#,
        POINT_COLUMNS, filter
    )
}

#[async_trait]
impl CompanyRepository for PgCompanyRepository {
    async fn create_company(&self, user_id: Uuid, company: NewCompany) -> CoreResult<Company> {
        company.validate()?;
        let company = company.into_company(user_id);

        sqlx::query(
            "INSERT INTO companies (id, user_id, name, description, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(company.id)
        .bind(company.user_id)
        .bind(&company.name)
        .bind(&company.description)
        .bind(company.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            CoreError::Conflict(_) => CoreError::Conflict("user already owns a company".into()),
            other => other,
        })?;

        Ok(company)
    }

    async fn get_company(&self, id: Uuid) -> CoreResult<Option<CompanyWithPoints>> {
        let row: Option<CompanyRow> = sqlx::query_as(
            "SELECT id, user_id, name, description, created_at FROM companies WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        self.one_with_points(row).await
    }

    async fn company_for_user(&self, user_id: Uuid) -> CoreResult<Option<CompanyWithPoints>> {
        let row: Option<CompanyRow> = sqlx::query_as(
            "SELECT id, user_id, name, description, created_at FROM companies WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        self.one_with_points(row).await
    }

    async fn list_companies(&self) -> CoreResult<Vec<CompanyWithPoints>> {
        let rows: Vec<CompanyRow> = sqlx::query_as(
            "SELECT id, user_id, name, description, created_at FROM companies ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        self.with_points(rows).await
    }

    async fn create_rental_point(&self, company_id: Uuid, point: NewRentalPoint) -> CoreResult<RentalPoint> {
        point.validate()?;
        let point = point.into_rental_point(company_id);

        sqlx::query(
            r#"
            INSERT INTO rental_points (id, company_id, phone, is_delivery, schedule, address, city, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(point.id)
        .bind(point.company_id)
        .bind(&point.phone)
        .bind(point.is_delivery)
        .bind(&point.schedule)
        .bind(&point.address.address)
        .bind(&point.address.city)
        .bind(point.address.latitude)
        .bind(point.address.longitude)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_err(e) {
            CoreError::NotFound(_) => CoreError::not_found("company", company_id),
            other => other,
        })?;

        Ok(point)
    }

    async fn list_rental_points(&self, company_id: Option<Uuid>) -> CoreResult<Vec<RentalPointSummary>> {
        let rows: Vec<RentalPointSummaryRow> =
            sqlx::query_as(&summary_query("($1::uuid IS NULL OR rp.company_id = $1)"))
                .bind(company_id)
                .fetch_all(&self.pool)
                .await
                .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_rental_point(&self, id: Uuid) -> CoreResult<Option<RentalPointSummary>> {
        let row: Option<RentalPointSummaryRow> = sqlx::query_as(&summary_query("rp.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(Into::into))
    }
}
