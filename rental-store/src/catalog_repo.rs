use async_trait::async_trait;
use rental_catalog::Product;
use rental_core::repository::ProductRepository;
use rental_core::CoreResult;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::db_err;

pub struct PgProductRepository {
    pool: PgPool,
}

impl PgProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    category: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product { id: row.id, name: row.name, category: row.category }
    }
}

const PRODUCT_SELECT: &str = r#"
    SELECT p.id, p.name, c.name AS category
    FROM products p
    LEFT JOIN categories c ON c.id = p.category_id
"#;

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn list_products(&self) -> CoreResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{} ORDER BY p.name", PRODUCT_SELECT))
            .fetch_all(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn get_product(&self, id: Uuid) -> CoreResult<Option<Product>> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{} WHERE p.id = $1", PRODUCT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        Ok(row.map(Into::into))
    }
}
