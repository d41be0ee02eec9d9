use std::sync::Arc;

use rental_core::{CompanyRepository, EventPublisher, OfferRepository, ProductRepository, ReservationRepository};
use rental_store::app_config::RateLimitConfig;
use rental_store::{
    InMemoryStore, PgCompanyRepository, PgOfferRepository, PgProductRepository, PgReservationRepository, RedisClient,
};
use sqlx::PgPool;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
    pub expiration: u64,
}

/// One handle per repository trait, all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub companies: Arc<dyn CompanyRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub offers: Arc<dyn OfferRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            companies: Arc::new(PgCompanyRepository::new(pool.clone())),
            products: Arc::new(PgProductRepository::new(pool.clone())),
            offers: Arc::new(PgOfferRepository::new(pool.clone())),
            reservations: Arc::new(PgReservationRepository::new(pool)),
        }
    }

    pub fn in_memory(store: Arc<InMemoryStore>) -> Self {
        Self {
            companies: store.clone(),
            products: store.clone(),
            offers: store.clone(),
            reservations: store,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub companies: Arc<dyn CompanyRepository>,
    pub products: Arc<dyn ProductRepository>,
    pub offers: Arc<dyn OfferRepository>,
    pub reservations: Arc<dyn ReservationRepository>,
    pub events: Arc<dyn EventPublisher>,
    /// Rate limiting is skipped without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub rate_limit: RateLimitConfig,
    pub metrics: Arc<Metrics>,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn new(
        repos: Repositories,
        events: Arc<dyn EventPublisher>,
        auth: AuthConfig,
    ) -> prometheus::Result<Self> {
        Ok(Self {
            companies: repos.companies,
            products: repos.products,
            offers: repos.offers,
            reservations: repos.reservations,
            events,
            redis: None,
            rate_limit: RateLimitConfig::default(),
            metrics: Arc::new(Metrics::new()?),
            auth,
        })
    }

    pub fn with_rate_limit(mut self, redis: Arc<RedisClient>, rate_limit: RateLimitConfig) -> Self {
        self.redis = Some(redis);
        self.rate_limit = rate_limit;
        self
    }
}
