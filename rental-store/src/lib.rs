pub mod app_config;
pub mod database;
pub mod events;
pub mod memory;
pub mod redis_repo;
pub mod company_repo;
pub mod catalog_repo;
pub mod offer_repo;
pub mod reservation_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use events::LogPublisher;
#[cfg(feature = "kafka")]
pub use events::EventProducer;
pub use memory::InMemoryStore;
pub use redis_repo::RedisClient;
pub use company_repo::PgCompanyRepository;
pub use catalog_repo::PgProductRepository;
pub use offer_repo::PgOfferRepository;
pub use reservation_repo::PgReservationRepository;

