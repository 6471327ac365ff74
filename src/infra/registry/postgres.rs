//! PostgreSQL registry backend.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{AddressRegistry, Chain, DestinationTag, PaymentAddress, RegistryError};

/// PostgreSQL connection pool configuration
#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            min_connections: 2,
            acquire_timeout: Duration::from_secs(3),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

/// Address registry persisted in PostgreSQL. Tag ownership is settled by
/// the table's unique constraints, so concurrent reservations of the same
/// tag race on the database and exactly one insert lands.
pub struct PostgresRegistry {
    pool: PgPool,
}

impl PostgresRegistry {
    /// Create a new registry with custom pool configuration
    pub async fn new(database_url: &str, config: PostgresConfig) -> Result<Self, RegistryError> {
        info!("Connecting to PostgreSQL...");
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(config.idle_timeout)
            .max_lifetime(config.max_lifetime)
            .connect(database_url)
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Create a new registry with default pool configuration
    pub async fn with_defaults(database_url: &str) -> Result<Self, RegistryError> {
        Self::new(database_url, PostgresConfig::default()).await
    }

    /// Run database migrations using sqlx migrate
    pub async fn run_migrations(&self) -> Result<(), RegistryError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| RegistryError::Migration(e.to_string()))?;
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Fetch the persisted row for an address, if one was ever reserved.
    #[instrument(skip(self))]
    pub async fn get_payment_address(
        &self,
        chain: Chain,
        address: &str,
    ) -> Result<Option<PaymentAddress>, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT address, destination_tag, created_at
            FROM payment_addresses
            WHERE chain = $1 AND address = $2
            "#,
        )
        .bind(chain.as_str())
        .bind(address)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| PaymentAddress {
            chain,
            address: row.get("address"),
            destination_tag: row
                .get::<Option<i64>, _>("destination_tag")
                .map(|tag| DestinationTag::new(tag as u64)),
            created_at: row.get("created_at"),
        }))
    }

    /// Get the underlying connection pool (for testing)
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AddressRegistry for PostgresRegistry {
    #[instrument(skip(self))]
    async fn tag_exists(&self, chain: Chain, tag: DestinationTag) -> Result<bool, RegistryError> {
        let row = sqlx::query(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM payment_addresses
                WHERE chain = $1 AND destination_tag = $2
            ) AS present
            "#,
        )
        .bind(chain.as_str())
        .bind(tag.value() as i64)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get("present"))
    }

    #[instrument(skip(self))]
    async fn reserve(
        &self,
        chain: Chain,
        address: &str,
        tag: Option<DestinationTag>,
    ) -> Result<bool, RegistryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO payment_addresses (id, chain, address, destination_tag)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(chain.as_str())
        .bind(address)
        .bind(tag.map(|t| t.value() as i64))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
