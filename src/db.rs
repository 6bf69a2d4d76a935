//! Connection pool and migration entry points.

use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::gauge;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

pub type DbPool = DatabaseConnection;

/// Pool sizing and timeouts taken from [`AppConfig`].
#[derive(Debug, Clone)]
pub struct PoolSettings {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    pub acquire_timeout: Duration,
}

impl PoolSettings {
    pub fn from_config(cfg: &AppConfig) -> Self {
        let mut settings = Self {
            url: cfg.database_url.clone(),
            max_connections: cfg.db_max_connections,
            min_connections: cfg.db_min_connections.min(cfg.db_max_connections),
            connect_timeout: Duration::from_secs(cfg.db_connect_timeout_secs),
            idle_timeout: Duration::from_secs(cfg.db_idle_timeout_secs),
            acquire_timeout: Duration::from_secs(cfg.db_acquire_timeout_secs),
        };

        // Every pooled connection to an in-memory SQLite database opens its
        // own empty database.
        if settings.is_in_memory_sqlite() && settings.max_connections != 1 {
            warn!(
                "In-memory SQLite needs a single connection; ignoring db_max_connections={}",
                settings.max_connections
            );
            settings.max_connections = 1;
            settings.min_connections = 1;
        }
        settings
    }

    fn is_in_memory_sqlite(&self) -> bool {
        self.url.starts_with("sqlite::memory:") || self.url.contains("mode=memory")
    }

    /// URL with any password replaced, for logs.
    fn redacted_url(&self) -> String {
        match (self.url.find("://"), self.url.rfind('@')) {
            (Some(scheme_end), Some(at)) if at > scheme_end => {
                let credentials = &self.url[scheme_end + 3..at];
                let user = credentials.split(':').next().unwrap_or_default();
                format!("{}{}:***{}", &self.url[..scheme_end + 3], user, &self.url[at..])
            }
            _ => self.url.clone(),
        }
    }
}

/// Opens the connection pool described by the application config.
pub async fn establish_connection_from_app_config(cfg: &AppConfig) -> Result<DbPool, ServiceError> {
    connect(&PoolSettings::from_config(cfg)).await
}

pub async fn connect(settings: &PoolSettings) -> Result<DbPool, ServiceError> {
    debug!(url = %settings.redacted_url(), "Opening database pool");

    let mut opt = ConnectOptions::new(settings.url.clone());
    opt.max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .connect_timeout(settings.connect_timeout)
        .acquire_timeout(settings.acquire_timeout)
        .idle_timeout(settings.idle_timeout)
        .sqlx_logging(false);

    let pool = Database::connect(opt).await.map_err(|e| {
        error!(url = %settings.redacted_url(), "Database connection failed: {}", e);
        ServiceError::DatabaseError(e)
    })?;

    gauge!("bfx_portal.db.max_connections", settings.max_connections as f64);
    info!(
        backend = ?pool.get_database_backend(),
        max_connections = settings.max_connections,
        "Database pool ready"
    );
    Ok(pool)
}

/// Applies pending migrations and logs how many ran.
pub async fn run_migrations(pool: &DbPool) -> Result<(), ServiceError> {
    let started = Instant::now();
    let pending = crate::migrator::Migrator::get_pending_migrations(pool)
        .await
        .map_err(ServiceError::DatabaseError)?
        .len();

    if pending == 0 {
        debug!("Schema is up to date");
        return Ok(());
    }

    crate::migrator::Migrator::up(pool, None).await.map_err(|e| {
        error!("Migrations failed after {:?}: {}", started.elapsed(), e);
        ServiceError::DatabaseError(e)
    })?;
    info!(applied = pending, "Migrations applied in {:?}", started.elapsed());
    Ok(())
}

pub async fn check_connection(pool: &DbPool) -> Result<(), ServiceError> {
    pool.ping().await.map_err(ServiceError::DatabaseError)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(url: &str) -> PoolSettings {
        let mut cfg = AppConfig::new(url.to_string(), "127.0.0.1".into(), 8080, "test".into());
        cfg.db_max_connections = 8;
        PoolSettings::from_config(&cfg)
    }

    #[test]
    fn in_memory_sqlite_is_pinned_to_one_connection() {
        let pool = settings("sqlite::memory:");
        assert_eq!(pool.max_connections, 1);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(settings("sqlite://portal.db?mode=rwc").max_connections, 8);
    }

    #[test]
    fn password_is_redacted_for_logs() {
        let pool = settings("postgres://portal:s3cret@db:5432/portal");
        assert_eq!(pool.redacted_url(), "postgres://portal:***@db:5432/portal");
        assert_eq!(settings("sqlite::memory:").redacted_url(), "sqlite::memory:");
    }

    #[tokio::test]
    async fn sqlite_schema_migrates_and_keeps_four_decimal_places() {
        use crate::services::reference_data::{PurchaseOrderInfo, ReferenceDataService};
        use rust_decimal_macros::dec;
        use std::sync::Arc;

        let cfg = AppConfig::new("sqlite::memory:".into(), "127.0.0.1".into(), 8080, "test".into());
        let pool = establish_connection_from_app_config(&cfg).await.unwrap();
        run_migrations(&pool).await.unwrap();
        // Second run finds nothing pending
        run_migrations(&pool).await.unwrap();

        let reference = ReferenceDataService::new(Arc::new(pool));
        for (lot, price) in [("PO-1", dec!(812.1234)), ("PO-2", dec!(123456789012.3456))] {
            let stored = reference
                .upsert_purchase_order(PurchaseOrderInfo {
                    customer_lot: lot.to_string(),
                    sales_order_number: None,
                    price_per_thousand: price,
                    pieces_per_pallet: None,
                    pieces_per_package: None,
                    customer_item_code: None,
                })
                .await
                .unwrap();
            assert_eq!(stored.price_per_thousand, price);
        }
    }
}
