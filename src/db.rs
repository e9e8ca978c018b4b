//! Database connection management
//!
//! Owns the one connection a census run uses: acquired once, shared by every
//! census query, released once at the end.

pub mod queries;

use crate::census::{CatalogConnector, CatalogSource, TableRef};
use crate::config::DatabaseConfig;
use crate::error::{census_error, AppError, AppResult};
use deadpool_postgres::{
    Config, ManagerConfig, Object, Pool, PoolConfig, PoolError, RecyclingMethod, Runtime,
};
use queries::{SqlBuilder, LIST_BASE_TABLES, PING};
use std::future::Future;
use std::time::Duration;
use tokio_postgres::NoTls;
use tracing::{debug, info};

/// An open connection to the monitored database
pub struct Database {
    pool: Pool,
    client: Object,
    query_timeout: Duration,
}

impl Database {
    /// Connect and verify the connection with `SELECT 1`
    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = Self::create_pool(config)?;

        let client = tokio::time::timeout(config.connect_timeout, pool.get())
            .await
            .map_err(|_| {
                AppError::Connection(format!(
                    "timed out after {}s connecting to {}:{}",
                    config.connect_timeout.as_secs(),
                    config.host,
                    config.port
                ))
            })?
            .map_err(|e| AppError::Connection(describe_pool_error(&e)))?;

        client.query_one(PING, &[]).await.map_err(|e| {
            AppError::Connection(format!("connection check failed: {}", describe_pg_error(&e)))
        })?;

        info!(
            "Connected to {} at {}:{} (TLS: {})",
            config.database, config.host, config.port, config.use_tls
        );

        Ok(Self {
            pool,
            client,
            query_timeout: config.query_timeout,
        })
    }

    /// Create a single-connection pool with given configuration
    fn create_pool(config: &DatabaseConfig) -> AppResult<Pool> {
        let mut cfg = Config::new();
        cfg.host = Some(config.host.clone());
        cfg.port = Some(config.port);
        cfg.user = Some(config.user.clone());
        cfg.password = Some(config.password.clone());
        cfg.dbname = Some(config.database.clone());
        cfg.connect_timeout = Some(config.connect_timeout);
        cfg.manager = Some(ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        });
        cfg.pool = Some(PoolConfig::new(1));

        let pool = if config.use_tls {
            // reqwest pulls in a second rustls backend, so pick one explicitly
            let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

            let certs = rustls_native_certs::load_native_certs();
            let mut root_store = rustls::RootCertStore::empty();
            for cert in certs.certs {
                root_store.add(cert).ok();
            }

            let tls_config = rustls::ClientConfig::builder()
                .with_root_certificates(root_store)
                .with_no_client_auth();

            let tls = tokio_postgres_rustls::MakeRustlsConnect::new(tls_config);
            cfg.create_pool(Some(Runtime::Tokio1), tls)
        } else {
            cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        };

        pool.map_err(|e| AppError::Connection(format!("Failed to create pool: {}", e)))
    }

    /// Release the connection. Consumes the handle so it happens once.
    pub fn close(self) {
        drop(self.client);
        self.pool.close();
        debug!("Database connection closed");
    }

    async fn bounded<T, F>(&self, what: &str, query: F) -> AppResult<T>
    where
        F: Future<Output = Result<T, tokio_postgres::Error>>,
    {
        tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| {
                census_error(format!(
                    "{} timed out after {}s",
                    what,
                    self.query_timeout.as_secs()
                ))
            })?
            .map_err(|e| census_error(format!("{}: {}", what, describe_pg_error(&e))))
    }
}

/// Opens `Database` handles from a fixed configuration
pub struct PostgresConnector {
    config: DatabaseConfig,
}

impl PostgresConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

impl CatalogConnector for PostgresConnector {
    type Source = Database;

    async fn connect(&self) -> AppResult<Database> {
        Database::connect(&self.config).await
    }

    fn close(&self, source: Database) {
        source.close();
    }
}

/// The server's own message when there is one, else the whole source chain.
/// `tokio_postgres::Error` on its own only displays "db error".
pub fn describe_pg_error(e: &tokio_postgres::Error) -> String {
    match e.as_db_error() {
        Some(db) => format!("{} (SQLSTATE {})", db.message(), db.code().code()),
        None => error_chain(e),
    }
}

fn describe_pool_error(e: &PoolError) -> String {
    match e {
        PoolError::Backend(pg) => describe_pg_error(pg),
        other => error_chain(other),
    }
}

/// Join an error and its sources with `: `, skipping a source whose text
/// the message already contains.
pub fn error_chain(e: &dyn std::error::Error) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl CatalogSource for Database {
    async fn list_base_tables(&self) -> AppResult<Vec<TableRef>> {
        let rows = self
            .bounded("listing base tables", self.client.query(LIST_BASE_TABLES, &[]))
            .await?;

        Ok(rows
            .iter()
            .map(|row| {
                TableRef::new(
                    row.get::<_, String>("table_schema"),
                    row.get::<_, String>("table_name"),
                )
            })
            .collect())
    }

    async fn count_rows(&self, table: &TableRef) -> AppResult<u64> {
        let sql = SqlBuilder::count_rows(&table.schema, &table.name);
        let what = format!("counting rows in {}", table.qualified_name());
        let row = self.bounded(&what, self.client.query_one(&sql, &[])).await?;

        let count: i64 = row.get(0);
        u64::try_from(count).map_err(|_| census_error(format!("{}: negative count {}", what, count)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thiserror::Error;

    #[derive(Error, Debug)]
    #[error("db error")]
    struct Wrapper {
        #[source]
        source: Inner,
    }

    #[derive(Error, Debug)]
    #[error("FATAL: role \"mgr\" does not exist")]
    struct Inner;

    #[derive(Error, Debug)]
    #[error("Error occurred while creating a new object: db error")]
    struct PoolLike {
        #[source]
        source: Wrapper,
    }

    #[test]
    fn test_error_chain_includes_server_message() {
        let err = Wrapper { source: Inner };
        assert_eq!(error_chain(&err), "db error: FATAL: role \"mgr\" does not exist");
    }

    #[test]
    fn test_error_chain_skips_repeated_text() {
        let err = PoolLike {
            source: Wrapper { source: Inner },
        };
        assert_eq!(
            error_chain(&err),
            "Error occurred while creating a new object: db error: FATAL: role \"mgr\" does not exist"
        );
    }

    #[test]
    fn test_error_chain_io_refused() {
        let err = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Connection refused");
        assert_eq!(error_chain(&err), "Connection refused");
    }

    #[tokio::test]
    async fn test_unreachable_server_reports_the_cause() {
        let config = DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            user: "mgr".to_string(),
            connect_timeout: Duration::from_secs(2),
            ..Default::default()
        };

        let err = match Database::connect(&config).await {
            Ok(_) => panic!("nothing listens on port 9"),
            Err(e) => e,
        };
        assert!(matches!(err, AppError::Connection(_)));
        let text = err.to_string();
        assert!(
            text.contains("refused") || text.contains("timed out"),
            "{}",
            text
        );
    }
}
