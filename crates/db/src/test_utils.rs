//! Test databases.
//!
//! Scenario tests use [`TestDatabase::in_memory`]. The Postgres constructors
//! back the `#[ignore]`d integration runs.

use crate::migrations::Migrator;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, DbErr,
    Statement,
};
use sea_orm_migration::MigratorTrait;
use tracing::info;

/// Tables in reverse dependency order, for wiping data between runs.
const TABLES: &[&str] = &[
    "conversation",
    "invitation",
    "event_attendee",
    "event",
    "activity_participant",
    "activity",
    "user_block",
    "buddy_connection",
    "trip",
    "user_tag",
    "user_profile",
    "user",
];

/// Postgres connection settings read from `TEST_DB_*`.
#[derive(Debug, Clone)]
pub struct TestDbConfig {
    /// Database host.
    pub host: String,
    /// Database port.
    pub port: u16,
    /// Database username.
    pub username: String,
    /// Database password.
    pub password: String,
    /// Database name.
    pub database: String,
}

impl Default for TestDbConfig {
    fn default() -> Self {
        let var =
            |key: &str, default: &str| std::env::var(key).unwrap_or_else(|_| default.to_string());
        Self {
            host: var("TEST_DB_HOST", "localhost"),
            port: std::env::var("TEST_DB_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5433),
            username: var("TEST_DB_USER", "tripmate_test"),
            password: var("TEST_DB_PASSWORD", "tripmate_test"),
            database: var("TEST_DB_NAME", "tripmate_test"),
        }
    }
}

impl TestDbConfig {
    /// URL of the test database.
    #[must_use]
    pub fn database_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database
        )
    }

    /// URL of the server's maintenance database.
    #[must_use]
    pub fn postgres_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/postgres",
            self.username, self.password, self.host, self.port
        )
    }
}

/// A migrated database for tests.
pub struct TestDatabase {
    /// Database connection.
    pub conn: DatabaseConnection,
    /// Postgres settings (unused for in-memory databases).
    pub config: TestDbConfig,
}

impl TestDatabase {
    /// Connect to the Postgres test database from the environment and migrate it.
    pub async fn new() -> Result<Self, DbErr> {
        Self::with_config(TestDbConfig::default()).await
    }

    /// Open a private SQLite in-memory database with all migrations applied.
    ///
    /// The pool is pinned to a single connection so every query sees the
    /// same in-memory database. Requires the `test-utils` feature.
    pub async fn in_memory() -> Result<Self, DbErr> {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;
        Migrator::up(&conn, None).await?;

        Ok(Self {
            conn,
            config: TestDbConfig::default(),
        })
    }

    /// Connect to a Postgres database and migrate it.
    pub async fn with_config(config: TestDbConfig) -> Result<Self, DbErr> {
        let conn = Database::connect(&config.database_url()).await?;
        Migrator::up(&conn, None).await?;

        info!(database = %config.database, "Connected to test database");
        Ok(Self { conn, config })
    }

    /// Get the database connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.conn
    }

    /// Delete every row, keeping the schema.
    pub async fn cleanup(&self) -> Result<(), DbErr> {
        let backend = self.conn.get_database_backend();
        for table in TABLES {
            let sql = match backend {
                DatabaseBackend::Postgres => format!("TRUNCATE TABLE \"{table}\" CASCADE"),
                _ => format!("DELETE FROM \"{table}\""),
            };
            self.conn
                .execute(Statement::from_string(backend, sql))
                .await?;
        }

        info!("Cleaned up test database");
        Ok(())
    }
}
