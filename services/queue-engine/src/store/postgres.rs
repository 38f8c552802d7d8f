//! Postgres-backed repositories.
//!
//! Every entity is kept as a JSONB document keyed by name. Deployments also
//! carry `queue_status` and `instance_running_start_time` columns so the
//! timeout sweep can filter running jobs in SQL. Audit records go to an
//! append-only `history` table.

use std::time::Duration;

use async_trait::async_trait;
use oqs_audit::{AuditRecord, EntityKind};
use serde::de::DeserializeOwned;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::types::Json;
use sqlx::Row;
use tracing::info;

use super::{
    ConfigurationRepository, DeploymentRepository, HistoryRepository, PodRepository, StoreError,
    StoreResult,
};
use crate::model::{Configuration, Deployment, DeploymentName, Pod, QueueStatus};

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Database connection URL.
    pub database_url: String,

    /// Maximum number of connections in the pool.
    pub max_connections: u32,

    /// Minimum number of idle connections.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub acquire_timeout: Duration,

    /// Idle connection timeout.
    pub idle_timeout: Duration,

    /// Maximum lifetime of a connection.
    pub max_lifetime: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "postgres://localhost/oqs".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(600),
            max_lifetime: Duration::from_secs(1800),
        }
    }
}

impl DbConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| defaults.database_url.clone());

        let max_connections = std::env::var("DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.max_connections);

        let min_connections = std::env::var("DB_MIN_CONNECTIONS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(defaults.min_connections);

        Self {
            database_url,
            max_connections,
            min_connections,
            ..defaults
        }
    }
}

/// Repositories over a shared Postgres pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new connection pool.
    pub async fn connect(config: &DbConfig) -> StoreResult<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Connecting to database"
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.acquire_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .max_lifetime(Some(config.max_lifetime))
            .connect(&config.database_url)
            .await
            .map_err(StoreError::Connect)?;

        info!("Database connection pool established");

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Check if the database is reachable.
    pub async fn health_check(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Run pending migrations from the first directory that loads.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations");

        let candidates = vec![
            std::path::PathBuf::from("./migrations"),
            std::path::PathBuf::from("services/queue-engine/migrations"),
            std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        ];
        let mut last_error: Option<sqlx::migrate::MigrateError> = None;

        for dir in &candidates {
            match sqlx::migrate::Migrator::new(dir.clone()).await {
                Ok(migrator) => {
                    info!(migrations_dir = %dir.display(), "Loaded migrations");
                    migrator
                        .run(&self.pool)
                        .await
                        .map_err(StoreError::Migration)?;
                    info!("Database migrations complete");
                    return Ok(());
                }
                Err(e) => {
                    last_error = Some(e);
                }
            }
        }

        let tried = candidates
            .iter()
            .map(|dir| dir.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        Err(StoreError::MigrationDirNotFound {
            tried,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "unknown error".to_string()),
        })
    }
}

fn decode<T: DeserializeOwned>(entity: &'static str, row: &PgRow) -> StoreResult<T> {
    let name: String = row.try_get("name")?;
    let Json(value): Json<serde_json::Value> = row.try_get("document")?;
    serde_json::from_value(value).map_err(|e| StoreError::Corrupt {
        entity,
        name,
        reason: e.to_string(),
    })
}

fn decode_all<T: DeserializeOwned>(entity: &'static str, rows: &[PgRow]) -> StoreResult<Vec<T>> {
    rows.iter().map(|row| decode(entity, row)).collect()
}

#[async_trait]
impl DeploymentRepository for PgStore {
    async fn list(&self) -> StoreResult<Vec<Deployment>> {
        let rows = sqlx::query("SELECT name, document FROM deployments ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        decode_all("deployment", &rows)
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Deployment>> {
        let row = sqlx::query("SELECT name, document FROM deployments WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|r| decode("deployment", r)).transpose()
    }

    async fn find_by_names(&self, names: &[DeploymentName]) -> StoreResult<Vec<Deployment>> {
        let names: Vec<String> = names.iter().map(ToString::to_string).collect();
        let rows = sqlx::query(
            r#"
            SELECT name, document
            FROM deployments
            WHERE name = ANY($1)
            ORDER BY array_position($1, name)
            "#,
        )
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;
        decode_all("deployment", &rows)
    }

    async fn find_running(&self) -> StoreResult<Vec<Deployment>> {
        let rows = sqlx::query(
            r#"
            SELECT name, document
            FROM deployments
            WHERE queue_status = $1 AND instance_running_start_time IS NOT NULL
            ORDER BY name
            "#,
        )
        .bind(QueueStatus::Active.as_str())
        .fetch_all(&self.pool)
        .await?;
        decode_all("deployment", &rows)
    }

    async fn save(&self, deployment: &Deployment) -> StoreResult<()> {
        let document = serde_json::to_value(deployment)?;
        sqlx::query(
            r#"
            INSERT INTO deployments
                (name, associated_pod, queue_status, instance_running_start_time, document)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                associated_pod = EXCLUDED.associated_pod,
                queue_status = EXCLUDED.queue_status,
                instance_running_start_time = EXCLUDED.instance_running_start_time,
                document = EXCLUDED.document,
                updated_at = now()
            "#,
        )
        .bind(deployment.name.as_str())
        .bind(deployment.associated_pod.as_str())
        .bind(deployment.queue_status.as_str())
        .bind(deployment.instance_running_start_time)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM deployments WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl PodRepository for PgStore {
    async fn list(&self) -> StoreResult<Vec<Pod>> {
        let rows = sqlx::query("SELECT name, document FROM pods ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        decode_all("pod", &rows)
    }

    async fn get(&self, name: &str) -> StoreResult<Option<Pod>> {
        let row = sqlx::query("SELECT name, document FROM pods WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(|r| decode("pod", r)).transpose()
    }

    async fn save(&self, pod: &Pod) -> StoreResult<()> {
        let document = serde_json::to_value(pod)?;
        sqlx::query(
            r#"
            INSERT INTO pods (name, document)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET
                document = EXCLUDED.document,
                updated_at = now()
            "#,
        )
        .bind(pod.name.as_str())
        .bind(Json(document))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM pods WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl ConfigurationRepository for PgStore {
    async fn list(&self) -> StoreResult<Vec<Configuration>> {
        let rows = sqlx::query("SELECT name, document FROM configurations ORDER BY created_at")
            .fetch_all(&self.pool)
            .await?;
        decode_all("configuration", &rows)
    }

    async fn active(&self) -> StoreResult<Option<Configuration>> {
        let row = sqlx::query(
            "SELECT name, document FROM configurations ORDER BY created_at LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(|r| decode("configuration", r)).transpose()
    }

    async fn save(&self, configuration: &Configuration) -> StoreResult<()> {
        let document = serde_json::to_value(configuration)?;
        sqlx::query(
            r#"
            INSERT INTO configurations (name, document)
            VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET
                document = EXCLUDED.document,
                updated_at = now()
            "#,
        )
        .bind(configuration.name.as_str())
        .bind(Json(document))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, name: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM configurations WHERE name = $1")
            .bind(name)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl HistoryRepository for PgStore {
    async fn append(&self, record: &AuditRecord) -> StoreResult<()> {
        let document = serde_json::to_value(record)?;
        sqlx::query(
            r#"
            INSERT INTO history (audit_id, entity_kind, entity_name, occurred_at, record)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(record.audit_id.to_string())
        .bind(record.entity_kind.to_string())
        .bind(&record.entity_name)
        .bind(record.occurred_at)
        .bind(Json(document))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list(&self, kind: EntityKind) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT audit_id AS name, record AS document
            FROM history
            WHERE entity_kind = $1
            ORDER BY seq
            "#,
        )
        .bind(kind.to_string())
        .fetch_all(&self.pool)
        .await?;
        decode_all("history", &rows)
    }

    async fn for_entity(&self, kind: EntityKind, name: &str) -> StoreResult<Vec<AuditRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT audit_id AS name, record AS document
            FROM history
            WHERE entity_kind = $1 AND entity_name = $2
            ORDER BY seq
            "#,
        )
        .bind(kind.to_string())
        .bind(name)
        .fetch_all(&self.pool)
        .await?;
        decode_all("history", &rows)
    }
}
