use async_trait::async_trait;
use sqlx::migrate::{Migrate, Migrator};
use sqlx::PgConnection;
use tracing::info;

use crate::db::source::ScriptSource;
use crate::db::tenant;
use crate::error::MigrationError;
use crate::models::location::PlaceholderMap;
use crate::models::outcome::MigrationReport;

/// Everything the engine is told about one tenant's migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub script_location: String,
    pub schema: String,
    pub baseline_on_migrate: bool,
    pub baseline_version: i64,
    /// `None` keeps placeholder replacement off.
    pub placeholders: Option<PlaceholderMap>,
}

impl EngineConfig {
    /// An empty map turns replacement off rather than enabling it with nothing
    /// to replace.
    pub fn with_placeholders(mut self, placeholders: PlaceholderMap) -> Self {
        self.placeholders = (!placeholders.is_empty()).then_some(placeholders);
        self
    }

    pub fn placeholder_replacement(&self) -> bool {
        self.placeholders.is_some()
    }
}

/// Applies pending versioned scripts to a schema and records them in the
/// schema's ledger. Running it again with nothing pending applies nothing.
#[async_trait]
pub trait MigrationEngine: Send + Sync {
    type Connection: Send;

    async fn migrate(
        &self,
        conn: &mut Self::Connection,
        config: &EngineConfig,
    ) -> Result<MigrationReport, MigrationError>;
}

/// `sqlx::migrate` against a tenant schema on PostgreSQL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgMigrationEngine;

#[async_trait]
impl MigrationEngine for PgMigrationEngine {
    type Connection = PgConnection;

    async fn migrate(
        &self,
        conn: &mut PgConnection,
        config: &EngineConfig,
    ) -> Result<MigrationReport, MigrationError> {
        tenant::prepare_schema(conn, &config.schema).await?;

        let source = ScriptSource::new(config.script_location.clone(), config.placeholders.clone());
        let migrator = Migrator::new(source).await?;
        let resolved = migrator.iter().count();
        info!(
            "Resolved {resolved} script(s) for schema {} (placeholder replacement: {})",
            config.schema,
            config.placeholder_replacement()
        );

        if config.baseline_on_migrate {
            let baselined =
                tenant::baseline_if_needed(conn, &config.schema, &migrator, config.baseline_version)
                    .await?;
            if baselined > 0 {
                info!("Recorded {baselined} baseline version(s) for schema {}", config.schema);
            }
        }

        conn.ensure_migrations_table().await?;
        let before = conn.list_applied_migrations().await?.len();
        migrator.run_direct(&mut *conn).await?;
        let after = conn.list_applied_migrations().await?.len();

        Ok(MigrationReport {
            resolved,
            applied: after.saturating_sub(before),
        })
    }
}
