use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::{FailurePolicy, MigrationSettings, TenantRegistry};
use crate::db::engine::{EngineConfig, MigrationEngine};
use crate::db::ConnectionProvisioner;
use crate::error::{RunError, TenantError};
use crate::models::outcome::{
    MigrationOutcome, MigrationReport, MigrationStatus, RunReport, TenantState,
};
use crate::models::tenant::TenantDescriptor;
use crate::services::location;
use crate::services::placeholders::PlaceholderLoader;

fn transition(tenant: &str, state: TenantState) {
    debug!(tenant = %tenant, state = %state, "Tenant state changed");
}

/// Migrates every tenant of a registry, one at a time, in registry order.
pub struct MigrationDriver<P, E> {
    settings: MigrationSettings,
    provisioner: P,
    engine: E,
    placeholders: PlaceholderLoader,
}

impl<P, E> MigrationDriver<P, E>
where
    P: ConnectionProvisioner,
    E: MigrationEngine<Connection = P::Connection>,
{
    pub fn new(settings: MigrationSettings, provisioner: P, engine: E) -> Self {
        let placeholders = PlaceholderLoader::new(settings.strict_placeholders);
        Self {
            settings,
            provisioner,
            engine,
            placeholders,
        }
    }

    /// Under [`FailurePolicy::Abort`] the first failed tenant ends the run and
    /// later tenants are never attempted. Under [`FailurePolicy::Continue`] the
    /// report carries every outcome and the caller decides what a failure means.
    pub async fn run(&self, registry: &TenantRegistry) -> Result<RunReport, RunError> {
        let started_at = Utc::now();
        info!("Starting migration for {} tenant(s)", registry.len());

        let mut outcomes = Vec::with_capacity(registry.len());
        for tenant in registry.iter() {
            let id = tenant.tenant_id.as_str();
            match self.migrate_tenant(tenant).await {
                Ok(report) => outcomes.push(MigrationOutcome {
                    tenant_id: id.to_string(),
                    status: MigrationStatus::Migrated {
                        applied: report.applied,
                    },
                }),
                Err(e) => {
                    transition(id, TenantState::Failed);
                    match self.settings.failure_policy {
                        FailurePolicy::Abort => {
                            let skipped = registry.len() - outcomes.len() - 1;
                            if skipped > 0 {
                                warn!("Aborting run, {skipped} tenant(s) left unmigrated");
                            }
                            error!("Migration failed for tenant {id}: {e}");
                            return Err(RunError::TenantFailed {
                                tenant: id.to_string(),
                                source: e,
                            });
                        }
                        FailurePolicy::Continue => {
                            error!("Migration failed for tenant {id}, continuing: {e}");
                            outcomes.push(MigrationOutcome {
                                tenant_id: id.to_string(),
                                status: MigrationStatus::Failed {
                                    reason: e.to_string(),
                                },
                            });
                        }
                    }
                }
            }
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            outcomes,
        };

        if report.has_failures() {
            warn!(
                "Migration finished with failures for: {} ({} ms)",
                report.failed_tenants().join(", "),
                report.elapsed().num_milliseconds()
            );
        } else {
            info!(
                "*** Migration complete for {} tenant(s), {} script(s) applied in {} ms ***",
                report.outcomes.len(),
                report.total_applied(),
                report.elapsed().num_milliseconds()
            );
        }

        Ok(report)
    }

    async fn migrate_tenant(&self, tenant: &TenantDescriptor) -> Result<MigrationReport, TenantError> {
        let id = tenant.tenant_id.as_str();
        transition(id, TenantState::Pending);
        info!("Starting migration for tenant {id} ({})", tenant.label());

        let location = location::resolve(tenant, &self.settings.script_root);
        info!("Script location for {id}: {}", location.script_directory);
        transition(id, TenantState::ScriptLocationResolved);

        let placeholders = self
            .placeholders
            .load(location.placeholder_file.as_ref())
            .await?;
        transition(id, TenantState::PlaceholdersLoaded);

        let mut conn = self.provisioner.provision(tenant).await?;

        let config = EngineConfig {
            script_location: location.script_directory,
            schema: tenant.schema().to_string(),
            baseline_on_migrate: self.settings.baseline_on_migrate,
            baseline_version: self.settings.baseline_version,
            placeholders: None,
        }
        .with_placeholders(placeholders);
        transition(id, TenantState::EngineConfigured);

        info!("Applying migrations for tenant {id}");
        let result = self.engine.migrate(&mut conn, &config).await;
        self.provisioner.release(conn).await;
        let report = result?;

        transition(id, TenantState::Migrated);
        info!(
            "Completed migrations for tenant {id}: {} applied, {} resolved",
            report.applied, report.resolved
        );
        Ok(report)
    }
}
