use std::fmt;

use chrono::{DateTime, Duration, Utc};

/// Per-tenant position in the migration state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TenantState {
    Pending,
    ScriptLocationResolved,
    PlaceholdersLoaded,
    EngineConfigured,
    Migrated,
    Failed,
}

impl fmt::Display for TenantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TenantState::Pending => "PENDING",
            TenantState::ScriptLocationResolved => "SCRIPT_LOCATION_RESOLVED",
            TenantState::PlaceholdersLoaded => "PLACEHOLDERS_LOADED",
            TenantState::EngineConfigured => "ENGINE_CONFIGURED",
            TenantState::Migrated => "MIGRATED",
            TenantState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    Migrated { applied: usize },
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub tenant_id: String,
    pub status: MigrationStatus,
}

impl MigrationOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, MigrationStatus::Failed { .. })
    }
}

/// What the engine reports back for one tenant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Scripts found at the tenant's script location.
    pub resolved: usize,
    /// Ledger entries added by this run.
    pub applied: usize,
}

/// Outcomes of every attempted tenant, in registry order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<MigrationOutcome>,
}

impl RunReport {
    /// Wall-clock time of the run; zero if the clock stepped backwards.
    pub fn elapsed(&self) -> Duration {
        (self.finished_at - self.started_at).max(Duration::zero())
    }

    pub fn failed_tenants(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_failure())
            .map(|o| o.tenant_id.as_str())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        self.outcomes.iter().any(MigrationOutcome::is_failure)
    }

    pub fn total_applied(&self) -> usize {
        self.outcomes
            .iter()
            .map(|o| match o.status {
                MigrationStatus::Migrated { applied } => applied,
                MigrationStatus::Failed { .. } => 0,
            })
            .sum()
    }
}
