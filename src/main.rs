use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_migrator::config::{Settings, TenantRegistry};
use tenant_migrator::db::engine::PgMigrationEngine;
use tenant_migrator::db::PgProvisioner;
use tenant_migrator::services::migration::MigrationDriver;

#[derive(Parser)]
#[command(
    name = "tenant-migrator",
    about = "Apply versioned schema migrations to every configured tenant"
)]
struct Args {
    /// Settings file listing the tenants to migrate
    #[arg(long, env = "TENANT_MIGRATOR_CONFIG", default_value = "tenants.toml")]
    config: PathBuf,

    /// Only migrate this tenant (repeatable); configuration order is kept
    #[arg(long = "tenant")]
    tenants: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Tenant initialization started from {}", args.config.display());

    let settings = match Settings::load(&args.config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("Could not load settings: {e}");
            return Err(e.into());
        }
    };

    let registry = match TenantRegistry::new(settings.tenants).and_then(|r| r.select(&args.tenants)) {
        Ok(registry) => registry,
        Err(e) => {
            error!("Invalid tenant configuration: {e}");
            warn!("Shutting down without migrating");
            return Err(e.into());
        }
    };
    info!("Tenants configured: {}", registry.ids().join(", "));

    let driver = MigrationDriver::new(settings.migration, PgProvisioner, PgMigrationEngine);
    match driver.run(&registry).await {
        Ok(report) if report.has_failures() => {
            let failed = report.failed_tenants().join(", ");
            error!("Migration failed for tenant(s): {failed}");
            anyhow::bail!("migration failed for tenant(s): {failed}")
        }
        Ok(_) => Ok(()),
        Err(e) => {
            error!("{e}");
            Err(e.into())
        }
    }
}
