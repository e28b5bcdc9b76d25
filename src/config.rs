use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigurationError;
use crate::models::tenant::TenantDescriptor;
use crate::services::location::DEFAULT_SCRIPT_ROOT;

/// Prefix for environment overrides, e.g. `TENANT_MIGRATOR__MIGRATION__SCRIPT_ROOT`.
pub const ENV_PREFIX: &str = "TENANT_MIGRATOR";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub migration: MigrationSettings,
    #[serde(default)]
    pub tenants: Vec<TenantDescriptor>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop at the first failed tenant.
    #[default]
    Abort,
    /// Record the failure and move on to the next tenant.
    Continue,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationSettings {
    pub script_root: String,
    pub baseline_on_migrate: bool,
    pub baseline_version: i64,
    pub failure_policy: FailurePolicy,
    pub strict_placeholders: bool,
}

impl Default for MigrationSettings {
    fn default() -> Self {
        Self {
            script_root: DEFAULT_SCRIPT_ROOT.into(),
            baseline_on_migrate: true,
            baseline_version: 1,
            failure_policy: FailurePolicy::Abort,
            strict_placeholders: false,
        }
    }
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        if !path.exists() {
            tracing::warn!(
                "Settings file {} not found, relying on environment only",
                path.display()
            );
        }

        let settings = config::Config::builder()
            .add_source(config::File::from(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// Tenants in configuration order. Never empty.
#[derive(Debug, Clone)]
pub struct TenantRegistry {
    tenants: Vec<TenantDescriptor>,
}

impl TenantRegistry {
    pub fn new(tenants: Vec<TenantDescriptor>) -> Result<Self, ConfigurationError> {
        if tenants.is_empty() {
            return Err(ConfigurationError::NoTenants);
        }

        let mut seen = HashSet::new();
        for (index, tenant) in tenants.iter().enumerate() {
            if tenant.tenant_id.trim().is_empty() {
                return Err(ConfigurationError::EmptyTenantId { index });
            }
            if !seen.insert(tenant.tenant_id.as_str()) {
                return Err(ConfigurationError::DuplicateTenant(tenant.tenant_id.clone()));
            }
        }

        Ok(Self { tenants })
    }

    /// Narrow to `ids`, keeping registry order. No ids keeps everyone.
    pub fn select(self, ids: &[String]) -> Result<Self, ConfigurationError> {
        if ids.is_empty() {
            return Ok(self);
        }
        if let Some(unknown) = ids
            .iter()
            .find(|id| !self.tenants.iter().any(|t| &t.tenant_id == *id))
        {
            return Err(ConfigurationError::UnknownTenant(unknown.clone()));
        }

        let tenants = self
            .tenants
            .into_iter()
            .filter(|t| ids.contains(&t.tenant_id))
            .collect();
        Ok(Self { tenants })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TenantDescriptor> {
        self.tenants.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.tenants.iter().map(|t| t.tenant_id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenant::ConnectionParams;

    fn tenant(id: &str) -> TenantDescriptor {
        TenantDescriptor {
            tenant_id: id.into(),
            name: None,
            connection: ConnectionParams {
                driver: "postgres".into(),
                url: "postgres://localhost/app".into(),
                username: None,
                password: None,
            },
            script_path: None,
            placeholder_path: None,
        }
    }

    #[test]
    fn test_empty_registry_is_rejected() {
        assert!(matches!(
            TenantRegistry::new(vec![]),
            Err(ConfigurationError::NoTenants)
        ));
    }

    #[test]
    fn test_blank_and_duplicate_ids_are_rejected() {
        assert!(matches!(
            TenantRegistry::new(vec![tenant("alpha"), tenant("  ")]),
            Err(ConfigurationError::EmptyTenantId { index: 1 })
        ));
        assert!(matches!(
            TenantRegistry::new(vec![tenant("alpha"), tenant("beta"), tenant("alpha")]),
            Err(ConfigurationError::DuplicateTenant(id)) if id == "alpha"
        ));
    }

    #[test]
    fn test_select_keeps_registry_order() {
        let registry =
            TenantRegistry::new(vec![tenant("alpha"), tenant("beta"), tenant("gamma")]).unwrap();

        let selected = registry
            .clone()
            .select(&["gamma".to_string(), "alpha".to_string()])
            .unwrap();
        assert_eq!(selected.ids(), ["alpha", "gamma"]);

        assert_eq!(registry.clone().select(&[]).unwrap().len(), 3);
        assert!(matches!(
            registry.select(&["delta".to_string()]),
            Err(ConfigurationError::UnknownTenant(id)) if id == "delta"
        ));
    }

    #[test]
    fn test_load_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenants.toml");
        std::fs::write(
            &path,
            r#"
[migration]
script_root = "filesystem:/srv/sql/"
failure_policy = "continue"

[[tenants]]
tenant_id = "alpha"
name = "Alpha Co"
driver = "postgres"
url = "postgres://localhost:5432/app"
username = "app"
password = "secret"
placeholder_path = "filesystem:/etc/alpha.properties"

[[tenants]]
data_source_name = "beta"
driver_class_name = "org.postgresql.Driver"
url = "jdbc:postgresql://localhost:5432/app"
script_path = "custom/beta"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.migration.script_root, "filesystem:/srv/sql/");
        assert_eq!(settings.migration.failure_policy, FailurePolicy::Continue);
        assert!(settings.migration.baseline_on_migrate);
        assert_eq!(settings.migration.baseline_version, 1);
        assert!(!settings.migration.strict_placeholders);

        let registry = TenantRegistry::new(settings.tenants).unwrap();
        assert_eq!(registry.ids(), ["alpha", "beta"]);

        let alpha = registry.iter().next().unwrap();
        assert_eq!(alpha.label(), "Alpha Co");
        assert_eq!(alpha.connection.password.as_deref(), Some("secret"));
        assert_eq!(
            alpha.placeholder_path.as_deref(),
            Some("filesystem:/etc/alpha.properties")
        );

        let beta = registry.iter().nth(1).unwrap();
        assert_eq!(beta.connection.driver, "org.postgresql.Driver");
        assert_eq!(beta.script_path.as_deref(), Some("custom/beta"));
        assert_eq!(beta.connection.username, None);
    }

    #[test]
    fn test_settings_without_tenants_fail_registry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tenants.toml");
        std::fs::write(&path, "[migration]\nscript_root = \"db/migration/\"\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.migration.script_root, DEFAULT_SCRIPT_ROOT);
        assert!(matches!(
            TenantRegistry::new(settings.tenants),
            Err(ConfigurationError::NoTenants)
        ));
    }
}
