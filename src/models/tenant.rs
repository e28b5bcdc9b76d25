use std::fmt;

use serde::Deserialize;

/// One configured tenant. The id doubles as the schema name.
#[derive(Debug, Clone, Deserialize)]
pub struct TenantDescriptor {
    #[serde(alias = "data_source_name")]
    pub tenant_id: String,
    /// Human readable label, only used in log lines.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub connection: ConnectionParams,
    /// Script directory override; replaces `<script_root><tenant_id>` verbatim.
    #[serde(default)]
    pub script_path: Option<String>,
    /// Placeholder file location. Absent means no substitution for this tenant.
    #[serde(default)]
    pub placeholder_path: Option<String>,
}

impl TenantDescriptor {
    /// Schema the tenant's migrations are applied to.
    pub fn schema(&self) -> &str {
        &self.tenant_id
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.tenant_id)
    }
}

#[derive(Clone, Deserialize)]
pub struct ConnectionParams {
    #[serde(alias = "driver_class_name")]
    pub driver: String,
    pub url: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl fmt::Debug for ConnectionParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionParams")
            .field("driver", &self.driver)
            .field("url", &self.url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}
