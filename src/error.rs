use thiserror::Error;

/// Problems with the declarative configuration. Always fatal: the run never
/// starts.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no tenants configured; refusing to run a migration that touches nothing")]
    NoTenants,

    #[error("tenant #{index} has an empty tenant_id")]
    EmptyTenantId { index: usize },

    #[error("tenant '{0}' is configured more than once")]
    DuplicateTenant(String),

    #[error("tenant '{0}' was requested but is not configured")]
    UnknownTenant(String),

    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("unsupported driver '{driver}' for tenant '{tenant}'")]
    UnsupportedDriver { tenant: String, driver: String },

    #[error("invalid connection url for tenant '{tenant}': {source}")]
    InvalidUrl {
        tenant: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("could not connect to database for tenant '{tenant}': {source}")]
    Connect {
        tenant: String,
        #[source]
        source: sqlx::Error,
    },
}

/// Failure to read a placeholder file. `NotFound` is kept apart from the rest
/// because the loader treats it as a warning, never as an error.
#[derive(Debug, Error)]
pub enum PlaceholderError {
    #[error("placeholder file not found at {0}")]
    NotFound(String),

    #[error("placeholder file at {location} could not be read: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("placeholder file at {location} is malformed (line {line}): {message}")]
    Parse {
        location: String,
        line: usize,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Engine(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// Why a single tenant ended up FAILED.
#[derive(Debug, Error)]
pub enum TenantError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    #[error(transparent)]
    Placeholder(#[from] PlaceholderError),

    #[error("migration failed: {0}")]
    Migration(#[from] MigrationError),
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("migration aborted at tenant '{tenant}': {source}")]
    TenantFailed {
        tenant: String,
        #[source]
        source: TenantError,
    },
}
