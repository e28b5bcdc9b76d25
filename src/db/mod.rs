pub mod engine;
pub mod source;
pub mod tenant;

use std::str::FromStr;

use async_trait::async_trait;
use sqlx::postgres::PgConnectOptions;
use sqlx::{Connection, PgConnection};

use crate::error::ConnectionError;
use crate::models::tenant::TenantDescriptor;

/// Opens the one connection a tenant's migration runs on.
#[async_trait]
pub trait ConnectionProvisioner: Send + Sync {
    type Connection: Send;

    async fn provision(&self, tenant: &TenantDescriptor) -> Result<Self::Connection, ConnectionError>;

    async fn release(&self, conn: Self::Connection) {
        drop(conn);
    }
}

/// Dedicated (unpooled) PostgreSQL connection per tenant.
#[derive(Debug, Clone, Copy, Default)]
pub struct PgProvisioner;

pub fn is_postgres_driver(driver: &str) -> bool {
    matches!(
        driver.trim().to_ascii_lowercase().as_str(),
        "postgres" | "postgresql" | "pg" | "org.postgresql.driver"
    )
}

/// Descriptor credentials take precedence over any embedded in the url.
/// JDBC-style `jdbc:postgresql://` urls are accepted.
pub fn connect_options(tenant: &TenantDescriptor) -> Result<PgConnectOptions, ConnectionError> {
    let params = &tenant.connection;
    if !is_postgres_driver(&params.driver) {
        return Err(ConnectionError::UnsupportedDriver {
            tenant: tenant.tenant_id.clone(),
            driver: params.driver.clone(),
        });
    }

    let url = params.url.strip_prefix("jdbc:").unwrap_or(&params.url);
    let mut options = PgConnectOptions::from_str(url).map_err(|source| ConnectionError::InvalidUrl {
        tenant: tenant.tenant_id.clone(),
        source,
    })?;

    if let Some(username) = params.username.as_deref().filter(|u| !u.is_empty()) {
        options = options.username(username);
    }
    if let Some(password) = params.password.as_deref() {
        options = options.password(password);
    }

    Ok(options.application_name("tenant-migrator"))
}

#[async_trait]
impl ConnectionProvisioner for PgProvisioner {
    type Connection = PgConnection;

    async fn provision(&self, tenant: &TenantDescriptor) -> Result<PgConnection, ConnectionError> {
        let options = connect_options(tenant)?;
        tracing::info!("Configuring connection for tenant {}", tenant.tenant_id);

        PgConnection::connect_with(&options)
            .await
            .map_err(|source| ConnectionError::Connect {
                tenant: tenant.tenant_id.clone(),
                source,
            })
    }

    async fn release(&self, conn: PgConnection) {
        if let Err(e) = conn.close().await {
            tracing::warn!("Failed to close tenant connection cleanly: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::tenant::ConnectionParams;

    fn tenant(driver: &str, url: &str) -> TenantDescriptor {
        TenantDescriptor {
            tenant_id: "alpha".into(),
            name: None,
            connection: ConnectionParams {
                driver: driver.into(),
                url: url.into(),
                username: Some("migrator".into()),
                password: Some("secret".into()),
            },
            script_path: None,
            placeholder_path: None,
        }
    }

    #[test]
    fn test_known_driver_identifiers() {
        for driver in ["postgres", "PostgreSQL", " pg ", "org.postgresql.Driver"] {
            assert!(is_postgres_driver(driver), "{driver}");
        }
        for driver in ["mysql", "com.mysql.cj.jdbc.Driver", ""] {
            assert!(!is_postgres_driver(driver), "{driver}");
        }
    }

    #[test]
    fn test_credentials_override_url() {
        let options =
            connect_options(&tenant("postgres", "postgres://someone:pw@db.internal:6543/app")).unwrap();
        assert_eq!(options.get_username(), "migrator");
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6543);
    }

    #[test]
    fn test_jdbc_url_is_accepted() {
        let options =
            connect_options(&tenant("org.postgresql.Driver", "jdbc:postgresql://localhost:5432/app"))
                .unwrap();
        assert_eq!(options.get_database(), Some("app"));
    }

    #[test]
    fn test_bad_parameters_are_rejected() {
        assert!(matches!(
            connect_options(&tenant("mysql", "mysql://localhost/app")),
            Err(ConnectionError::UnsupportedDriver { .. })
        ));
        assert!(matches!(
            connect_options(&tenant("postgres", "not a url")),
            Err(ConnectionError::InvalidUrl { .. })
        ));
    }

    #[tokio::test]
    async fn test_unsupported_driver_fails_before_connecting() {
        let err = PgProvisioner
            .provision(&tenant("oracle", "oracle://localhost/app"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unsupported driver 'oracle'"));
    }
}
