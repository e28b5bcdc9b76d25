//! Migration scripts read from a tenant's script location, with optional
//! `${key}` placeholder substitution, fed to `sqlx::migrate::Migrator`.

use std::borrow::Cow;

use futures_util::future::BoxFuture;
use sqlx::error::BoxDynError;
use sqlx::migrate::{Migration, MigrationSource, MigrationType};

use crate::models::location::{PlaceholderMap, ResourceLocation};
use crate::resources::{self, ResourceError};

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("could not read migration scripts at {location}: {source}")]
    Read {
        location: String,
        #[source]
        source: ResourceError,
    },

    #[error("script {script} is not valid UTF-8")]
    Encoding { script: String },

    #[error("scripts {first} and {second} share version {version}")]
    DuplicateVersion {
        version: i64,
        first: String,
        second: String,
    },

    #[error("no value for placeholder ${{{key}}} in script {script}")]
    UnresolvedPlaceholder { script: String, key: String },
}

/// `<version>_<description>.sql` or `V<version>__<description>.sql`, with
/// optional `.up` / `.down` before the extension.
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptName {
    pub version: i64,
    pub description: String,
    pub migration_type: MigrationType,
}

impl ScriptName {
    pub fn parse(path: &str) -> Option<Self> {
        let file = path.rsplit('/').next()?;
        let stem = file.strip_suffix(".sql")?;

        let (stem, migration_type) = if let Some(s) = stem.strip_suffix(".down") {
            (s, MigrationType::ReversibleDown)
        } else if let Some(s) = stem.strip_suffix(".up") {
            (s, MigrationType::ReversibleUp)
        } else {
            (stem, MigrationType::Simple)
        };

        let stem = stem
            .strip_prefix(|c: char| c == 'V' || c == 'v')
            .filter(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
            .unwrap_or(stem);

        let (version, description) = stem.split_once('_')?;
        if version.is_empty() || !version.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        Some(Self {
            version: version.parse().ok()?,
            description: description.trim_start_matches('_').replace('_', " "),
            migration_type,
        })
    }
}

/// Replaces every `${key}`. An unterminated `${` is left alone; a key with no
/// value is returned as the error.
pub fn substitute(sql: &str, placeholders: &PlaceholderMap) -> Result<String, String> {
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let key = &after[..end];
        let value = placeholders.get(key).ok_or_else(|| key.to_string())?;
        out.push_str(&rest[..start]);
        out.push_str(value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[derive(Debug, Clone)]
pub struct ScriptSource {
    location: String,
    placeholders: Option<PlaceholderMap>,
}

impl ScriptSource {
    /// `placeholders: None` leaves script text untouched.
    pub fn new(location: impl Into<String>, placeholders: Option<PlaceholderMap>) -> Self {
        Self {
            location: location.into(),
            placeholders,
        }
    }

    /// Down scripts and non-`.sql` files are skipped. A missing location
    /// resolves to no scripts.
    pub async fn load(&self) -> Result<Vec<Migration>, ScriptError> {
        let location = ResourceLocation::parse_script_location(&self.location);
        let files = match resources::list(&location).await {
            Ok(files) => files,
            Err(ResourceError::NotFound) => Vec::new(),
            Err(source) => {
                return Err(ScriptError::Read {
                    location: location.to_string(),
                    source,
                })
            }
        };

        let mut scripts: Vec<(String, Migration)> = Vec::new();
        for file in files {
            let Some(name) = ScriptName::parse(&file.name) else {
                if file.name.ends_with(".sql") {
                    tracing::warn!(
                        "Skipping {} at {location}: expected <version>_<description>.sql",
                        file.name
                    );
                } else {
                    tracing::debug!("Ignoring non-migration file {}", file.name);
                }
                continue;
            };
            if name.migration_type.is_down_migration() {
                continue;
            }

            let sql = String::from_utf8(file.contents).map_err(|_| ScriptError::Encoding {
                script: file.name.clone(),
            })?;
            let no_tx = sql.starts_with("-- no-transaction");

            let substituted = match &self.placeholders {
                Some(map) => Some(substitute(&sql, map).map_err(|key| {
                    ScriptError::UnresolvedPlaceholder {
                        script: file.name.clone(),
                        key,
                    }
                })?),
                None => None,
            };

            // checksum covers the template, so new placeholder values do not
            // invalidate already-applied versions
            let mut migration = Migration::new(
                name.version,
                Cow::Owned(name.description),
                name.migration_type,
                Cow::Owned(sql),
                no_tx,
            );
            if let Some(sql) = substituted {
                migration.sql = Cow::Owned(sql);
            }
            scripts.push((file.name, migration));
        }

        scripts.sort_by_key(|(_, m)| m.version);
        if let Some(pair) = scripts.windows(2).find(|w| w[0].1.version == w[1].1.version) {
            return Err(ScriptError::DuplicateVersion {
                version: pair[0].1.version,
                first: pair[0].0.clone(),
                second: pair[1].0.clone(),
            });
        }

        if scripts.is_empty() {
            tracing::warn!("No migration scripts found at {location}");
        }

        Ok(scripts.into_iter().map(|(_, m)| m).collect())
    }
}

impl<'s> MigrationSource<'s> for ScriptSource {
    fn resolve(self) -> BoxFuture<'s, Result<Vec<Migration>, BoxDynError>> {
        Box::pin(async move { Ok(self.load().await?) })
    }
}
