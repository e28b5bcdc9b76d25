//! Access to the two places scripts and placeholder files can live: the
//! resource set embedded in the binary and the OS filesystem.

use std::io;
use std::path::PathBuf;

use rust_embed::RustEmbed;

use crate::models::location::ResourceLocation;

/// Everything under `resources/` at build time.
#[derive(RustEmbed)]
#[folder = "resources/"]
pub struct BundledResources;

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("resource not found")]
    NotFound,

    #[error(transparent)]
    Io(io::Error),
}

impl From<io::Error> for ResourceError {
    fn from(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::NotFound {
            ResourceError::NotFound
        } else {
            ResourceError::Io(err)
        }
    }
}

/// A file found under a resource directory, named relative to that directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    pub name: String,
    pub contents: Vec<u8>,
}

fn bundled_key(path: &str) -> &str {
    path.trim_start_matches('/')
}

pub async fn read(location: &ResourceLocation) -> Result<Vec<u8>, ResourceError> {
    match location {
        ResourceLocation::Bundled(path) => BundledResources::get(bundled_key(path))
            .map(|file| file.data.into_owned())
            .ok_or(ResourceError::NotFound),
        ResourceLocation::OnDisk(path) => Ok(tokio::fs::read(path).await?),
    }
}

/// Every file below `location`, recursively, sorted by name. A missing disk
/// directory yields `NotFound`; a bundled one is just empty.
pub async fn list(location: &ResourceLocation) -> Result<Vec<ResourceFile>, ResourceError> {
    let mut files = match location {
        ResourceLocation::Bundled(path) => list_bundled(path),
        ResourceLocation::OnDisk(path) => list_on_disk(path.clone()).await?,
    };
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

fn list_bundled(dir: &str) -> Vec<ResourceFile> {
    let dir = bundled_key(dir).trim_end_matches('/');
    let prefix = if dir.is_empty() {
        String::new()
    } else {
        format!("{dir}/")
    };

    BundledResources::iter()
        .filter_map(|key| {
            let name = key.strip_prefix(prefix.as_str())?.to_string();
            let file = BundledResources::get(&key)?;
            Some(ResourceFile {
                name,
                contents: file.data.into_owned(),
            })
        })
        .collect()
}

async fn list_on_disk(root: PathBuf) -> Result<Vec<ResourceFile>, ResourceError> {
    let mut files = Vec::new();
    let mut pending = vec![root.clone()];

    while let Some(dir) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                pending.push(path);
                continue;
            }
            let name = path
                .strip_prefix(&root)
                .unwrap_or(&path)
                .to_string_lossy()
                .replace('\\', "/");
            let contents = tokio::fs::read(&path).await?;
            files.push(ResourceFile { name, contents });
        }
    }

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_bundled_file() {
        let location = ResourceLocation::parse("placeholders/tenant_one.properties");
        let bytes = read(&location).await.unwrap();
        assert!(bytes.starts_with(b"# Default substitutions"));

        let leading_slash = ResourceLocation::parse("/placeholders/tenant_one.properties");
        assert!(read(&leading_slash).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_resources_are_not_found() {
        let bundled = ResourceLocation::parse("placeholders/nobody.properties");
        assert!(matches!(read(&bundled).await, Err(ResourceError::NotFound)));

        let dir = tempfile::tempdir().unwrap();
        let disk = ResourceLocation::OnDisk(dir.path().join("missing.properties"));
        assert!(matches!(read(&disk).await, Err(ResourceError::NotFound)));
        let missing_dir = ResourceLocation::OnDisk(dir.path().join("nope"));
        assert!(matches!(list(&missing_dir).await, Err(ResourceError::NotFound)));
    }

    #[tokio::test]
    async fn test_list_bundled_directory() {
        let files = list(&ResourceLocation::parse("db/migration/tenant_one/"))
            .await
            .unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["0001_create_accounts.sql", "0002_create_settings.sql"]);

        // a sibling directory sharing the prefix must not leak in
        let none = list(&ResourceLocation::parse("db/migration/tenant_on"))
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_disk_directory_recursively() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("2_b.sql"), "select 2;").unwrap();
        std::fs::write(dir.path().join("nested/1_a.sql"), "select 1;").unwrap();

        let files = list(&ResourceLocation::OnDisk(dir.path().to_path_buf()))
            .await
            .unwrap();
        let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["2_b.sql", "nested/1_a.sql"]);
    }
}
