use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Marker selecting OS filesystem resolution instead of the bundled resource set.
pub const FILESYSTEM_PREFIX: &str = "filesystem:";

/// Explicit marker for the bundled resource set, accepted on script locations.
pub const CLASSPATH_PREFIX: &str = "classpath:";

/// Key/value substitutions for one tenant's scripts.
pub type PlaceholderMap = BTreeMap<String, String>;

/// Where a script directory or placeholder file is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceLocation {
    /// Embedded in the binary under `resources/`.
    Bundled(String),
    OnDisk(PathBuf),
}

impl ResourceLocation {
    /// `filesystem:<path>` selects the disk with the marker stripped; anything
    /// else is a bundled resource path, kept as is.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(FILESYSTEM_PREFIX) {
            Some(path) => ResourceLocation::OnDisk(PathBuf::from(path)),
            None => ResourceLocation::Bundled(raw.to_string()),
        }
    }

    /// Like [`ResourceLocation::parse`], but a leading `classpath:` also
    /// selects the bundled set. Used for script directories, which are commonly
    /// written with an explicit scheme.
    pub fn parse_script_location(raw: &str) -> Self {
        match raw.strip_prefix(CLASSPATH_PREFIX) {
            Some(path) => ResourceLocation::Bundled(path.to_string()),
            None => Self::parse(raw),
        }
    }

    pub fn is_on_disk(&self) -> bool {
        matches!(self, ResourceLocation::OnDisk(_))
    }
}

impl fmt::Display for ResourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceLocation::Bundled(path) => write!(f, "bundled:{path}"),
            ResourceLocation::OnDisk(path) => write!(f, "{FILESYSTEM_PREFIX}{}", path.display()),
        }
    }
}

/// Per-tenant paths, computed fresh for every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLocation {
    pub script_directory: String,
    pub placeholder_file: Option<ResourceLocation>,
}
