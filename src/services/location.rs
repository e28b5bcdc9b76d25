use crate::models::location::{ResolvedLocation, ResourceLocation};
use crate::models::tenant::TenantDescriptor;

pub const DEFAULT_SCRIPT_ROOT: &str = "db/migration/";

/// A non-empty override wins verbatim; otherwise the tenant id is appended to
/// `default_root` as a path segment. Existence is not checked here.
pub fn resolve_script_directory(
    tenant_id: &str,
    script_override: Option<&str>,
    default_root: &str,
) -> String {
    if let Some(path) = script_override.filter(|p| !p.is_empty()) {
        return path.to_string();
    }

    if default_root.is_empty() || default_root.ends_with('/') {
        format!("{default_root}{tenant_id}")
    } else {
        format!("{default_root}/{tenant_id}")
    }
}

/// Placeholders are opt-in: without an override there is no file to load.
pub fn resolve_placeholder_path(
    tenant_id: &str,
    placeholder_override: Option<&str>,
) -> Option<ResourceLocation> {
    let raw = placeholder_override.filter(|p| !p.is_empty())?;
    let location = ResourceLocation::parse(raw);
    tracing::debug!("Placeholder file for {tenant_id} resolved to {location}");
    Some(location)
}

pub fn resolve(tenant: &TenantDescriptor, default_root: &str) -> ResolvedLocation {
    ResolvedLocation {
        script_directory: resolve_script_directory(
            &tenant.tenant_id,
            tenant.script_path.as_deref(),
            default_root,
        ),
        placeholder_file: resolve_placeholder_path(
            &tenant.tenant_id,
            tenant.placeholder_path.as_deref(),
        ),
    }
}
