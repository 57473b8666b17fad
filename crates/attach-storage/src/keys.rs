//! Shared key generation for storage backends.
//!
//! Key format: `{prefix}/{usage_id}` for a single upload and
//! `{prefix}/{usage_id}/{n}` for the n-th file of a multi-file upload. The
//! prefix is optional. Destinations come from [`attach_core::naming::assign`].

/// Key of the object (or object group) owned by a control.
pub fn control_key(prefix: Option<&str>, usage_id: &str) -> String {
    match prefix.map(|p| p.trim_matches('/')).filter(|p| !p.is_empty()) {
        Some(prefix) => format!("{}/{}", prefix, usage_id),
        None => usage_id.to_string(),
    }
}

/// Generate the storage key for one destination of a batch.
///
/// The single-file destination equals the usage identifier and maps to the
/// control key itself; numbered destinations are grouped under it.
pub fn generate_storage_key(prefix: Option<&str>, usage_id: &str, destination: &str) -> String {
    let base = control_key(prefix, usage_id);
    if destination == usage_id {
        base
    } else {
        format!("{}/{}", base, destination)
    }
}

/// Key of the sidecar object holding persisted descriptions.
pub fn descriptions_key(prefix: Option<&str>, usage_id: &str) -> String {
    format!("{}.descriptions.json", control_key(prefix, usage_id))
}
