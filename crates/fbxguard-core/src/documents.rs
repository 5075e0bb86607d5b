// ── Desired-config documents ──
//
// One YAML mapping per resource class, key → entry fields, exactly the
// shape the accessors return. Saved documents reload unchanged.

use std::path::Path;

use fbxguard_api::Entries;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::CoreError;
use crate::resource::ResourceKind;

/// Load the desired entries of `kind` from `path`.
///
/// A missing file is a [`CoreError::ConfigSource`]; an empty file is an
/// empty desired set.
pub fn load_document<T: DeserializeOwned>(
    kind: ResourceKind,
    path: &Path,
) -> Result<Entries<T>, CoreError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CoreError::ConfigSource {
                kind,
                path: path.display().to_string(),
            });
        }
        Err(e) => return Err(document_error(path, &e)),
    };
    if raw.trim().is_empty() {
        return Ok(Entries::new());
    }
    let entries: Option<Entries<T>> =
        serde_yaml::from_str(&raw).map_err(|e| document_error(path, &e))?;
    let entries = entries.unwrap_or_default();
    debug!(%kind, path = %path.display(), entries = entries.len(), "loaded document");
    Ok(entries)
}

/// Reject a document whose keys disagree with what their entries imply.
///
/// `derive` returns `None` for entries that carry no key of their own.
pub fn check_keys<T>(
    path: &Path,
    entries: &Entries<T>,
    derive: impl Fn(&T) -> Option<String>,
) -> Result<(), CoreError> {
    for (key, entry) in entries {
        if let Some(expected) = derive(entry) {
            if *key != expected {
                return Err(CoreError::Document {
                    path: path.display().to_string(),
                    reason: format!("entry '{key}' describes '{expected}'"),
                });
            }
        }
    }
    Ok(())
}

/// Write `entries` to `path` as YAML, replacing it atomically.
pub fn save_document<T: Serialize>(path: &Path, entries: &Entries<T>) -> Result<(), CoreError> {
    let yaml = serde_yaml::to_string(entries).map_err(|e| document_error(path, &e))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| document_error(path, &e))?;
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| document_error(path, &e))?;
    std::fs::rename(&tmp, path).map_err(|e| document_error(path, &e))?;
    debug!(path = %path.display(), entries = entries.len(), "saved document");
    Ok(())
}

fn document_error(path: &Path, reason: &dyn std::fmt::Display) -> CoreError {
    CoreError::Document {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
}
