//! Per-domain diff functions
//!
//! Each domain turns `(current, desired)` into either nothing to do or the
//! exact payload to send back to the server. Full-object domains (system,
//! encoding, branding) return a [`ConfigUpdate`]; create-only domains
//! (library, users, plugins) return the list of items to create. Users and
//! plugins additionally return per-item [`ConfigUpdate`]s for policies and
//! plugin settings.
//!
//! These functions never talk to the server. The orchestrator fetches,
//! calls them, and writes.

pub mod branding;
pub mod encoding;
pub mod library;
pub mod plugins;
pub mod startup;
pub mod system;
pub mod users;

use serde_json::{Map, Value};

use crate::diff::{
    Change, DiffOptions, Operation, Patch, PatchError, PathSegment, apply_patch, diff,
    filter_removals,
};

pub use branding::calculate_branding_diff;
pub use encoding::calculate_encoding_diff;
pub use library::{LibraryDiff, PathMismatch, calculate_library_diff};
pub use plugins::{
    PluginConfigurationUpdate, PluginSettings, calculate_plugin_configurations_diff,
    calculate_plugins_to_install,
};
pub use startup::should_complete_startup_wizard;
pub use system::calculate_system_diff;
pub use users::{NewUser, PolicyUpdate, calculate_new_users, calculate_user_policies_diff};

/// Merged server object for a full-object write, plus the patch that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigUpdate {
    pub patch: Patch,
    pub updated: Value,
}

/// A managed top-level field of a full-object domain.
#[derive(Debug, Clone)]
pub(crate) struct ManagedField {
    pub key: &'static str,
    pub value: Value,
    /// What an absent or `null` current value compares as.
    pub default: Value,
}

impl ManagedField {
    pub fn new(key: &'static str, value: impl Into<Value>, default: impl Into<Value>) -> Self {
        Self {
            key,
            value: value.into(),
            default: default.into(),
        }
    }
}

/// Overwrite `fields` on `current`, touching nothing else.
///
/// Returns `None` when every field already matches.
pub(crate) fn merge_fields(
    current: &Value,
    fields: &[ManagedField],
    options: &DiffOptions,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let base = as_object(current);

    let mut view = base.clone();
    for field in fields {
        if view.get(field.key).is_none_or(Value::is_null) {
            view.insert(field.key.to_string(), field.default.clone());
        }
    }

    let mut target = view.clone();
    for field in fields {
        target.insert(field.key.to_string(), field.value.clone());
    }

    let patch = filter_removals(&diff(&Value::Object(view), &Value::Object(target), options));
    if patch.is_empty() {
        return Ok(None);
    }

    log_changes(&patch);

    // The patch was computed against the defaulted view; fields the server
    // did not send at all must be added rather than updated.
    let patch: Patch = patch
        .into_iter()
        .map(|change| anchor_to(&base, change))
        .collect();
    let updated = apply_patch(&Value::Object(base), &patch)?;

    Ok(Some(ConfigUpdate { patch, updated }))
}

/// Turn an update of a top-level key missing from `base` into an add.
pub(crate) fn anchor_to(base: &Map<String, Value>, mut change: Change) -> Change {
    let absent = match change.path.segments() {
        [PathSegment::Key(key)] => !base.contains_key(key),
        _ => false,
    };
    if absent && change.op == Operation::Update {
        change.op = Operation::Add;
        change.old = None;
    }
    change
}

pub(crate) fn as_object(value: &Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    }
}

pub(crate) fn log_changes(patch: &[Change]) {
    for change in patch {
        tracing::info!("{}", change);
    }
}
