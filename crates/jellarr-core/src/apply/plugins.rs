//! Plugins: install anything not already present, then merge settings
//!
//! Plugin settings are opaque to this tool. The desired settings are
//! diffed field by field against what the server stores, removals are
//! dropped, and the surviving changes are folded back into the full object
//! before it is written.

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::info;

use super::{ConfigUpdate, as_object, log_changes};
use crate::api::PluginInfo;
use crate::config::PluginConfig;
use crate::diff::{DiffOptions, PatchError, apply_patch, atomize, diff, filter_removals};

/// Settings the server currently stores for one installed plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginSettings {
    pub id: String,
    pub name: String,
    pub configuration: Value,
}

/// A settings write for one installed plugin
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfigurationUpdate {
    pub plugin_id: String,
    pub name: String,
    pub update: ConfigUpdate,
}

/// Desired plugins whose exact name is not installed, in document order.
pub fn calculate_plugins_to_install(
    installed: &[PluginInfo],
    desired: &[PluginConfig],
) -> Option<Vec<PluginConfig>> {
    let installed: HashSet<&str> = installed
        .iter()
        .filter_map(|plugin| plugin.name.as_deref())
        .collect();

    let missing: Vec<PluginConfig> = desired
        .iter()
        .filter(|plugin| !installed.contains(plugin.name.as_str()))
        .cloned()
        .collect();

    (!missing.is_empty()).then_some(missing)
}

/// Merge `desired` into one plugin's stored settings.
///
/// Nested objects are merged per field. Arrays compare by position and are
/// never shortened.
pub fn calculate_plugin_configuration_diff(
    current: &Value,
    desired: &Map<String, Value>,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let base = Value::Object(as_object(current));
    let target = Value::Object(desired.clone());

    let patch = filter_removals(&atomize(diff(&base, &target, &DiffOptions::new())));
    if patch.is_empty() {
        return Ok(None);
    }

    log_changes(&patch);
    let updated = apply_patch(&base, &patch)?;

    Ok(Some(ConfigUpdate { patch, updated }))
}

/// Settings writes for every desired plugin that carries a `configuration`
/// and is installed. Plugins not (yet) installed are skipped.
pub fn calculate_plugin_configurations_diff(
    current: &[PluginSettings],
    desired: &[PluginConfig],
) -> Result<Option<Vec<PluginConfigurationUpdate>>, PatchError> {
    let mut out = Vec::new();
    for plugin in desired {
        let Some(configuration) = &plugin.configuration else {
            continue;
        };
        let Some(settings) = current.iter().find(|s| s.name == plugin.name) else {
            continue;
        };
        let Some(update) =
            calculate_plugin_configuration_diff(&settings.configuration, configuration)?
        else {
            continue;
        };
        info!("Updating plugin configuration: {}", plugin.name);
        out.push(PluginConfigurationUpdate {
            plugin_id: settings.id.clone(),
            name: plugin.name.clone(),
            update,
        });
    }
    Ok((!out.is_empty()).then_some(out))
}
