//! Server configuration: metrics flag, plugin repositories, trickplay
//!
//! The three sub-scopes are diffed together and then split back apart by
//! top-level key, because each one needs a different write policy:
//!
//! - `EnableMetrics` is a plain overwrite.
//! - `PluginRepositories` is compared by repository name, but the server
//!   only accepts the whole list, so any difference replaces it entirely.
//! - `TrickplayOptions` fields are tri-state: set overwrites, `null` clears,
//!   absent leaves the server value alone.

use serde_json::{Map, Value, json};

use super::{ConfigUpdate, anchor_to, as_object, log_changes};
use crate::config::{PluginRepositoryConfig, SystemConfig, TrickplayOptionsConfig};
use crate::diff::{
    Change, DiffOptions, JsonPath, Operation, Patch, PatchError, apply_patch, atomize, diff,
    filter_key, filter_removals,
};
use crate::types::TriState;

const ENABLE_METRICS: &str = "EnableMetrics";
const PLUGIN_REPOSITORIES: &str = "PluginRepositories";
const TRICKPLAY_OPTIONS: &str = "TrickplayOptions";

pub fn calculate_system_diff(
    current: &Value,
    desired: &SystemConfig,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let base = as_object(current);

    // Comparison view: a missing metrics flag reads as false and repositories
    // are reduced to what the document can express. Never written back.
    let mut compare = base.clone();
    if desired.enable_metrics.is_some() {
        let metrics = base
            .get(ENABLE_METRICS)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        compare.insert(ENABLE_METRICS.to_string(), Value::Bool(metrics));
    }
    if desired.plugin_repositories.is_some() {
        compare.insert(
            PLUGIN_REPOSITORIES.to_string(),
            project_repositories(base.get(PLUGIN_REPOSITORIES)),
        );
    }

    let mut target = compare.clone();
    if let Some(metrics) = desired.enable_metrics {
        target.insert(ENABLE_METRICS.to_string(), Value::Bool(metrics));
    }
    if let Some(repos) = &desired.plugin_repositories {
        target.insert(PLUGIN_REPOSITORIES.to_string(), repositories_to_server(repos));
    }
    if let Some(trickplay) = &desired.trickplay_options {
        merge_trickplay(&mut target, trickplay);
    }

    let options = DiffOptions::new().with_identity_key(PLUGIN_REPOSITORIES, "Name");
    let changes = atomize(diff(
        &Value::Object(compare),
        &Value::Object(target.clone()),
        &options,
    ));

    let mut patch: Patch = filter_removals(&filter_key(&changes, ENABLE_METRICS));

    if !filter_key(&changes, PLUGIN_REPOSITORIES).is_empty() {
        let path = JsonPath::key(PLUGIN_REPOSITORIES);
        let new = target
            .get(PLUGIN_REPOSITORIES)
            .cloned()
            .unwrap_or_else(|| json!([]));
        patch.push(match base.get(PLUGIN_REPOSITORIES) {
            Some(old) => Change::update(path, old.clone(), new),
            None => Change::add(path, new),
        });
    }

    let trickplay = filter_key(&changes, TRICKPLAY_OPTIONS);
    if trickplay.iter().any(|c| c.op == Operation::Remove) {
        // A cleared field is written as the whole trickplay object minus that
        // key, so the patch itself stays free of removals.
        let path = JsonPath::key(TRICKPLAY_OPTIONS);
        let new = target.get(TRICKPLAY_OPTIONS).cloned().unwrap_or(Value::Null);
        patch.push(match base.get(TRICKPLAY_OPTIONS) {
            Some(old) => Change::update(path, old.clone(), new),
            None => Change::add(path, new),
        });
    } else {
        patch.extend(trickplay);
    }

    if patch.is_empty() {
        return Ok(None);
    }

    let patch: Patch = patch
        .into_iter()
        .map(|change| anchor_to(&base, change))
        .collect();
    log_changes(&patch);
    let updated = apply_patch(&Value::Object(base), &patch)?;

    Ok(Some(ConfigUpdate { patch, updated }))
}

/// Server repositories reduced to the fields the document can express.
fn project_repositories(current: Option<&Value>) -> Value {
    let Some(Value::Array(repos)) = current else {
        return json!([]);
    };
    let projected = repos
        .iter()
        .map(|repo| {
            json!({
                "Name": repo.get("Name").and_then(Value::as_str).unwrap_or(""),
                "Url": repo.get("Url").and_then(Value::as_str).unwrap_or(""),
                "Enabled": repo.get("Enabled").and_then(Value::as_bool).unwrap_or(false),
            })
        })
        .collect();
    Value::Array(projected)
}

fn repositories_to_server(repos: &[PluginRepositoryConfig]) -> Value {
    Value::Array(
        repos
            .iter()
            .map(|repo| {
                json!({
                    "Name": repo.name,
                    "Url": repo.url,
                    "Enabled": repo.enabled,
                })
            })
            .collect(),
    )
}

fn merge_trickplay(target: &mut Map<String, Value>, desired: &TrickplayOptionsConfig) {
    let fields = [
        ("EnableHwAcceleration", &desired.enable_hw_acceleration),
        ("EnableHwEncoding", &desired.enable_hw_encoding),
    ];

    if let Some(Value::Object(current)) = target.get_mut(TRICKPLAY_OPTIONS) {
        for (key, state) in fields {
            match state {
                TriState::Set(value) => {
                    current.insert(key.to_string(), Value::Bool(*value));
                }
                TriState::Clear => {
                    if current.get(key).is_some_and(|v| !v.is_null()) {
                        current.remove(key);
                    }
                }
                TriState::Unset => {}
            }
        }
        return;
    }

    // Nothing on the server to clear; only explicit values create the object.
    let set: Map<String, Value> = fields
        .into_iter()
        .filter_map(|(key, state)| match state {
            TriState::Set(value) => Some((key.to_string(), Value::Bool(*value))),
            _ => None,
        })
        .collect();
    if !set.is_empty() {
        target.insert(TRICKPLAY_OPTIONS.to_string(), Value::Object(set));
    }
}
