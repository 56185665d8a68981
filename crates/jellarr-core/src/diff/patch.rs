//! Apply a change list to a value tree
//!
//! Only the paths named by the patch are touched; everything else is
//! carried through from the base unchanged.

use serde_json::Value;

use super::{Change, JsonPath, Operation, PathSegment};

/// A patch that does not fit the tree it is applied to.
///
/// Patches are always derived from a diff against the same base, so any of
/// these indicates a bug rather than bad input.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    #[error("patch path does not exist: {path}")]
    MissingPath { path: String },

    #[error("patch path does not point into an object or array: {path}")]
    NotAContainer { path: String },

    #[error("{op} change at {path} carries no value")]
    MissingValue { op: String, path: String },

    #[error("cannot remove the root value")]
    RemoveRoot,
}

/// Apply `patch` to a copy of `base`.
///
/// Additions and updates are applied in patch order. Removals are applied
/// last and in reverse order so positional removals stay valid.
pub fn apply_patch(base: &Value, patch: &[Change]) -> Result<Value, PatchError> {
    let mut out = base.clone();

    for change in patch.iter().filter(|c| c.op != Operation::Remove) {
        apply_change(&mut out, change)?;
    }
    for change in patch.iter().rev().filter(|c| c.op == Operation::Remove) {
        apply_change(&mut out, change)?;
    }

    Ok(out)
}

fn apply_change(root: &mut Value, change: &Change) -> Result<(), PatchError> {
    let segments = change.path.segments();
    let Some((last, parents)) = segments.split_last() else {
        return match change.op {
            Operation::Remove => Err(PatchError::RemoveRoot),
            Operation::Add | Operation::Update => {
                *root = new_value(change)?;
                Ok(())
            }
        };
    };

    let parent = resolve_mut(root, parents, &change.path)?;

    match (change.op, parent) {
        (Operation::Add, Value::Object(map)) => {
            let PathSegment::Key(key) = last else {
                return Err(not_a_container(&change.path));
            };
            map.insert(key.clone(), new_value(change)?);
        }
        (Operation::Add, Value::Array(items)) => {
            let value = new_value(change)?;
            match last {
                PathSegment::Index(idx) => {
                    let idx = (*idx).min(items.len());
                    items.insert(idx, value);
                }
                PathSegment::Id { .. } => items.push(value),
                PathSegment::Key(_) => return Err(not_a_container(&change.path)),
            }
        }
        (Operation::Update, parent) => {
            let slot = child_mut(parent, last).ok_or_else(|| missing(&change.path))?;
            *slot = new_value(change)?;
        }
        (Operation::Remove, Value::Object(map)) => {
            let PathSegment::Key(key) = last else {
                return Err(not_a_container(&change.path));
            };
            if map.remove(key).is_none() {
                return Err(missing(&change.path));
            }
        }
        (Operation::Remove, Value::Array(items)) => {
            let idx = element_position(items, last).ok_or_else(|| missing(&change.path))?;
            items.remove(idx);
        }
        _ => return Err(not_a_container(&change.path)),
    }

    Ok(())
}

fn resolve_mut<'a>(
    root: &'a mut Value,
    segments: &[PathSegment],
    full_path: &JsonPath,
) -> Result<&'a mut Value, PatchError> {
    let mut current = root;
    for segment in segments {
        current = child_mut(current, segment).ok_or_else(|| missing(full_path))?;
    }
    Ok(current)
}

fn child_mut<'a>(value: &'a mut Value, segment: &PathSegment) -> Option<&'a mut Value> {
    match (value, segment) {
        (Value::Object(map), PathSegment::Key(key)) => map.get_mut(key),
        (Value::Array(items), segment) => {
            let idx = element_position(items, segment)?;
            items.get_mut(idx)
        }
        _ => None,
    }
}

fn element_position(items: &[Value], segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Index(idx) if *idx < items.len() => Some(*idx),
        PathSegment::Id { field, value } => items
            .iter()
            .position(|item| item.get(field.as_str()) == Some(value)),
        _ => None,
    }
}

fn new_value(change: &Change) -> Result<Value, PatchError> {
    change.new.clone().ok_or_else(|| PatchError::MissingValue {
        op: change.op.to_string(),
        path: change.path.to_string(),
    })
}

fn missing(path: &JsonPath) -> PatchError {
    PatchError::MissingPath {
        path: path.to_string(),
    }
}

fn not_a_container(path: &JsonPath) -> PatchError {
    PatchError::NotAContainer {
        path: path.to_string(),
    }
}
