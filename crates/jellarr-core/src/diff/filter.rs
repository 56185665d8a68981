//! Change list filters
//!
//! Plain functions over an ordered change list; each returns a new list and
//! keeps the relative order of what it retains.

use serde_json::Value;

use super::{Change, DiffOptions, Operation, diff};

/// Drop every removal. Used by domains that only add or overwrite fields.
pub fn filter_removals(changes: &[Change]) -> Vec<Change> {
    changes
        .iter()
        .filter(|c| c.op != Operation::Remove)
        .cloned()
        .collect()
}

/// Keep only changes under the top-level field `key`.
pub fn filter_key(changes: &[Change], key: &str) -> Vec<Change> {
    changes
        .iter()
        .filter(|c| c.key() == Some(key))
        .cloned()
        .collect()
}

/// Expand whole-object updates into per-field changes.
///
/// An update whose old and new values are both objects is replaced by the
/// field-level changes between them, so a later filter can drop individual
/// fields without losing their siblings.
pub fn atomize(changes: Vec<Change>) -> Vec<Change> {
    let mut out = Vec::with_capacity(changes.len());
    for change in changes {
        if let (Operation::Update, Some(old @ Value::Object(_)), Some(new @ Value::Object(_))) =
            (change.op, &change.old, &change.new)
        {
            let nested = diff(old, new, &DiffOptions::new());
            out.extend(nested.into_iter().map(|c| Change {
                path: c.path.prefixed(&change.path),
                ..c
            }));
            continue;
        }
        out.push(change);
    }
    out
}
