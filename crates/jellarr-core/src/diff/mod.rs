//! Structural diffing of JSON value trees
//!
//! Compares a current tree against a desired tree and produces an ordered,
//! flat list of [`Change`]s. Arrays can be matched by a logical identity key
//! instead of by position, and scalar arrays can be compared as multisets.
//!
//! Traversal order is fixed: object keys in map order, outer before inner,
//! array elements in source order (current elements first, then unmatched
//! desired elements).

pub mod filter;
pub mod patch;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde_json::Value;

pub use filter::{atomize, filter_key, filter_removals};
pub use patch::{PatchError, apply_patch};

/// An ordered sequence of changes scoped to one configuration domain.
pub type Patch = Vec<Change>;

/// Kind of a detected difference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Update,
    Remove,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Add => write!(f, "add"),
            Operation::Update => write!(f, "update"),
            Operation::Remove => write!(f, "remove"),
        }
    }
}

/// One step of a path into a value tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Object field
    Key(String),
    /// Positional array element
    Index(usize),
    /// Array element whose `field` equals `value`
    Id { field: String, value: Value },
}

/// Location of a change inside a value tree
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonPath(Vec<PathSegment>);

impl JsonPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(name: impl Into<String>) -> Self {
        Self(vec![PathSegment::Key(name.into())])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    pub fn join_key(&self, name: &str) -> Self {
        self.child(PathSegment::Key(name.to_string()))
    }

    /// Prefix every segment of `self` with `prefix`.
    pub fn prefixed(&self, prefix: &JsonPath) -> Self {
        let mut segments = prefix.0.clone();
        segments.extend(self.0.iter().cloned());
        Self(segments)
    }

    /// First object key on the path, if the path starts with one.
    pub fn first_key(&self) -> Option<&str> {
        match self.0.first() {
            Some(PathSegment::Key(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Shape of the path with array positions erased.
    ///
    /// `PluginRepositories`, `[]`, `[].Locations`, `Users[].Policy`.
    pub fn pattern(&self) -> String {
        let mut out = String::new();
        for segment in &self.0 {
            match segment {
                PathSegment::Key(name) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(name);
                }
                PathSegment::Index(_) | PathSegment::Id { .. } => out.push_str("[]"),
            }
        }
        out
    }
}

impl fmt::Display for JsonPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "$");
        }
        for (idx, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(name) => {
                    if idx > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Id { field, value } => match value {
                    Value::String(s) => write!(f, "[{field}={s}]")?,
                    other => write!(f, "[{field}={other}]")?,
                },
            }
        }
        Ok(())
    }
}

/// A single detected difference between two trees
#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub path: JsonPath,
    pub op: Operation,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl Change {
    pub fn add(path: JsonPath, new: Value) -> Self {
        Self {
            path,
            op: Operation::Add,
            old: None,
            new: Some(new),
        }
    }

    pub fn update(path: JsonPath, old: Value, new: Value) -> Self {
        Self {
            path,
            op: Operation::Update,
            old: Some(old),
            new: Some(new),
        }
    }

    pub fn remove(path: JsonPath, old: Value) -> Self {
        Self {
            path,
            op: Operation::Remove,
            old: Some(old),
            new: None,
        }
    }

    /// Top-level field this change belongs to.
    pub fn key(&self) -> Option<&str> {
        self.path.first_key()
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} changed: {} → {}",
            self.path,
            render(self.old.as_ref()),
            render(self.new.as_ref())
        )
    }
}

/// Compact rendering used in change logs.
pub fn render(value: Option<&Value>) -> String {
    match value {
        None => "<absent>".to_string(),
        Some(Value::String(s)) => format!("\"{s}\""),
        Some(other) => other.to_string(),
    }
}

/// Tuning for [`diff`]
///
/// Keys of both collections are path patterns as produced by
/// [`JsonPath::pattern`] for the array itself.
#[derive(Debug, Clone, Default)]
pub struct DiffOptions {
    identity_keys: BTreeMap<String, String>,
    unordered: BTreeSet<String>,
}

impl DiffOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Match elements of the array at `pattern` by the value of `field`.
    pub fn with_identity_key(mut self, pattern: impl Into<String>, field: impl Into<String>) -> Self {
        self.identity_keys.insert(pattern.into(), field.into());
        self
    }

    /// Compare the array at `pattern` as a multiset and replace it wholesale
    /// when the multisets differ.
    pub fn with_unordered(mut self, pattern: impl Into<String>) -> Self {
        self.unordered.insert(pattern.into());
        self
    }

    fn identity_key(&self, path: &JsonPath) -> Option<&str> {
        self.identity_keys.get(&path.pattern()).map(String::as_str)
    }

    fn is_unordered(&self, path: &JsonPath) -> bool {
        self.unordered.contains(&path.pattern())
    }
}

/// Compute the changes that turn `current` into `desired`.
pub fn diff(current: &Value, desired: &Value, options: &DiffOptions) -> Patch {
    let mut changes = Vec::new();
    diff_at(&JsonPath::root(), current, desired, options, &mut changes);
    changes
}

fn diff_at(
    path: &JsonPath,
    current: &Value,
    desired: &Value,
    options: &DiffOptions,
    out: &mut Vec<Change>,
) {
    match (current, desired) {
        (Value::Object(cur), Value::Object(des)) => {
            for (key, cur_value) in cur {
                let child = path.join_key(key);
                match des.get(key) {
                    Some(des_value) => diff_at(&child, cur_value, des_value, options, out),
                    None => out.push(Change::remove(child, cur_value.clone())),
                }
            }
            for (key, des_value) in des {
                if !cur.contains_key(key) {
                    out.push(Change::add(path.join_key(key), des_value.clone()));
                }
            }
        }
        (Value::Array(cur), Value::Array(des)) => {
            if let Some(field) = options.identity_key(path) {
                diff_keyed(path, field, cur, des, options, out);
            } else if options.is_unordered(path) {
                if !same_multiset(cur, des) {
                    out.push(Change::update(path.clone(), current.clone(), desired.clone()));
                }
            } else {
                diff_positional(path, cur, des, out);
            }
        }
        _ => {
            if current != desired {
                out.push(Change::update(path.clone(), current.clone(), desired.clone()));
            }
        }
    }
}

fn diff_positional(path: &JsonPath, cur: &[Value], des: &[Value], out: &mut Vec<Change>) {
    for idx in 0..cur.len().max(des.len()) {
        let child = path.child(PathSegment::Index(idx));
        match (cur.get(idx), des.get(idx)) {
            (Some(c), Some(d)) if c != d => {
                out.push(Change::update(child, c.clone(), d.clone()));
            }
            (Some(c), None) => out.push(Change::remove(child, c.clone())),
            (None, Some(d)) => out.push(Change::add(child, d.clone())),
            _ => {}
        }
    }
}

// Duplicate identity values pair up in source order.
fn diff_keyed(
    path: &JsonPath,
    field: &str,
    cur: &[Value],
    des: &[Value],
    options: &DiffOptions,
    out: &mut Vec<Change>,
) {
    let mut paired = vec![false; des.len()];

    for (cur_idx, cur_item) in cur.iter().enumerate() {
        let id = cur_item.get(field);
        let matched = id.and_then(|id| {
            des.iter()
                .enumerate()
                .find(|(idx, d)| !paired[*idx] && d.get(field) == Some(id))
                .map(|(idx, _)| idx)
        });

        match (id, matched) {
            (Some(id), Some(idx)) => {
                paired[idx] = true;
                let child = path.child(PathSegment::Id {
                    field: field.to_string(),
                    value: id.clone(),
                });
                diff_at(&child, cur_item, &des[idx], options, out);
            }
            (Some(id), None) => {
                let child = path.child(PathSegment::Id {
                    field: field.to_string(),
                    value: id.clone(),
                });
                out.push(Change::remove(child, cur_item.clone()));
            }
            (None, _) => {
                // Unidentifiable elements can only be addressed positionally.
                out.push(Change::remove(
                    path.child(PathSegment::Index(cur_idx)),
                    cur_item.clone(),
                ));
            }
        }
    }

    for (idx, des_item) in des.iter().enumerate() {
        if paired[idx] {
            continue;
        }
        let segment = match des_item.get(field) {
            Some(id) => PathSegment::Id {
                field: field.to_string(),
                value: id.clone(),
            },
            None => PathSegment::Index(cur.len()),
        };
        out.push(Change::add(path.child(segment), des_item.clone()));
    }
}

fn same_multiset(a: &[Value], b: &[Value]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut used = vec![false; b.len()];
    a.iter().all(|item| {
        match b
            .iter()
            .enumerate()
            .position(|(idx, other)| !used[idx] && other == item)
        {
            Some(idx) => {
                used[idx] = true;
                true
            }
            None => false,
        }
    })
}
