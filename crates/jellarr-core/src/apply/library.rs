//! Library virtual folders
//!
//! Folders are matched by name. Missing folders are created; an existing
//! folder whose location set differs is reported and left alone, since
//! moving a library's paths on a live server is not something to do
//! unattended.

use serde_json::{Value, json};

use crate::api::{AddVirtualFolderDto, LibraryOptions, MediaPathInfo, VirtualFolderInfo};
use crate::config::{LibraryConfig, VirtualFolderConfig};
use crate::diff::{DiffOptions, Operation, PathSegment, diff};

/// An existing folder whose paths do not match the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathMismatch {
    pub name: String,
    pub current: Vec<String>,
    pub desired: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryDiff {
    pub to_create: Vec<VirtualFolderConfig>,
    pub path_mismatches: Vec<PathMismatch>,
}

impl LibraryDiff {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.path_mismatches.is_empty()
    }
}

/// Compute the folders to create. `None` when nothing needs doing.
pub fn calculate_library_diff(
    current: &[VirtualFolderInfo],
    desired: &LibraryConfig,
) -> Option<LibraryDiff> {
    let folders = desired.virtual_folders.as_deref().filter(|f| !f.is_empty())?;

    let current_view = Value::Array(
        current
            .iter()
            .map(|folder| {
                json!({
                    "Name": folder.name.as_deref().unwrap_or_default(),
                    "Locations": folder.locations.clone().unwrap_or_default(),
                })
            })
            .collect(),
    );
    let desired_view = Value::Array(
        folders
            .iter()
            .map(|folder| json!({"Name": folder.name, "Locations": folder.paths()}))
            .collect(),
    );

    let options = DiffOptions::new()
        .with_identity_key("", "Name")
        .with_unordered("[].Locations");
    let changes = diff(&current_view, &desired_view, &options);

    let mut result = LibraryDiff::default();
    for change in changes {
        let Some(PathSegment::Id { value, .. }) = change.path.segments().first() else {
            continue;
        };
        let Some(name) = value.as_str() else {
            continue;
        };
        match change.op {
            Operation::Add => {
                if let Some(folder) = folders.iter().find(|f| f.name == name) {
                    result.to_create.push(folder.clone());
                }
            }
            Operation::Update => {
                let mismatch = PathMismatch {
                    name: name.to_string(),
                    current: string_list(change.old.as_ref()),
                    desired: string_list(change.new.as_ref()),
                };
                tracing::warn!(
                    "Virtual folder {} exists but locations differ; path updates are not supported",
                    mismatch.name
                );
                tracing::warn!("  Current: [{}]", mismatch.current.join(", "));
                tracing::warn!("  Desired: [{}]", mismatch.desired.join(", "));
                result.path_mismatches.push(mismatch);
            }
            // Folders on the server but not in the document are unmanaged.
            Operation::Remove => {}
        }
    }

    (!result.is_empty()).then_some(result)
}

/// Request body for creating `folder`.
pub fn add_virtual_folder_body(folder: &VirtualFolderConfig) -> AddVirtualFolderDto {
    AddVirtualFolderDto {
        library_options: LibraryOptions {
            path_infos: folder
                .paths()
                .into_iter()
                .map(|path| MediaPathInfo { path })
                .collect(),
        },
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}
