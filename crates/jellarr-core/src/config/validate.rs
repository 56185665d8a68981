//! Cross-field validation of a parsed desired-state document
//!
//! Structural checks (types, enums, unknown keys) happen during
//! deserialization. This pass covers the rules serde cannot express and
//! reports every failing field path at once.

use std::collections::HashSet;
use std::fmt;

use super::schema::{PluginConfig, RootConfig, SystemConfig, UserConfig, VirtualFolderConfig};

/// One failing rule, anchored at a document path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
#[error("invalid configuration:\n{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

fn format_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Default)]
struct Issues(Vec<ValidationIssue>);

impl Issues {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(ValidationIssue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a parsed configuration
pub fn validate_config(config: &RootConfig) -> Result<(), ValidationError> {
    let mut issues = Issues::default();

    if config.version <= 0 {
        issues.push("version", "Version must be a positive integer");
    }

    match url::Url::parse(&config.base_url) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        Ok(url) => issues.push(
            "base_url",
            format!("Base URL must use http or https, got '{}'", url.scheme()),
        ),
        Err(_) => issues.push("base_url", "Base URL must be a valid URL"),
    }

    if let Some(system) = &config.system {
        validate_system(system, &mut issues);
    }

    if let Some(folders) = config
        .library
        .as_ref()
        .and_then(|library| library.virtual_folders.as_ref())
    {
        for (idx, folder) in folders.iter().enumerate() {
            validate_virtual_folder(&format!("library.virtualFolders[{idx}]"), folder, &mut issues);
        }
        check_unique_names(
            "library.virtualFolders",
            "virtual folder",
            folders.iter().map(|f| f.name.as_str()),
            &mut issues,
        );
    }

    if let Some(users) = &config.users {
        for (idx, user) in users.iter().enumerate() {
            validate_user(&format!("users[{idx}]"), user, &mut issues);
        }
        check_unique_names("users", "user", users.iter().map(|u| u.name.as_str()), &mut issues);
    }

    if let Some(plugins) = &config.plugins {
        for (idx, plugin) in plugins.iter().enumerate() {
            validate_plugin(&format!("plugins[{idx}]"), plugin, &mut issues);
        }
        check_unique_names(
            "plugins",
            "plugin",
            plugins.iter().map(|p| p.name.as_str()),
            &mut issues,
        );
    }

    if issues.0.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { issues: issues.0 })
    }
}

fn validate_system(system: &SystemConfig, issues: &mut Issues) {
    let Some(repos) = &system.plugin_repositories else {
        return;
    };
    for (idx, repo) in repos.iter().enumerate() {
        let path = format!("system.pluginRepositories[{idx}]");
        if repo.name.trim().is_empty() {
            issues.push(format!("{path}.name"), "Plugin repository name cannot be empty");
        }
        if url::Url::parse(&repo.url).is_err() {
            issues.push(format!("{path}.url"), "Plugin repository URL must be a valid URL");
        }
    }
    check_unique_names(
        "system.pluginRepositories",
        "plugin repository",
        repos.iter().map(|r| r.name.as_str()),
        issues,
    );
}

/// Entries are matched on the server by name, so a repeated name would
/// shadow the earlier entry. Each repeat is reported at its own index.
fn check_unique_names<'a>(
    section: &str,
    what: &str,
    names: impl Iterator<Item = &'a str>,
    issues: &mut Issues,
) {
    let mut seen = HashSet::new();
    for (idx, name) in names.enumerate() {
        if name.trim().is_empty() {
            continue;
        }
        if !seen.insert(name) {
            issues.push(
                format!("{section}[{idx}].name"),
                format!("Duplicate {what} name '{name}'"),
            );
        }
    }
}

fn validate_virtual_folder(path: &str, folder: &VirtualFolderConfig, issues: &mut Issues) {
    if folder.name.trim().is_empty() {
        issues.push(format!("{path}.name"), "Virtual folder name cannot be empty");
    }
    let path_infos = &folder.library_options.path_infos;
    if path_infos.is_empty() {
        issues.push(
            format!("{path}.libraryOptions.pathInfos"),
            "At least one path is required",
        );
    }
    for (idx, info) in path_infos.iter().enumerate() {
        if info.path.trim().is_empty() {
            issues.push(
                format!("{path}.libraryOptions.pathInfos[{idx}].path"),
                "Path cannot be empty",
            );
        }
    }
}

fn validate_user(path: &str, user: &UserConfig, issues: &mut Issues) {
    if user.name.trim().is_empty() {
        issues.push(format!("{path}.name"), "User name is required");
    }
    let has_password = user
        .password
        .as_deref()
        .is_some_and(|p| !p.trim().is_empty());
    let has_password_file = user
        .password_file
        .as_ref()
        .is_some_and(|p| !p.as_os_str().to_string_lossy().trim().is_empty());
    if has_password == has_password_file {
        issues.push(path, "Must specify exactly one of 'password' or 'passwordFile'");
    }
    if let Some(attempts) = user
        .policy
        .as_ref()
        .and_then(|policy| policy.login_attempts_before_lockout)
        .filter(|attempts| *attempts < 1)
    {
        issues.push(
            format!("{path}.policy.loginAttemptsBeforeLockout"),
            format!("Must be >=1, got {attempts}"),
        );
    }
}

fn validate_plugin(path: &str, plugin: &PluginConfig, issues: &mut Issues) {
    if plugin.name.trim().is_empty() {
        issues.push(format!("{path}.name"), "Plugin name cannot be empty");
    }
}
