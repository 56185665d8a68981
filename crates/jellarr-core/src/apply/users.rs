//! Users: create missing accounts, then enforce listed policy fields
//!
//! Accounts are never renamed, deleted or given a new password. A user's
//! `policy` section only overwrites the fields it lists.

use anyhow::Context;
use serde_json::{Value, json};
use tracing::{info, warn};

use super::{ConfigUpdate, ManagedField, merge_fields};
use crate::api::{CreateUserByName, UserDto};
use crate::config::{UserConfig, UserPolicyConfig};
use crate::diff::{DiffOptions, Operation, PatchError, diff};

/// A user to create, with the password already resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub password: String,
}

impl From<NewUser> for CreateUserByName {
    fn from(user: NewUser) -> Self {
        CreateUserByName {
            name: user.name,
            password: user.password,
        }
    }
}

/// Desired users with no same-named account on the server, in document order.
///
/// Fails only if a `passwordFile` cannot be read.
pub fn calculate_new_users(
    current: &[UserDto],
    desired: &[UserConfig],
) -> anyhow::Result<Option<Vec<NewUser>>> {
    let current_view = names(current.iter().map(|u| u.name.as_deref().unwrap_or_default()));
    let desired_view = names(desired.iter().map(|u| u.name.as_str()));

    let changes = diff(
        &current_view,
        &desired_view,
        &DiffOptions::new().with_identity_key("", "Name"),
    );

    let mut out = Vec::new();
    for change in changes.iter().filter(|c| c.op == Operation::Add) {
        let Some(name) = change
            .new
            .as_ref()
            .and_then(|v| v.get("Name"))
            .and_then(Value::as_str)
        else {
            continue;
        };
        let Some(user) = desired.iter().find(|u| u.name == name) else {
            continue;
        };
        out.push(NewUser {
            name: user.name.clone(),
            password: resolve_password(user)?,
        });
    }

    Ok((!out.is_empty()).then_some(out))
}

/// A policy write for an existing account
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyUpdate {
    pub user_id: String,
    pub name: String,
    pub update: ConfigUpdate,
}

/// Merge the listed policy fields into the server's policy object.
pub fn calculate_user_policy_diff(
    current: &Value,
    desired: &UserPolicyConfig,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let mut fields = Vec::new();
    if let Some(is_administrator) = desired.is_administrator {
        fields.push(ManagedField::new("IsAdministrator", is_administrator, false));
    }
    if let Some(attempts) = desired.login_attempts_before_lockout {
        fields.push(ManagedField::new("LoginAttemptsBeforeLockout", attempts, Value::Null));
    }
    merge_fields(current, &fields, &DiffOptions::new())
}

/// Policy writes for desired users that carry a `policy` and already exist.
pub fn calculate_user_policies_diff(
    current: &[UserDto],
    desired: &[UserConfig],
) -> Result<Option<Vec<PolicyUpdate>>, PatchError> {
    let mut out = Vec::new();
    for user in desired {
        let Some(policy) = &user.policy else {
            continue;
        };
        let Some(existing) = current
            .iter()
            .find(|u| u.name.as_deref() == Some(user.name.as_str()))
        else {
            continue;
        };
        let (Some(user_id), Some(current_policy)) = (&existing.id, &existing.policy) else {
            warn!("User '{}' has no readable policy, skipping policy update", user.name);
            continue;
        };
        if let Some(update) = calculate_user_policy_diff(current_policy, policy)? {
            info!("Updating user policy: {}", user.name);
            out.push(PolicyUpdate {
                user_id: user_id.clone(),
                name: user.name.clone(),
                update,
            });
        }
    }
    Ok((!out.is_empty()).then_some(out))
}

/// Inline password first, then the trimmed contents of `passwordFile`.
pub fn resolve_password(user: &UserConfig) -> anyhow::Result<String> {
    if let Some(password) = &user.password {
        return Ok(password.clone());
    }
    match &user.password_file {
        Some(path) => {
            let content = std::fs::read_to_string(path).with_context(|| {
                format!(
                    "Failed to read password file for user '{}': {}",
                    user.name,
                    path.display()
                )
            })?;
            Ok(content.trim().to_string())
        }
        None => Ok(String::new()),
    }
}

fn names<'a>(names: impl Iterator<Item = &'a str>) -> Value {
    Value::Array(names.map(|name| json!({"Name": name})).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn server_user(name: &str) -> UserDto {
        UserDto {
            name: Some(name.to_string()),
            id: Some(format!("id-{name}")),
            policy: Some(json!({
                "IsAdministrator": false,
                "LoginAttemptsBeforeLockout": -1,
                "EnableAllFolders": true
            })),
        }
    }

    fn user(name: &str, password: &str) -> UserConfig {
        UserConfig {
            name: name.to_string(),
            password: Some(password.to_string()),
            password_file: None,
            policy: None,
        }
    }

    fn with_policy(mut user: UserConfig, admin: Option<bool>, attempts: Option<i64>) -> UserConfig {
        user.policy = Some(UserPolicyConfig {
            is_administrator: admin,
            login_attempts_before_lockout: attempts,
        });
        user
    }

    #[test]
    fn test_only_missing_users_are_created() {
        let current = vec![server_user("admin"), server_user("alice")];
        let desired = vec![user("alice", "a"), user("bob", "b")];

        let created = calculate_new_users(&current, &desired).unwrap().unwrap();

        assert_eq!(
            created,
            vec![NewUser {
                name: "bob".to_string(),
                password: "b".to_string()
            }]
        );
    }

    #[test]
    fn test_all_present_is_noop() {
        let current = vec![server_user("alice")];
        assert!(
            calculate_new_users(&current, &[user("alice", "x")])
                .unwrap()
                .is_none()
        );
        assert!(calculate_new_users(&current, &[]).unwrap().is_none());
    }

    #[test]
    fn test_name_match_is_case_sensitive() {
        let current = vec![server_user("Alice")];
        let created = calculate_new_users(&current, &[user("alice", "x")])
            .unwrap()
            .unwrap();
        assert_eq!(created[0].name, "alice");
    }

    #[test]
    fn test_password_file_is_trimmed() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  s3cret  ").unwrap();
        let desired = UserConfig {
            name: "carol".to_string(),
            password: None,
            password_file: Some(file.path().to_path_buf()),
            policy: None,
        };

        let created = calculate_new_users(&[], &[desired]).unwrap().unwrap();

        assert_eq!(created[0].password, "s3cret");
    }

    #[test]
    fn test_inline_password_wins() {
        let desired = UserConfig {
            name: "dave".to_string(),
            password: Some("inline".to_string()),
            password_file: Some("/nonexistent/secret".into()),
            policy: None,
        };
        assert_eq!(resolve_password(&desired).unwrap(), "inline");
    }

    #[test]
    fn test_unreadable_password_file_fails() {
        let desired = UserConfig {
            name: "erin".to_string(),
            password: None,
            password_file: Some("/nonexistent/secret".into()),
            policy: None,
        };
        let err = calculate_new_users(&[], &[desired]).unwrap_err();
        assert!(err.to_string().contains("erin"));
    }

    #[test]
    fn test_policy_promotes_to_administrator() {
        let current = vec![server_user("alice")];
        let desired = vec![with_policy(user("alice", "a"), Some(true), None)];

        let updates = calculate_user_policies_diff(&current, &desired)
            .unwrap()
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].user_id, "id-alice");
        assert_eq!(
            updates[0].update.updated,
            json!({
                "IsAdministrator": true,
                "LoginAttemptsBeforeLockout": -1,
                "EnableAllFolders": true
            })
        );
    }

    #[test]
    fn test_policy_matching_server_is_noop() {
        let current = vec![server_user("alice")];
        let desired = vec![with_policy(user("alice", "a"), Some(false), Some(-1))];
        assert!(
            calculate_user_policies_diff(&current, &desired)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_policy_only_touches_listed_fields() {
        let current = json!({"IsAdministrator": true, "EnableAllFolders": false});
        let desired = UserPolicyConfig {
            is_administrator: None,
            login_attempts_before_lockout: Some(5),
        };

        let update = calculate_user_policy_diff(&current, &desired).unwrap().unwrap();

        assert_eq!(update.patch.len(), 1);
        assert_eq!(update.patch[0].op, Operation::Add);
        assert_eq!(
            update.updated,
            json!({"IsAdministrator": true, "EnableAllFolders": false, "LoginAttemptsBeforeLockout": 5})
        );
    }

    #[test]
    fn test_policy_skips_missing_and_unidentified_users() {
        let mut anonymous = server_user("bob");
        anonymous.id = None;
        let current = vec![anonymous];
        let desired = vec![
            with_policy(user("bob", "b"), Some(true), None),
            with_policy(user("carol", "c"), Some(true), None),
        ];
        assert!(
            calculate_user_policies_diff(&current, &desired)
                .unwrap()
                .is_none()
        );
    }
}
