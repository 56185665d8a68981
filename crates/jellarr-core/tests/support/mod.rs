//! In-memory server for driving reconciliation without a network.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{Value, json};

use jellarr_core::api::{
    AddVirtualFolderDto, ApiError, ApiResult, CreateUserByName, JellyfinApi, PluginInfo, UserDto,
    VirtualFolderInfo,
};
use jellarr_core::config::CollectionType;

/// A write the fake received, in call order.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    System(Value),
    Encoding(Value),
    VirtualFolder {
        name: String,
        collection_type: String,
        paths: Vec<String>,
    },
    Branding(Value),
    User { name: String, password: String },
    Policy { user_id: String, body: Value },
    Package(String),
    PluginConfiguration { plugin_id: String, body: Value },
    CompleteStartup,
}

#[derive(Debug, Default)]
pub struct ServerState {
    pub system: Value,
    pub encoding: Value,
    pub branding: Value,
    pub folders: Vec<VirtualFolderInfo>,
    pub users: Vec<UserDto>,
    pub plugins: Vec<PluginInfo>,
    /// Stored plugin settings by plugin id
    pub plugin_configs: BTreeMap<String, Value>,
    pub reads: Vec<&'static str>,
    pub writes: Vec<Write>,
    /// Endpoint that answers 500
    pub failing: Option<&'static str>,
}

#[derive(Debug, Default)]
pub struct FakeApi {
    state: Mutex<ServerState>,
}

impl FakeApi {
    /// A freshly installed server with a handful of realistic defaults.
    pub fn new() -> Self {
        let fake = Self::default();
        {
            let mut state = fake.state();
            state.system = json!({
                "ServerName": "media",
                "EnableMetrics": false,
                "PluginRepositories": [
                    {"Name": "Jellyfin Stable", "Url": "https://repo.jellyfin.org/releases/plugin/manifest-stable.json", "Enabled": true}
                ],
                "TrickplayOptions": {
                    "EnableHwAcceleration": true,
                    "EnableHwEncoding": true,
                    "Interval": 10000
                }
            });
            state.encoding = json!({
                "EncodingThreadCount": -1,
                "EnableHardwareEncoding": false,
                "HardwareAccelerationType": "none",
                "HardwareDecodingCodecs": ["h264", "vc1"]
            });
            state.branding = json!({
                "LoginDisclaimer": null,
                "CustomCss": null,
                "SplashscreenEnabled": false
            });
            state.users = vec![user("admin")];
        }
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, ServerState> {
        self.state.lock().unwrap()
    }

    pub fn fail(&self, endpoint: &'static str) {
        self.state().failing = Some(endpoint);
    }

    pub fn writes(&self) -> Vec<Write> {
        self.state().writes.clone()
    }

    pub fn reads(&self) -> Vec<&'static str> {
        self.state().reads.clone()
    }

    pub fn clear_log(&self) {
        let mut state = self.state();
        state.reads.clear();
        state.writes.clear();
    }

    fn check(&self, method: &'static str, endpoint: &'static str) -> ApiResult<MutexGuard<'_, ServerState>> {
        let mut state = self.state();
        if state.failing == Some(endpoint) {
            return Err(ApiError::Status {
                method,
                endpoint: endpoint.to_string(),
                status: 500,
            });
        }
        if method == "GET" {
            state.reads.push(endpoint);
        }
        Ok(state)
    }
}

pub fn user(name: &str) -> UserDto {
    UserDto {
        name: Some(name.to_string()),
        id: Some(format!("{name}-id")),
        policy: Some(json!({
            "IsAdministrator": name == "admin",
            "LoginAttemptsBeforeLockout": -1,
            "EnableAllFolders": true
        })),
    }
}

fn not_found(method: &'static str, endpoint: &str) -> ApiError {
    ApiError::Status {
        method,
        endpoint: endpoint.to_string(),
        status: 404,
    }
}

pub fn folder(name: &str, collection_type: &str, paths: &[&str]) -> VirtualFolderInfo {
    VirtualFolderInfo {
        name: Some(name.to_string()),
        locations: Some(paths.iter().map(|p| p.to_string()).collect()),
        collection_type: Some(collection_type.to_string()),
        item_id: Some(format!("{name}-id")),
    }
}

pub fn plugin(name: &str) -> PluginInfo {
    PluginInfo {
        name: Some(name.to_string()),
        id: Some(format!("{name}-id")),
        version: Some("1.0.0".to_string()),
    }
}

#[async_trait]
impl JellyfinApi for FakeApi {
    async fn get_system_configuration(&self) -> ApiResult<Value> {
        Ok(self.check("GET", "/System/Configuration")?.system.clone())
    }

    async fn update_system_configuration(&self, body: &Value) -> ApiResult<()> {
        let mut state = self.check("POST", "/System/Configuration")?;
        state.system = body.clone();
        state.writes.push(Write::System(body.clone()));
        Ok(())
    }

    async fn get_encoding_configuration(&self) -> ApiResult<Value> {
        Ok(self.check("GET", "/System/Configuration/encoding")?.encoding.clone())
    }

    async fn update_encoding_configuration(&self, body: &Value) -> ApiResult<()> {
        let mut state = self.check("POST", "/System/Configuration/encoding")?;
        state.encoding = body.clone();
        state.writes.push(Write::Encoding(body.clone()));
        Ok(())
    }

    async fn get_virtual_folders(&self) -> ApiResult<Vec<VirtualFolderInfo>> {
        Ok(self.check("GET", "/Library/VirtualFolders")?.folders.clone())
    }

    async fn add_virtual_folder(
        &self,
        name: &str,
        collection_type: CollectionType,
        body: &AddVirtualFolderDto,
    ) -> ApiResult<()> {
        let mut state = self.check("POST", "/Library/VirtualFolders")?;
        let paths: Vec<String> = body
            .library_options
            .path_infos
            .iter()
            .map(|p| p.path.clone())
            .collect();
        let locations: Vec<&str> = paths.iter().map(String::as_str).collect();
        state
            .folders
            .push(folder(name, collection_type.as_str(), &locations));
        state.writes.push(Write::VirtualFolder {
            name: name.to_string(),
            collection_type: collection_type.to_string(),
            paths,
        });
        Ok(())
    }

    async fn get_branding_configuration(&self) -> ApiResult<Value> {
        Ok(self.check("GET", "/System/Configuration/Branding")?.branding.clone())
    }

    async fn update_branding_configuration(&self, body: &Value) -> ApiResult<()> {
        let mut state = self.check("POST", "/System/Configuration/Branding")?;
        state.branding = body.clone();
        state.writes.push(Write::Branding(body.clone()));
        Ok(())
    }

    async fn get_users(&self) -> ApiResult<Vec<UserDto>> {
        Ok(self.check("GET", "/Users")?.users.clone())
    }

    async fn create_user(&self, body: &CreateUserByName) -> ApiResult<()> {
        let mut state = self.check("POST", "/Users/New")?;
        state.users.push(user(&body.name));
        state.writes.push(Write::User {
            name: body.name.clone(),
            password: body.password.clone(),
        });
        Ok(())
    }

    async fn update_user_policy(&self, user_id: &str, body: &Value) -> ApiResult<()> {
        let mut state = self.check("POST", "/Users/{userId}/Policy")?;
        let account = state
            .users
            .iter_mut()
            .find(|u| u.id.as_deref() == Some(user_id))
            .ok_or_else(|| not_found("POST", &format!("/Users/{user_id}/Policy")))?;
        account.policy = Some(body.clone());
        state.writes.push(Write::Policy {
            user_id: user_id.to_string(),
            body: body.clone(),
        });
        Ok(())
    }

    async fn get_plugins(&self) -> ApiResult<Vec<PluginInfo>> {
        Ok(self.check("GET", "/Plugins")?.plugins.clone())
    }

    async fn install_package(&self, name: &str) -> ApiResult<()> {
        let mut state = self.check("POST", "/Packages/Installed")?;
        state.plugins.push(plugin(name));
        state.writes.push(Write::Package(name.to_string()));
        Ok(())
    }

    async fn get_plugin_configuration(&self, plugin_id: &str) -> ApiResult<Value> {
        let state = self.check("GET", "/Plugins/{pluginId}/Configuration")?;
        state
            .plugin_configs
            .get(plugin_id)
            .cloned()
            .ok_or_else(|| not_found("GET", &format!("/Plugins/{plugin_id}/Configuration")))
    }

    async fn update_plugin_configuration(&self, plugin_id: &str, body: &Value) -> ApiResult<()> {
        let mut state = self.check("POST", "/Plugins/{pluginId}/Configuration")?;
        state
            .plugin_configs
            .insert(plugin_id.to_string(), body.clone());
        state.writes.push(Write::PluginConfiguration {
            plugin_id: plugin_id.to_string(),
            body: body.clone(),
        });
        Ok(())
    }

    async fn complete_startup_wizard(&self) -> ApiResult<()> {
        let mut state = self.check("POST", "/Startup/Complete")?;
        state.writes.push(Write::CompleteStartup);
        Ok(())
    }
}
