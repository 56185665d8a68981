//! Export current server state as a desired-state document

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

use crate::api::{JellyfinApi, PluginInfo, UserDto, VirtualFolderInfo};
use crate::config::{
    BrandingOptionsConfig, CollectionType, EncodingOptionsConfig, LibraryConfig,
    LibraryOptionsConfig, PathInfoConfig, PluginConfig, PluginRepositoryConfig, RootConfig,
    SystemConfig, TrickplayOptionsConfig, UserConfig, UserPolicyConfig, VirtualFolderConfig,
};
use crate::types::TriState;

/// Read every domain from the server, one call at a time.
///
/// Passwords cannot be read back, so dumped users carry neither `password`
/// nor `passwordFile` and the result does not validate as-is. A plugin
/// whose settings cannot be read is dumped by name only.
pub async fn dump_config(api: &dyn JellyfinApi, base_url: &str) -> anyhow::Result<RootConfig> {
    let system = api.get_system_configuration().await?;
    let encoding = api.get_encoding_configuration().await?;
    let folders = api.get_virtual_folders().await?;
    let branding = api.get_branding_configuration().await?;
    let users = api.get_users().await?;
    let plugins = api.get_plugins().await?;
    let plugins = plugins_from_server(api, &plugins).await;

    Ok(RootConfig {
        version: 1,
        base_url: base_url.to_string(),
        system: Some(system_from_server(&system)),
        encoding: Some(encoding_from_server(&encoding)),
        library: Some(library_from_server(&folders)),
        branding: Some(branding_from_server(&branding)),
        users: Some(users_from_server(&users)),
        plugins: Some(plugins),
        startup: None,
    })
}

fn system_from_server(system: &Value) -> SystemConfig {
    let plugin_repositories = system
        .get("PluginRepositories")
        .and_then(Value::as_array)
        .map(|repos| {
            repos
                .iter()
                .map(|repo| PluginRepositoryConfig {
                    name: string(repo, "Name").unwrap_or_default(),
                    url: string(repo, "Url").unwrap_or_default(),
                    enabled: bool_field(repo, "Enabled").unwrap_or(false),
                })
                .collect()
        });

    let trickplay_options = system.get("TrickplayOptions").map(|trickplay| {
        let flag = |key: &str| match bool_field(trickplay, key) {
            Some(value) => TriState::Set(value),
            None => TriState::Unset,
        };
        TrickplayOptionsConfig {
            enable_hw_acceleration: flag("EnableHwAcceleration"),
            enable_hw_encoding: flag("EnableHwEncoding"),
        }
    });

    SystemConfig {
        enable_metrics: bool_field(system, "EnableMetrics"),
        plugin_repositories,
        trickplay_options,
    }
}

fn encoding_from_server(encoding: &Value) -> EncodingOptionsConfig {
    let hardware_decoding_codecs = encoding
        .get("HardwareDecodingCodecs")
        .and_then(Value::as_array)
        // Codecs this tool has no name for are left out.
        .map(|codecs| codecs.iter().filter_map(typed).collect());

    EncodingOptionsConfig {
        enable_hardware_encoding: bool_field(encoding, "EnableHardwareEncoding"),
        hardware_acceleration_type: encoding.get("HardwareAccelerationType").and_then(typed),
        vaapi_device: string(encoding, "VaapiDevice"),
        qsv_device: string(encoding, "QsvDevice"),
        hardware_decoding_codecs,
        enable_decoding_color_depth10_hevc: bool_field(encoding, "EnableDecodingColorDepth10Hevc"),
        enable_decoding_color_depth10_vp9: bool_field(encoding, "EnableDecodingColorDepth10Vp9"),
        enable_decoding_color_depth10_hevc_rext: bool_field(
            encoding,
            "EnableDecodingColorDepth10HevcRext",
        ),
        enable_decoding_color_depth12_hevc_rext: bool_field(
            encoding,
            "EnableDecodingColorDepth12HevcRext",
        ),
        allow_hevc_encoding: bool_field(encoding, "AllowHevcEncoding"),
        allow_av1_encoding: bool_field(encoding, "AllowAv1Encoding"),
    }
}

fn library_from_server(folders: &[VirtualFolderInfo]) -> LibraryConfig {
    let virtual_folders = folders
        .iter()
        .map(|folder| VirtualFolderConfig {
            name: folder.name.clone().unwrap_or_default(),
            collection_type: CollectionType::from_server(folder.collection_type.as_deref()),
            library_options: LibraryOptionsConfig {
                path_infos: folder
                    .locations
                    .iter()
                    .flatten()
                    .map(|path| PathInfoConfig { path: path.clone() })
                    .collect(),
            },
        })
        .collect();

    LibraryConfig {
        virtual_folders: Some(virtual_folders),
    }
}

fn branding_from_server(branding: &Value) -> BrandingOptionsConfig {
    BrandingOptionsConfig {
        login_disclaimer: string(branding, "LoginDisclaimer"),
        custom_css: string(branding, "CustomCss"),
        splashscreen_enabled: bool_field(branding, "SplashscreenEnabled"),
    }
}

fn users_from_server(users: &[UserDto]) -> Vec<UserConfig> {
    users
        .iter()
        .filter_map(|user| {
            Some(UserConfig {
                name: user.name.clone()?,
                password: None,
                password_file: None,
                policy: user.policy.as_ref().map(policy_from_server),
            })
        })
        .collect()
}

fn policy_from_server(policy: &Value) -> UserPolicyConfig {
    UserPolicyConfig {
        is_administrator: bool_field(policy, "IsAdministrator"),
        // The server reports "no lockout" as -1, which is not expressible.
        login_attempts_before_lockout: policy
            .get("LoginAttemptsBeforeLockout")
            .and_then(Value::as_i64)
            .filter(|attempts| *attempts >= 1),
    }
}

async fn plugins_from_server(api: &dyn JellyfinApi, plugins: &[PluginInfo]) -> Vec<PluginConfig> {
    let mut out = Vec::new();
    for plugin in plugins {
        let Some(name) = plugin.name.clone() else {
            continue;
        };
        let configuration = match &plugin.id {
            Some(id) => match api.get_plugin_configuration(id).await {
                Ok(Value::Object(settings)) => Some(settings),
                Ok(_) => None,
                Err(err) => {
                    warn!("Skipping configuration of plugin '{}': {}", name, err);
                    None
                }
            },
            None => None,
        };
        out.push(PluginConfig {
            name,
            configuration,
        });
    }
    out
}

fn string(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn bool_field(value: &Value, key: &str) -> Option<bool> {
    value.get(key).and_then(Value::as_bool)
}

/// Server values are PascalCase or lowercase depending on version.
fn typed<T: DeserializeOwned>(value: &Value) -> Option<T> {
    let text = value.as_str()?.to_ascii_lowercase();
    serde_json::from_value(Value::String(text)).ok()
}
