//! Desired-state document schema
//!
//! Mirrors the YAML layout users write:
//!
//! ```yaml
//! version: 1
//! base_url: http://localhost:8096
//! system:
//!   enableMetrics: true
//!   trickplayOptions:
//!     enableHwAcceleration: null
//! library:
//!   virtualFolders:
//!     - name: Movies
//!       collectionType: movies
//!       libraryOptions:
//!         pathInfos:
//!           - path: /data/movies
//! ```
//!
//! Every section is optional. A missing section is left unmanaged.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::TriState;

/// Root of the desired-state document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RootConfig {
    pub version: i64,

    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<EncodingOptionsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library: Option<LibraryConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<BrandingOptionsConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub users: Option<Vec<UserConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugins: Option<Vec<PluginConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub startup: Option<StartupConfig>,
}

impl RootConfig {
    /// Parsed `base_url`. Validation guarantees this succeeds for loaded configs.
    pub fn base_url(&self) -> anyhow::Result<url::Url> {
        url::Url::parse(&self.base_url)
            .map_err(|e| anyhow::anyhow!("Invalid base_url '{}': {}", self.base_url, e))
    }
}

// =============================================================================
// System
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SystemConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_metrics: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plugin_repositories: Option<Vec<PluginRepositoryConfig>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trickplay_options: Option<TrickplayOptionsConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginRepositoryConfig {
    pub name: String,
    pub url: String,
    pub enabled: bool,
}

/// Trickplay flags; `null` clears the server-side value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrickplayOptionsConfig {
    #[serde(default, skip_serializing_if = "TriState::is_unset")]
    pub enable_hw_acceleration: TriState<bool>,

    #[serde(default, skip_serializing_if = "TriState::is_unset")]
    pub enable_hw_encoding: TriState<bool>,
}

// =============================================================================
// Encoding
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EncodingOptionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_hardware_encoding: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_acceleration_type: Option<HardwareAccelerationType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vaapi_device: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qsv_device: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hardware_decoding_codecs: Option<Vec<DecodingCodec>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_decoding_color_depth10_hevc: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_decoding_color_depth10_vp9: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_decoding_color_depth10_hevc_rext: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_decoding_color_depth12_hevc_rext: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_hevc_encoding: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_av1_encoding: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAccelerationType {
    None,
    Amf,
    Qsv,
    Nvenc,
    V4l2m2m,
    Vaapi,
    Videotoolbox,
    Rkmpp,
}

impl HardwareAccelerationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HardwareAccelerationType::None => "none",
            HardwareAccelerationType::Amf => "amf",
            HardwareAccelerationType::Qsv => "qsv",
            HardwareAccelerationType::Nvenc => "nvenc",
            HardwareAccelerationType::V4l2m2m => "v4l2m2m",
            HardwareAccelerationType::Vaapi => "vaapi",
            HardwareAccelerationType::Videotoolbox => "videotoolbox",
            HardwareAccelerationType::Rkmpp => "rkmpp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecodingCodec {
    H264,
    Hevc,
    Mpeg2video,
    Vc1,
    Vp8,
    Vp9,
    Av1,
}

impl DecodingCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            DecodingCodec::H264 => "h264",
            DecodingCodec::Hevc => "hevc",
            DecodingCodec::Mpeg2video => "mpeg2video",
            DecodingCodec::Vc1 => "vc1",
            DecodingCodec::Vp8 => "vp8",
            DecodingCodec::Vp9 => "vp9",
            DecodingCodec::Av1 => "av1",
        }
    }
}

// =============================================================================
// Library
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LibraryConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub virtual_folders: Option<Vec<VirtualFolderConfig>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct VirtualFolderConfig {
    pub name: String,
    pub collection_type: CollectionType,
    pub library_options: LibraryOptionsConfig,
}

impl VirtualFolderConfig {
    pub fn paths(&self) -> Vec<String> {
        self.library_options
            .path_infos
            .iter()
            .map(|p| p.path.clone())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LibraryOptionsConfig {
    pub path_infos: Vec<PathInfoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PathInfoConfig {
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionType {
    Movies,
    Tvshows,
    Music,
    Musicvideos,
    Homevideos,
    Boxsets,
    Books,
    Mixed,
}

impl CollectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionType::Movies => "movies",
            CollectionType::Tvshows => "tvshows",
            CollectionType::Music => "music",
            CollectionType::Musicvideos => "musicvideos",
            CollectionType::Homevideos => "homevideos",
            CollectionType::Boxsets => "boxsets",
            CollectionType::Books => "books",
            CollectionType::Mixed => "mixed",
        }
    }

    /// Map a server-reported collection type; unknown values become `Mixed`.
    pub fn from_server(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("movies") => CollectionType::Movies,
            Some("tvshows") => CollectionType::Tvshows,
            Some("music") => CollectionType::Music,
            Some("musicvideos") => CollectionType::Musicvideos,
            Some("homevideos") => CollectionType::Homevideos,
            Some("boxsets") => CollectionType::Boxsets,
            Some("books") => CollectionType::Books,
            _ => CollectionType::Mixed,
        }
    }
}

impl fmt::Display for CollectionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Branding, users, plugins, startup
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BrandingOptionsConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_disclaimer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_css: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub splashscreen_enabled: Option<bool>,
}

/// A user that must exist on the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserConfig {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// File whose trimmed contents are the password
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_file: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<UserPolicyConfig>,
}

/// Policy fields enforced on an existing account. Unlisted fields are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UserPolicyConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_administrator: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_attempts_before_lockout: Option<i64>,
}

/// A plugin that must be installed, matched by exact name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginConfig {
    pub name: String,

    /// Settings in the plugin's own field names, merged into what the
    /// server already stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<Map<String, Value>>,
}

impl PluginConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            configuration: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StartupConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complete_startup_wizard: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_document() {
        let config: RootConfig =
            serde_yaml::from_str("version: 1\nbase_url: http://localhost:8096\n").unwrap();
        assert_eq!(config.version, 1);
        assert!(config.system.is_none());
        assert!(config.users.is_none());
    }

    #[test]
    fn test_trickplay_tristate_fields() {
        let yaml = r#"
version: 1
base_url: http://localhost:8096
system:
  trickplayOptions:
    enableHwAcceleration: null
    enableHwEncoding: true
"#;
        let config: RootConfig = serde_yaml::from_str(yaml).unwrap();
        let trickplay = config.system.unwrap().trickplay_options.unwrap();
        assert_eq!(trickplay.enable_hw_acceleration, TriState::Clear);
        assert_eq!(trickplay.enable_hw_encoding, TriState::Set(true));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = "version: 1\nbase_url: http://x\nsystem:\n  enableMetric: true\n";
        assert!(serde_yaml::from_str::<RootConfig>(yaml).is_err());
    }

    #[test]
    fn test_encoding_enums() {
        let yaml = r#"
hardwareAccelerationType: vaapi
hardwareDecodingCodecs: [h264, hevc, mpeg2video]
"#;
        let encoding: EncodingOptionsConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            encoding.hardware_acceleration_type,
            Some(HardwareAccelerationType::Vaapi)
        );
        assert_eq!(
            encoding.hardware_decoding_codecs,
            Some(vec![
                DecodingCodec::H264,
                DecodingCodec::Hevc,
                DecodingCodec::Mpeg2video
            ])
        );
        assert!(serde_yaml::from_str::<EncodingOptionsConfig>("hardwareAccelerationType: cuda").is_err());
    }

    #[test]
    fn test_virtual_folder_layout() {
        let yaml = r#"
name: Movies
collectionType: movies
libraryOptions:
  pathInfos:
    - path: /data/movies
    - path: /mnt/movies
"#;
        let folder: VirtualFolderConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(folder.collection_type, CollectionType::Movies);
        assert_eq!(folder.paths(), vec!["/data/movies", "/mnt/movies"]);
    }

    #[test]
    fn test_user_policy_and_plugin_configuration() {
        let yaml = r#"
version: 1
base_url: http://localhost:8096
users:
  - name: alice
    password: pw
    policy:
      isAdministrator: true
      loginAttemptsBeforeLockout: 5
plugins:
  - name: Trakt
    configuration:
      SyncInterval: 30
      Options: {Scrobble: true}
  - name: Fanart
"#;
        let config: RootConfig = serde_yaml::from_str(yaml).unwrap();

        let policy = config.users.unwrap()[0].policy.clone().unwrap();
        assert_eq!(policy.is_administrator, Some(true));
        assert_eq!(policy.login_attempts_before_lockout, Some(5));

        let plugins = config.plugins.unwrap();
        let settings = plugins[0].configuration.as_ref().unwrap();
        assert_eq!(settings["SyncInterval"], serde_json::json!(30));
        assert_eq!(settings["Options"], serde_json::json!({"Scrobble": true}));
        assert_eq!(plugins[1], PluginConfig::named("Fanart"));
    }

    #[test]
    fn test_unknown_policy_field_rejected() {
        let yaml = "name: bob\npassword: x\npolicy:\n  isAdmin: true\n";
        assert!(serde_yaml::from_str::<UserConfig>(yaml).is_err());
    }

    #[test]
    fn test_collection_type_from_server() {
        assert_eq!(CollectionType::from_server(Some("tvshows")), CollectionType::Tvshows);
        assert_eq!(CollectionType::from_server(Some("Movies")), CollectionType::Movies);
        assert_eq!(CollectionType::from_server(Some("playlists")), CollectionType::Mixed);
        assert_eq!(CollectionType::from_server(None), CollectionType::Mixed);
    }
}
