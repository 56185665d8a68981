use std::fs;

use tempfile::TempDir;

use jellarr_core::config::{ValidationError, load_config, to_yaml};
use jellarr_core::types::TriState;

#[test]
fn loads_document_from_disk() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yml");
    fs::write(
        &path,
        r#"
version: 1
base_url: https://jellyfin.example.com
system:
  trickplayOptions:
    enableHwAcceleration: null
    enableHwEncoding: false
users:
  - name: alice
    passwordFile: /run/secrets/alice
"#,
    )
    .unwrap();

    let config = load_config(&path).unwrap();

    let trickplay = config.system.unwrap().trickplay_options.unwrap();
    assert_eq!(trickplay.enable_hw_acceleration, TriState::Clear);
    assert_eq!(trickplay.enable_hw_encoding, TriState::Set(false));
    assert_eq!(
        config.users.unwrap()[0].password_file.as_deref(),
        Some(std::path::Path::new("/run/secrets/alice"))
    );
}

#[test]
fn reports_every_invalid_field() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yml");
    fs::write(
        &path,
        r#"
version: 1
base_url: http://localhost:8096
library:
  virtualFolders:
    - name: Movies
      collectionType: movies
      libraryOptions:
        pathInfos: []
users:
  - name: bob
    password: x
    passwordFile: /tmp/x
"#,
    )
    .unwrap();

    let err = load_config(&path).unwrap_err();

    let validation = err.downcast_ref::<ValidationError>().unwrap();
    let paths: Vec<&str> = validation.issues.iter().map(|i| i.path.as_str()).collect();
    assert_eq!(
        paths,
        vec!["library.virtualFolders[0].libraryOptions.pathInfos", "users[0]"]
    );
    assert!(format!("{err:#}").contains("Failed to load config file"));
}

#[test]
fn rejects_unknown_collection_type() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yml");
    fs::write(
        &path,
        r#"
version: 1
base_url: http://localhost:8096
library:
  virtualFolders:
    - name: Clips
      collectionType: clips
      libraryOptions:
        pathInfos:
          - path: /clips
"#,
    )
    .unwrap();

    let err = load_config(&path).unwrap_err();
    assert!(format!("{err:#}").contains("YAML parsing error"));
}

#[test]
fn yaml_roundtrip_preserves_cleared_fields() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("config.yml");
    fs::write(
        &path,
        "version: 1\nbase_url: http://localhost\nsystem:\n  trickplayOptions:\n    enableHwAcceleration: null\n",
    )
    .unwrap();
    let config = load_config(&path).unwrap();

    let rendered = to_yaml(&config).unwrap();
    fs::write(&path, rendered).unwrap();

    assert_eq!(load_config(&path).unwrap(), config);
}
