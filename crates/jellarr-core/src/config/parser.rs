//! YAML parser with helpful error messages

use super::schema::RootConfig;
use super::validate::validate_config;
use anyhow::{Context, Result};
use std::path::Path;

/// Load and validate a desired-state document from disk
pub fn load_config(path: &Path) -> Result<RootConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content)
        .with_context(|| format!("Failed to load config file: {}", path.display()))
}

/// Parse and validate a desired-state document from a string
pub fn parse_config_str(content: &str) -> Result<RootConfig> {
    let config: RootConfig =
        serde_yaml::from_str(content).map_err(|e| enhance_yaml_error(e, content))?;

    validate_config(&config)?;

    Ok(config)
}

/// Serialize a configuration back to YAML
pub fn to_yaml(config: &RootConfig) -> Result<String> {
    serde_yaml::to_string(config).context("Failed to serialize configuration to YAML")
}

fn enhance_yaml_error(error: serde_yaml::Error, content: &str) -> anyhow::Error {
    match error.location() {
        Some(location) => {
            let context = get_line_context(content, location.line());
            anyhow::anyhow!(
                "YAML parsing error at line {}, column {}:\n{}\n\nError: {}",
                location.line(),
                location.column(),
                context,
                error
            )
        }
        None => anyhow::anyhow!("YAML parsing error: {}", error),
    }
}

/// Get context lines around an error
fn get_line_context(content: &str, line_num: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = line_num.saturating_sub(2);
    let end = (line_num + 2).min(lines.len());

    if start >= end {
        return String::new();
    }

    lines[start..end]
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let num = start + i + 1;
            let marker = if num == line_num { ">>>" } else { "   " };
            format!("{} {:4} | {}", marker, num, line)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
version: 1
base_url: http://jellyfin.local:8096
system:
  enableMetrics: true
  pluginRepositories:
    - name: Jellyfin Official
      url: https://repo.jellyfin.org/releases/plugin/manifest.json
      enabled: true
  trickplayOptions:
    enableHwAcceleration: true
encoding:
  enableHardwareEncoding: true
  hardwareAccelerationType: vaapi
  vaapiDevice: /dev/dri/renderD128
library:
  virtualFolders:
    - name: Movies
      collectionType: movies
      libraryOptions:
        pathInfos:
          - path: /data/movies
branding:
  loginDisclaimer: Welcome
  splashscreenEnabled: false
users:
  - name: alice
    password: secret
plugins:
  - name: Trakt
startup:
  completeStartupWizard: true
"#;

        let config = parse_config_str(yaml).unwrap();

        assert_eq!(config.base_url, "http://jellyfin.local:8096");
        assert_eq!(config.system.as_ref().unwrap().enable_metrics, Some(true));
        assert_eq!(config.users.as_ref().unwrap()[0].name, "alice");
        assert_eq!(config.plugins.as_ref().unwrap()[0].name, "Trakt");
        assert_eq!(
            config.startup.as_ref().unwrap().complete_startup_wizard,
            Some(true)
        );
    }

    #[test]
    fn test_syntax_error_reports_line() {
        let yaml = "version: 1\nbase_url: [unclosed\n";
        let err = parse_config_str(yaml).unwrap_err();
        assert!(err.to_string().contains("YAML parsing error"));
    }

    #[test]
    fn test_validation_error_is_distinguishable() {
        let yaml = "version: 0\nbase_url: http://localhost\n";
        let err = parse_config_str(yaml).unwrap_err();
        let validation = err.downcast_ref::<ValidationError>().unwrap();
        assert_eq!(validation.issues[0].path, "version");
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "version: 1\nbase_url: http://localhost:8096").unwrap();

        let config = load_config(file.path()).unwrap();

        assert_eq!(config.version, 1);
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_config(Path::new("/nonexistent/jellarr.yml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_to_yaml_roundtrip() {
        let config = parse_config_str(
            "version: 1\nbase_url: http://localhost\nsystem:\n  trickplayOptions:\n    enableHwEncoding: null\n",
        )
        .unwrap();

        let yaml = to_yaml(&config).unwrap();

        assert_eq!(parse_config_str(&yaml).unwrap(), config);
    }

    #[test]
    fn test_line_context_marks_error_line() {
        let context = get_line_context("a\nb\nc\nd", 2);
        assert!(context.contains(">>>    2 | b"));
    }
}
