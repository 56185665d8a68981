//! Branding options

use serde_json::Value;

use super::{ConfigUpdate, ManagedField, merge_fields};
use crate::config::BrandingOptionsConfig;
use crate::diff::{DiffOptions, PatchError};

pub fn calculate_branding_diff(
    current: &Value,
    desired: &BrandingOptionsConfig,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let mut fields = Vec::new();
    if let Some(text) = &desired.login_disclaimer {
        fields.push(ManagedField::new("LoginDisclaimer", text.as_str(), ""));
    }
    if let Some(css) = &desired.custom_css {
        fields.push(ManagedField::new("CustomCss", css.as_str(), ""));
    }
    if let Some(enabled) = desired.splashscreen_enabled {
        fields.push(ManagedField::new("SplashscreenEnabled", enabled, false));
    }

    merge_fields(current, &fields, &DiffOptions::new())
}
