//! Encoding options

use serde_json::{Value, json};

use super::{ConfigUpdate, ManagedField, merge_fields};
use crate::config::EncodingOptionsConfig;
use crate::diff::{DiffOptions, PatchError};

const HARDWARE_DECODING_CODECS: &str = "HardwareDecodingCodecs";

/// Merge the explicitly desired encoding fields into the current options.
///
/// Fields left out of `desired` are never touched. Decoding codecs compare
/// as a set.
pub fn calculate_encoding_diff(
    current: &Value,
    desired: &EncodingOptionsConfig,
) -> Result<Option<ConfigUpdate>, PatchError> {
    let options = DiffOptions::new().with_unordered(HARDWARE_DECODING_CODECS);
    merge_fields(current, &managed_fields(desired), &options)
}

fn managed_fields(desired: &EncodingOptionsConfig) -> Vec<ManagedField> {
    let mut fields = Vec::new();

    let flags = [
        ("EnableHardwareEncoding", desired.enable_hardware_encoding),
        (
            "EnableDecodingColorDepth10Hevc",
            desired.enable_decoding_color_depth10_hevc,
        ),
        (
            "EnableDecodingColorDepth10Vp9",
            desired.enable_decoding_color_depth10_vp9,
        ),
        (
            "EnableDecodingColorDepth10HevcRext",
            desired.enable_decoding_color_depth10_hevc_rext,
        ),
        (
            "EnableDecodingColorDepth12HevcRext",
            desired.enable_decoding_color_depth12_hevc_rext,
        ),
        ("AllowHevcEncoding", desired.allow_hevc_encoding),
        ("AllowAv1Encoding", desired.allow_av1_encoding),
    ];
    for (key, value) in flags {
        if let Some(value) = value {
            fields.push(ManagedField::new(key, value, false));
        }
    }

    if let Some(accel) = desired.hardware_acceleration_type {
        fields.push(ManagedField::new("HardwareAccelerationType", accel.as_str(), "none"));
    }
    if let Some(device) = &desired.vaapi_device {
        fields.push(ManagedField::new("VaapiDevice", device.as_str(), ""));
    }
    if let Some(device) = &desired.qsv_device {
        fields.push(ManagedField::new("QsvDevice", device.as_str(), ""));
    }
    if let Some(codecs) = &desired.hardware_decoding_codecs {
        let codecs: Vec<&str> = codecs.iter().map(|c| c.as_str()).collect();
        fields.push(ManagedField::new(HARDWARE_DECODING_CODECS, json!(codecs), json!([])));
    }

    fields
}
