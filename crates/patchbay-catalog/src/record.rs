use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::descriptor::PluginDescriptor;

/// Tag every descriptor record must carry.
pub const PLUGIN_TAG: &str = "PLUGIN";

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("unexpected record tag {0:?}, expected {PLUGIN_TAG:?}")]
    WrongTag(String),
}

/// On-disk form of a [`PluginDescriptor`].
///
/// Every field is defaulted so that records written by older or partial
/// sources still decode; numeric fields carried as hex strings decode to 0
/// when absent or malformed instead of failing. The only hard requirement is
/// the `tag` field, which lets a caller walking a mixed record stream decide
/// whether to skip or abort.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorRecord {
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub name: String,
    /// Written only when it differs from `name`; absence means "same".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptive_name: Option<String>,
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub file: String,
    /// Lowercase hex.
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub is_instrument: bool,
    /// Hex milliseconds since the Unix epoch.
    #[serde(default)]
    pub file_time: String,
    #[serde(default)]
    pub info_update_time: String,
    #[serde(default)]
    pub num_inputs: u32,
    #[serde(default)]
    pub num_outputs: u32,
    #[serde(default)]
    pub is_shell: bool,
}

impl DescriptorRecord {
    pub fn from_descriptor(descriptor: &PluginDescriptor) -> Self {
        Self {
            tag: PLUGIN_TAG.to_string(),
            name: descriptor.name.clone(),
            descriptive_name: (descriptor.descriptive_name != descriptor.name)
                .then(|| descriptor.descriptive_name.clone()),
            format: descriptor.format.clone(),
            category: descriptor.category.clone(),
            manufacturer: descriptor.manufacturer.clone(),
            version: descriptor.version.clone(),
            file: descriptor.file_or_identifier.clone(),
            uid: format!("{:x}", descriptor.uid),
            is_instrument: descriptor.is_instrument,
            file_time: to_hex_millis(descriptor.last_file_mod_time),
            info_update_time: to_hex_millis(descriptor.last_info_update_time),
            num_inputs: descriptor.num_input_channels,
            num_outputs: descriptor.num_output_channels,
            is_shell: descriptor.has_shared_container,
        }
    }

    /// Decodes the record, failing only on a wrong tag.
    pub fn into_descriptor(self) -> Result<PluginDescriptor, RecordError> {
        if self.tag != PLUGIN_TAG {
            return Err(RecordError::WrongTag(self.tag));
        }

        let name = self.name;
        Ok(PluginDescriptor {
            descriptive_name: self.descriptive_name.unwrap_or_else(|| name.clone()),
            name,
            format: self.format,
            category: self.category,
            manufacturer: self.manufacturer,
            version: self.version,
            file_or_identifier: self.file,
            uid: u32::from_str_radix(&self.uid, 16).unwrap_or(0),
            is_instrument: self.is_instrument,
            last_file_mod_time: from_hex_millis(&self.file_time),
            last_info_update_time: from_hex_millis(&self.info_update_time),
            num_input_channels: self.num_inputs,
            num_output_channels: self.num_outputs,
            has_shared_container: self.is_shell,
        })
    }
}

fn to_hex_millis(time: DateTime<Utc>) -> String {
    format!("{:x}", time.timestamp_millis().max(0))
}

fn from_hex_millis(value: &str) -> DateTime<Utc> {
    i64::from_str_radix(value, 16)
        .ok()
        .and_then(|millis| Utc.timestamp_millis_opt(millis).single())
        .unwrap_or_default()
}
