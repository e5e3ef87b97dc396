use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Metadata identifying one loadable processing unit.
///
/// Descriptors are produced by plugin discovery and treated as immutable
/// values afterwards. Two descriptors refer to the same plugin exactly when
/// [`PluginDescriptor::is_duplicate_of`] says so; everything else (names,
/// category, channel counts) is presentation data that may be refreshed by a
/// rescan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginDescriptor {
    pub name: String,
    /// Longer display name. Falls back to `name` when a source had no
    /// separate descriptive name.
    pub descriptive_name: String,
    /// Tag of the hosting backend this plugin loads through, e.g. "Builtin".
    pub format: String,
    pub category: String,
    pub manufacturer: String,
    pub version: String,
    /// Path to the plugin binary, or a platform identifier for formats that
    /// are not file based.
    pub file_or_identifier: String,
    pub uid: u32,
    pub is_instrument: bool,
    pub last_file_mod_time: DateTime<Utc>,
    pub last_info_update_time: DateTime<Utc>,
    pub num_input_channels: u32,
    pub num_output_channels: u32,
    /// True when the plugin lives in a shell file exposing several distinct
    /// units; the uid then tells them apart.
    pub has_shared_container: bool,
}

impl PluginDescriptor {
    pub fn new(
        name: impl Into<String>,
        format: impl Into<String>,
        file_or_identifier: impl Into<String>,
        uid: u32,
    ) -> Self {
        let name = name.into();
        Self {
            descriptive_name: name.clone(),
            name,
            format: format.into(),
            category: String::new(),
            manufacturer: String::new(),
            version: String::new(),
            file_or_identifier: file_or_identifier.into(),
            uid,
            is_instrument: false,
            last_file_mod_time: DateTime::<Utc>::default(),
            last_info_update_time: DateTime::<Utc>::default(),
            num_input_channels: 0,
            num_output_channels: 0,
            has_shared_container: false,
        }
    }

    pub fn with_descriptive_name(mut self, descriptive_name: impl Into<String>) -> Self {
        self.descriptive_name = descriptive_name.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = manufacturer.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_channels(mut self, inputs: u32, outputs: u32) -> Self {
        self.num_input_channels = inputs;
        self.num_output_channels = outputs;
        self
    }

    pub fn instrument(mut self, is_instrument: bool) -> Self {
        self.is_instrument = is_instrument;
        self
    }

    pub fn shell_container(mut self, shared: bool) -> Self {
        self.has_shared_container = shared;
        self
    }

    pub fn with_timestamps(
        mut self,
        file_mod: DateTime<Utc>,
        info_update: DateTime<Utc>,
    ) -> Self {
        self.last_file_mod_time = file_mod;
        self.last_info_update_time = info_update;
        self
    }

    /// True when both descriptors point at the same loadable unit.
    ///
    /// Only the file (or platform identifier) and the uid take part; display
    /// fields are free to differ between scans.
    pub fn is_duplicate_of(&self, other: &PluginDescriptor) -> bool {
        self.file_or_identifier == other.file_or_identifier && self.uid == other.uid
    }

    /// The stable tail of the identifier string:
    /// `-<hex(hash(file_or_identifier))>-<hex(uid)>`.
    pub fn identifier_suffix(&self) -> String {
        format!(
            "-{:x}-{:x}",
            stable_hash(&self.file_or_identifier),
            self.uid
        )
    }

    /// Canonical external reference: `<format>-<name><suffix>`.
    pub fn identifier_string(&self) -> String {
        format!("{}-{}{}", self.format, self.name, self.identifier_suffix())
    }

    /// Case-insensitive suffix match against [`identifier_suffix`].
    ///
    /// Matching the suffix alone keeps legacy identifiers working when the
    /// head (format or display name) has changed between releases.
    ///
    /// [`identifier_suffix`]: PluginDescriptor::identifier_suffix
    pub fn matches_identifier(&self, identifier: &str) -> bool {
        identifier
            .to_ascii_lowercase()
            .ends_with(&self.identifier_suffix())
    }
}

/// Deterministic 32-bit hash of an identifier string.
///
/// Truncated SHA-256 so that identifier strings written by one platform or
/// session keep matching on any other.
fn stable_hash(value: &str) -> u32 {
    let digest = Sha256::digest(value.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn descriptor(file: &str, uid: u32) -> PluginDescriptor {
        PluginDescriptor::new("Test Tone", "Builtin", file, uid)
            .with_manufacturer("Patchbay")
            .with_channels(0, 2)
    }

    #[test]
    fn duplicate_check_is_reflexive_and_symmetric() {
        let a = descriptor("/plugins/tone.so", 0x1234);
        let b = descriptor("/plugins/tone.so", 0x1234).with_version("2.0");
        let c = descriptor("/plugins/tone.so", 0x9999);

        assert!(a.is_duplicate_of(&a));
        assert!(a.is_duplicate_of(&b));
        assert!(b.is_duplicate_of(&a));
        assert!(!a.is_duplicate_of(&c));
        assert!(!c.is_duplicate_of(&a));
    }

    #[test]
    fn identifier_string_always_matches_itself() {
        let d = descriptor("/plugins/tone.so", 0xdeadbeef);
        assert!(d.matches_identifier(&d.identifier_string()));
    }

    #[test]
    fn identifier_match_ignores_case_and_head() {
        let d = descriptor("/plugins/tone.so", 0xab);
        let suffix = d.identifier_suffix();
        let legacy = format!("OldFormat-Renamed Plugin{}", suffix.to_ascii_uppercase());
        assert!(d.matches_identifier(&legacy));
        assert!(!d.matches_identifier("Builtin-Test Tone-0-0"));
    }

    #[test]
    fn identifier_hash_is_stable_across_instances() {
        let a = descriptor("/plugins/tone.so", 1);
        let b = descriptor("/plugins/tone.so", 1);
        assert_eq!(a.identifier_suffix(), b.identifier_suffix());
    }
}
