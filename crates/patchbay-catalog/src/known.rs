use tracing::warn;

use crate::descriptor::PluginDescriptor;

/// Registry of every plugin a scan has turned up, plus the files that
/// crashed the scanner and must never be probed again.
#[derive(Debug, Clone, Default)]
pub struct KnownPlugins {
    plugins: Vec<PluginDescriptor>,
    blacklist: Vec<String>,
}

impl KnownPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor, replacing any earlier entry for the same file
    /// and uid so newer scan info wins. Returns whether the list changed.
    pub fn add(&mut self, descriptor: PluginDescriptor) -> bool {
        match self
            .plugins
            .iter_mut()
            .find(|existing| existing.is_duplicate_of(&descriptor))
        {
            Some(existing) if *existing == descriptor => false,
            Some(existing) => {
                *existing = descriptor;
                true
            }
            None => {
                self.plugins.push(descriptor);
                true
            }
        }
    }

    /// [`add`](Self::add), but refuses files on the blacklist.
    pub fn add_scanned(&mut self, descriptor: PluginDescriptor) -> bool {
        if self.is_blacklisted(&descriptor.file_or_identifier) {
            warn!(file = %descriptor.file_or_identifier, "ignoring blacklisted plugin");
            return false;
        }
        self.add(descriptor)
    }

    pub fn remove(&mut self, descriptor: &PluginDescriptor) -> bool {
        let before = self.plugins.len();
        self.plugins
            .retain(|existing| !existing.is_duplicate_of(descriptor));
        self.plugins.len() != before
    }

    pub fn find_matching(&self, identifier: &str) -> Option<&PluginDescriptor> {
        self.plugins
            .iter()
            .find(|descriptor| descriptor.matches_identifier(identifier))
    }

    pub fn plugins(&self) -> &[PluginDescriptor] {
        &self.plugins
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Name-ordered copy for menus, case folded.
    pub fn sorted_by_name(&self) -> Vec<PluginDescriptor> {
        let mut sorted = self.plugins.clone();
        sorted.sort_by_key(|descriptor| descriptor.name.to_ascii_lowercase());
        sorted
    }

    pub fn is_blacklisted(&self, file_or_identifier: &str) -> bool {
        self.blacklist
            .iter()
            .any(|entry| entry == file_or_identifier)
    }

    pub fn add_to_blacklist(&mut self, file_or_identifier: impl Into<String>) {
        let entry = file_or_identifier.into();
        if !self.is_blacklisted(&entry) {
            self.blacklist.push(entry);
        }
    }

    pub fn remove_from_blacklist(&mut self, file_or_identifier: &str) {
        self.blacklist.retain(|entry| entry != file_or_identifier);
    }

    pub fn clear_blacklist(&mut self) {
        self.blacklist.clear();
    }

    pub fn blacklist(&self) -> &[String] {
        &self.blacklist
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn gain(version: &str) -> PluginDescriptor {
        PluginDescriptor::new("Gain", "Builtin", "builtin:gain", 7).with_version(version)
    }

    #[test]
    fn add_replaces_duplicates_instead_of_stacking() {
        let mut known = KnownPlugins::new();
        assert!(known.add(gain("1.0")));
        assert!(known.add(gain("2.0")));
        assert_eq!(known.plugins().len(), 1);
        assert_eq!(known.plugins()[0].version, "2.0");
    }

    #[test]
    fn re_adding_an_identical_descriptor_reports_no_change() {
        let mut known = KnownPlugins::new();
        known.add(gain("1.0"));
        assert!(!known.add(gain("1.0")));
    }

    #[test]
    fn scanned_blacklisted_files_are_refused() {
        let mut known = KnownPlugins::new();
        known.add_to_blacklist("builtin:gain");
        assert!(!known.add_scanned(gain("1.0")));
        assert!(known.is_empty());

        known.remove_from_blacklist("builtin:gain");
        assert!(known.add_scanned(gain("1.0")));
    }

    #[test]
    fn find_matching_resolves_full_identifier_strings() {
        let mut known = KnownPlugins::new();
        let descriptor = gain("1.0");
        let identifier = descriptor.identifier_string();
        known.add(descriptor.clone());
        known.add(PluginDescriptor::new("Tone", "Builtin", "builtin:tone", 8));

        assert_eq!(known.find_matching(&identifier), Some(&descriptor));
        assert_eq!(known.find_matching("Builtin-Nope-ffff-1"), None);
    }

    #[test]
    fn sorted_by_name_ignores_case() {
        let mut known = KnownPlugins::new();
        known.add(PluginDescriptor::new("delay", "Builtin", "builtin:delay", 1));
        known.add(PluginDescriptor::new("Chorus", "Builtin", "builtin:chorus", 2));
        let names: Vec<_> = known
            .sorted_by_name()
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect();
        assert_eq!(names, vec!["Chorus".to_string(), "delay".to_string()]);
    }
}
