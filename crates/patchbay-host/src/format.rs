use std::fmt::Debug;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::warn;

use patchbay_catalog::PluginDescriptor;

use crate::instance::PluginInstance;

/// Errors that can occur while resolving or creating plugin instances.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("no installed format can open {0}")]
    NoMatchingFormat(String),
    #[error("unknown plugin: {0}")]
    UnknownPlugin(String),
}

/// Ticket identifying one queued instantiation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

/// Completion of a queued instantiation.
///
/// Failure is a plain message; nothing unwinds across the format boundary.
#[derive(Debug)]
pub struct InstantiationEvent {
    pub request: RequestId,
    pub outcome: Result<Box<dyn PluginInstance>, String>,
}

/// One hosting backend able to turn descriptors into live instances.
pub trait PluginFormat: Send + Debug {
    fn name(&self) -> &str;

    fn can_handle(&self, descriptor: &PluginDescriptor) -> bool;

    fn create_instance(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Box<dyn PluginInstance>, HostError>;
}

/// Registry of hosting backends plus the queued-instantiation plumbing.
///
/// `begin_instantiate` never hands an instance back directly; completions
/// arrive as [`InstantiationEvent`]s drained via `try_next_event`, so the
/// document mutates its graph only from its own pump and can discard
/// completions whose request it no longer remembers.
#[derive(Debug)]
pub struct FormatManager {
    formats: Vec<Box<dyn PluginFormat>>,
    next_request: u64,
    event_tx: Sender<InstantiationEvent>,
    event_rx: Receiver<InstantiationEvent>,
}

impl Default for FormatManager {
    fn default() -> Self {
        Self::new()
    }
}

impl FormatManager {
    pub fn new() -> Self {
        let (event_tx, event_rx) = unbounded();
        Self {
            formats: Vec::new(),
            next_request: 0,
            event_tx,
            event_rx,
        }
    }

    /// Manager with every format that ships with the application.
    pub fn with_default_formats() -> Self {
        let mut manager = Self::new();
        manager.register(crate::builtin::BuiltinFormat);
        manager
    }

    pub fn register(&mut self, format: impl PluginFormat + 'static) {
        self.formats.push(Box::new(format));
    }

    pub fn format_names(&self) -> Vec<&str> {
        self.formats.iter().map(|format| format.name()).collect()
    }

    /// Resolves and loads in place. Used by document reload, where a node
    /// that fails here is skipped rather than fatal.
    pub fn create_instance_sync(
        &self,
        descriptor: &PluginDescriptor,
    ) -> Result<Box<dyn PluginInstance>, HostError> {
        let format = self
            .formats
            .iter()
            .find(|format| format.can_handle(descriptor))
            .ok_or_else(|| HostError::NoMatchingFormat(descriptor.identifier_string()))?;
        format.create_instance(descriptor)
    }

    /// Queues an instantiation. The completion is delivered through the
    /// event channel, never returned here, so callers keyed on the returned
    /// id decide later whether they still want the instance.
    pub fn begin_instantiate(&mut self, descriptor: &PluginDescriptor) -> RequestId {
        self.next_request += 1;
        let request = RequestId(self.next_request);
        let outcome = self
            .create_instance_sync(descriptor)
            .map_err(|err| err.to_string());
        if self
            .event_tx
            .send(InstantiationEvent { request, outcome })
            .is_err()
        {
            warn!(request = request.0, "instantiation event channel closed");
        }
        request
    }

    /// Non-blocking drain hook for the owning thread.
    pub fn try_next_event(&self) -> Option<InstantiationEvent> {
        self.event_rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::builtin::{builtin_descriptors, BuiltinFormat};

    fn foreign_descriptor() -> PluginDescriptor {
        PluginDescriptor::new("Alien", "VST", "/plugins/alien.so", 99)
    }

    #[test]
    fn sync_creation_resolves_builtin_descriptors() {
        let mut manager = FormatManager::new();
        manager.register(BuiltinFormat);
        for descriptor in builtin_descriptors() {
            let instance = manager.create_instance_sync(&descriptor).unwrap();
            assert_eq!(instance.descriptor().name, descriptor.name);
        }
    }

    #[test]
    fn unhandled_formats_are_reported() {
        let manager = FormatManager::with_default_formats();
        assert!(matches!(
            manager.create_instance_sync(&foreign_descriptor()),
            Err(HostError::NoMatchingFormat(_))
        ));
    }

    #[test]
    fn queued_instantiation_completes_through_the_event_channel() {
        let mut manager = FormatManager::with_default_formats();
        let descriptor = builtin_descriptors().remove(0);
        let request = manager.begin_instantiate(&descriptor);

        let event = manager.try_next_event().unwrap();
        assert_eq!(event.request, request);
        assert!(event.outcome.is_ok());
        assert!(manager.try_next_event().is_none());
    }

    #[test]
    fn queued_failure_carries_a_message_not_a_panic() {
        let mut manager = FormatManager::with_default_formats();
        let request = manager.begin_instantiate(&foreign_descriptor());
        let event = manager.try_next_event().unwrap();
        assert_eq!(event.request, request);
        match event.outcome {
            Err(message) => assert!(message.contains("no installed format")),
            Ok(_) => panic!("expected a failure outcome"),
        }
    }

    #[test]
    fn request_ids_are_unique_per_manager() {
        let mut manager = FormatManager::with_default_formats();
        let descriptor = builtin_descriptors().remove(0);
        let first = manager.begin_instantiate(&descriptor);
        let second = manager.begin_instantiate(&descriptor);
        assert_ne!(first, second);
    }
}
