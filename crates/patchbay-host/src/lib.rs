//! Plugin hosting layers for Patchbay.
//!
//! This crate keeps the document side of plugin hosting: descriptors resolve
//! to live [`PluginInstance`] values through registered [`PluginFormat`]
//! backends, and instantiation requests complete through an event channel so
//! graph mutation always happens on the thread that drains it. Audio and MIDI
//! processing are an external concern; instances here carry identity,
//! parameters, programs, and state.

pub mod builtin;
pub mod format;
pub mod instance;

pub use builtin::{builtin_descriptors, BuiltinFormat, BUILTIN_FORMAT};
pub use format::{FormatManager, HostError, InstantiationEvent, PluginFormat, RequestId};
pub use instance::{ParamValue, PluginInstance};
