//! Patchbay Catalog
//! ================
//! Plugin descriptors and the persistent catalog of everything the host has
//! discovered. Descriptors are small value types that identify a loadable
//! processing unit; the catalog keeps them deduplicated, remembers files that
//! misbehaved during scanning, and round-trips through a tolerant on-disk
//! record format.

pub mod descriptor;
pub mod known;
pub mod record;
pub mod store;

pub use descriptor::PluginDescriptor;
pub use known::KnownPlugins;
pub use record::{DescriptorRecord, RecordError, PLUGIN_TAG};
pub use store::{CatalogStore, StoreError};
