//! Runtime environment discovery.

pub mod metadata;

pub use metadata::RuntimeMetadata;
