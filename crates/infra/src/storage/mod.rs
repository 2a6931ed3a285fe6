//! Durable key-value storage implementations

pub mod file;
pub mod memory;
pub mod settings;

pub use file::FileKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use settings::SettingsStore;
