//! Adapters for the identity ports.

pub mod in_memory_directory;

pub use in_memory_directory::InMemoryUserDirectory;
