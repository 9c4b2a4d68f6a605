//! Media storage adapters.

mod local;
mod memory;

pub use local::{LocalMediaStorage, MediaConfig};
pub use memory::InMemoryMediaStorage;
