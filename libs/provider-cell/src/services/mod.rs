pub mod directory;

pub use directory::{MemoryProviderDirectory, PostgrestProviderDirectory, ProviderDirectory};
