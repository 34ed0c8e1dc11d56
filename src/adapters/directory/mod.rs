//! Manager directory adapters.

mod in_memory;
mod json_file;

pub use in_memory::InMemoryManagerDirectory;
pub use json_file::JsonFileManagerDirectory;
