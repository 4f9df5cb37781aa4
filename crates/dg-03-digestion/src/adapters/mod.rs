//! Block reader adapters.

pub mod fs_reader;
pub mod memory;

pub use fs_reader::FsBlockReader;
pub use memory::InMemoryBlockReader;
