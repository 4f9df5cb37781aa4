pub mod outbound;

pub use outbound::{BlockReader, ReaderError, ReaderResult};
