//! Domain layer: keys, record kinds, records and errors.

pub mod errors;
pub mod key;
pub mod record;
