//! # Shared Types Crate
//!
//! Entities exchanged between the Block Reader, the digestion pipeline and
//! the query layer.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: a block is described once, here, and every
//!   crate downstream of the reader consumes these types.
//! - **Height-stamped facts**: every state mutation carries the height it was
//!   produced at; nothing downstream invents heights.
//! - **Trusted input**: blocks reaching these types are final and validated;
//!   the only check performed on them is the network identifier.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
