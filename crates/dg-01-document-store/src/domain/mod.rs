//! Domain layer: documents, query expressions and errors.

pub mod document;
pub mod errors;
