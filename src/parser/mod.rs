//! Parser module for building expression trees from program text.
//!
//! The checker itself consumes already-structured expressions; this reader is
//! how the CLI and the end-to-end tests produce them from source files.

pub mod parser;
