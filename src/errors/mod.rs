//! Error types and error handling for the checker.
//!
//! This module defines the error types used by the reader and the type
//! checker. It includes:
//!
//! - Error structures carrying either a source position or the offending expression
//! - Specific error variants for reading and checking faults
//! - Error names and suggestions for display

pub mod errors;
