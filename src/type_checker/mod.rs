//! Type checking module.
//!
//! This module assigns a type to every expression of a program or rejects it
//! with a type error. It is made of:
//!
//! - The type model and the per-session type registry (`types`)
//! - The arena of lexical scopes (`environment`)
//! - The recursive checking engine (`type_checker`)
//!
//! The engine resolves bindings through nested scopes, enforces declared types,
//! validates calls, class hierarchies and union narrowing, and instantiates
//! generic functions from explicit type arguments.

pub mod environment;
pub mod type_checker;
pub mod types;
