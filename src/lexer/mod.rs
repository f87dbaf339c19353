//! Lexical analysis for program text.
//!
//! This module turns source text into tokens for the reader. It handles:
//!
//! - Tokenization using an ordered table of regex patterns
//! - Parentheses, numbers, string literals, booleans and symbols
//! - Token position tracking for error reporting
//! - `//` comments and whitespace

pub mod lexer;
pub mod tokens;
