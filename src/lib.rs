//! # ledgerfmt
//!
//! ledgerfmt decodes plain-text, line-oriented double-entry journal files
//! into a structured [`Journal`], and re-encodes that model into the same
//! canonical, column-aligned text form.
//!
//! Decoding is best-effort: malformed lines and transactions are dropped
//! and reported as [`Diagnostic`]s; only I/O failures abort a decode.

mod encode;
mod journal;
pub mod parse;
pub mod utils;

pub use journal::*;
