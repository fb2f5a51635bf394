//! The scanner/decoder pair: raw text to tokens, tokens to a [`Journal`](crate::Journal).
//!
//! The scanner is a pull-driven state machine; the decoder consumes one
//! token at a time and keeps its pending work on an explicit stack. The
//! relationship is strictly 1:1 and sequential, so no concurrency is
//! involved; dropping the decoder drops the scanner with it.

mod parser;
mod scanner;
mod token;

pub(crate) use parser::parse;
pub use token::{Token, TokenKind};
