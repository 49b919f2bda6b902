// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Lexer for the Kiln language.
//!
//! Produces tokens on demand for the parser; the whole file is never
//! tokenized up front.

mod lexer;

pub use lexer::{LexError, Lexer};
