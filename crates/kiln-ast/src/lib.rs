// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Abstract Syntax Tree types for the Kiln language.
//!
//! This crate defines the source model, the token and grammar tables shared
//! by the lexer and parser, and the AST nodes consumed by the binder and any
//! later pass.

pub mod span;
pub mod token;
pub mod node;
pub mod decl;
pub mod visit;
pub mod dump;

pub use node::{Ident, Node, NodeId, NodeKind, NodeList, NodeTag, Program};
pub use span::{LineMap, Location, Range, Source, SourceId};
