// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Declaration payloads.
//!
//! Declarations are the larger node shapes, so they live behind a `Box` in
//! [`NodeKind`](crate::NodeKind) to keep expression nodes small.

use crate::node::{Ident, Node, NodeList};
use crate::token::TokenKind;

/// Leading `export` / `opaque` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub export: bool,
    pub opaque: bool,
}

/// `var` / `const`, including the `(a, b)` destructuring form.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub is_const: bool,
    /// One entry unless `is_tuple`.
    pub names: Vec<Ident>,
    pub is_tuple: bool,
    pub ty: Option<Box<Node>>,
    pub init: Option<Box<Node>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub is_async: bool,
    /// Declared name, or the internal `operator_*` name for overloads.
    pub name: Ident,
    /// Operator token an overload was spelled with.
    pub operator: Option<TokenKind>,
    pub generics: NodeList,
    /// A `CallSignature` node.
    pub signature: Box<Node>,
    /// Block, or a bare expression for `=> expr` bodies. `None` for prototypes.
    pub body: Option<Box<Node>>,
}

/// `type Name = T`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeAliasDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub generics: NodeList,
    pub ty: Box<Node>,
}

/// `type Name = A | B | ...` with at least two members.
#[derive(Debug, Clone, PartialEq)]
pub struct UnionDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub generics: NodeList,
    pub members: NodeList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub base: Option<Box<Node>>,
    pub options: NodeList,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StructDecl {
    pub attributes: NodeList,
    pub modifiers: Modifiers,
    pub name: Ident,
    pub generics: NodeList,
    /// Fields and nested declarations, in source order.
    pub members: NodeList,
}
