// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The AST node model.
//!
//! Every expression, statement, declaration and type expression is a
//! [`Node`] whose shape is one [`NodeKind`] variant. Nodes own their
//! children, so `clone()` is a full structural copy that shares nothing with
//! the original.

use crate::decl::{EnumDecl, FunctionDecl, StructDecl, TypeAliasDecl, UnionDecl, VariableDecl};
use crate::token::TokenKind;
use crate::{Range, SourceId};

/// Unique identifier for AST nodes.
///
/// Used by the binder to record which declaration a use site refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const DUMMY: NodeId = NodeId(u32::MAX);
}

/// A name as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub text: String,
    pub range: Option<Range>,
}

impl Ident {
    pub fn new(text: impl Into<String>, range: Option<Range>) -> Self {
        Self { text: text.into(), range }
    }
}

/// A node in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub range: Option<Range>,
    /// Declaration this node refers to. Written only by the binder.
    pub resolved: Option<NodeId>,
}

/// The shape of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // ------------------------------------------------------------------
    // Literals
    // ------------------------------------------------------------------
    Boolean(bool),
    Integer(u64),
    Float(f64),
    Char(char),
    String(String),
    Null,
    /// Interpolated string; `String` nodes for text segments interleaved
    /// with embedded expressions.
    StringExpression { parts: NodeList },

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------
    Identifier { name: String },
    Grouping { expr: Box<Node> },
    Prefix { op: TokenKind, operand: Box<Node> },
    Postfix { op: TokenKind, operand: Box<Node> },
    Binary { op: TokenKind, lhs: Box<Node>, rhs: Box<Node> },
    /// `c ? t : f`, or the Elvis form `c ?: f` with no `when_true`.
    Ternary { condition: Box<Node>, when_true: Option<Box<Node>>, when_false: Box<Node> },
    Assignment { op: TokenKind, target: Box<Node>, value: Box<Node> },
    Call { callee: Box<Node>, args: NodeList },
    /// `name!` or `name!(args)`.
    MacroCall { target: Box<Node>, args: Option<NodeList> },
    Spread { expr: Box<Node> },
    Yield { value: Option<Box<Node>> },
    New { ty: Box<Node>, args: NodeList },
    /// `target[args]`: indexing or generic instantiation, decided later.
    Index { target: Box<Node>, args: NodeList },
    /// Leading-dot shorthand `.name`, typed by context.
    Dot { name: Ident },
    /// `target.member` / `target?.member`; the member is an identifier or
    /// an integer tuple index and is never bound.
    Member { target: Box<Node>, member: Box<Node>, optional: bool },
    Tuple { elements: NodeList },
    StructLiteral { path: Box<Node>, fields: NodeList },
    StructLiteralField { name: Ident, value: Box<Node> },
    ArrayLiteral { elements: NodeList },
    /// `expr as Type`.
    Typed { expr: Box<Node>, ty: Box<Node> },
    Closure { is_async: bool, signature: Box<Node>, body: Box<Node> },
    CallSignature { params: NodeList, return_type: Option<Box<Node>> },
    Parameter { name: Ident, ty: Option<Box<Node>>, default: Option<Box<Node>> },

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------
    VariableDeclaration(Box<VariableDecl>),
    FunctionDeclaration(Box<FunctionDecl>),
    TypeAlias(Box<TypeAliasDecl>),
    Union(Box<UnionDecl>),
    Enum(Box<EnumDecl>),
    EnumOption { attributes: NodeList, name: Ident, value: Option<Box<Node>> },
    Struct(Box<StructDecl>),
    StructField {
        attributes: NodeList,
        is_private: bool,
        name: Ident,
        ty: Box<Node>,
        default: Option<Box<Node>>,
    },
    /// `T: A | B` in a generic parameter list.
    GenericParameter { name: Ident, constraints: NodeList },

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------
    ExpressionStatement { expr: Box<Node> },
    Block { statements: NodeList },
    /// The condition may be a `VariableDeclaration` binding.
    If { condition: Box<Node>, then_branch: Box<Node>, else_branch: Option<Box<Node>> },
    While { condition: Box<Node>, body: Box<Node> },
    For {
        init: Option<Box<Node>>,
        condition: Option<Box<Node>>,
        step: Option<Box<Node>>,
        body: Box<Node>,
    },
    Defer { stmt: Box<Node> },
    Return { value: Option<Box<Node>> },
    Continue,
    Break,

    // ------------------------------------------------------------------
    // Type expressions
    // ------------------------------------------------------------------
    PrimitiveType(TokenKind),
    /// Dotted path with optional generic arguments: `a.b.C[T]`.
    TypeReference { path: Vec<Ident>, args: NodeList },
    TupleType { elements: NodeList },
    ArrayType { element: Box<Node>, size: Option<Box<Node>> },
    FunctionType { params: NodeList, return_type: Option<Box<Node>> },
    PointerType { is_const: bool, pointee: Box<Node> },
    OptionalType { inner: Box<Node> },
}

/// Discriminant of [`NodeKind`], one entry per shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeTag {
    Boolean,
    Integer,
    Float,
    Char,
    String,
    Null,
    StringExpression,
    Identifier,
    Grouping,
    Prefix,
    Postfix,
    Binary,
    Ternary,
    Assignment,
    Call,
    MacroCall,
    Spread,
    Yield,
    New,
    Index,
    Dot,
    Member,
    Tuple,
    StructLiteral,
    StructLiteralField,
    ArrayLiteral,
    Typed,
    Closure,
    CallSignature,
    Parameter,
    VariableDeclaration,
    FunctionDeclaration,
    TypeAlias,
    Union,
    Enum,
    EnumOption,
    Struct,
    StructField,
    GenericParameter,
    ExpressionStatement,
    Block,
    If,
    While,
    For,
    Defer,
    Return,
    Continue,
    Break,
    PrimitiveType,
    TypeReference,
    TupleType,
    ArrayType,
    FunctionType,
    PointerType,
    OptionalType,
}

impl NodeTag {
    pub fn name(self) -> &'static str {
        match self {
            NodeTag::Boolean => "bool",
            NodeTag::Integer => "int",
            NodeTag::Float => "float",
            NodeTag::Char => "char",
            NodeTag::String => "str",
            NodeTag::Null => "null",
            NodeTag::StringExpression => "strexpr",
            NodeTag::Identifier => "ident",
            NodeTag::Grouping => "group",
            NodeTag::Prefix => "prefix",
            NodeTag::Postfix => "postfix",
            NodeTag::Binary => "binary",
            NodeTag::Ternary => "ternary",
            NodeTag::Assignment => "assign",
            NodeTag::Call => "call",
            NodeTag::MacroCall => "macro",
            NodeTag::Spread => "spread",
            NodeTag::Yield => "yield",
            NodeTag::New => "new",
            NodeTag::Index => "index",
            NodeTag::Dot => "dot",
            NodeTag::Member => "member",
            NodeTag::Tuple => "tuple",
            NodeTag::StructLiteral => "struct-lit",
            NodeTag::StructLiteralField => "field-init",
            NodeTag::ArrayLiteral => "array",
            NodeTag::Typed => "as",
            NodeTag::Closure => "closure",
            NodeTag::CallSignature => "sig",
            NodeTag::Parameter => "param",
            NodeTag::VariableDeclaration => "var",
            NodeTag::FunctionDeclaration => "func",
            NodeTag::TypeAlias => "alias",
            NodeTag::Union => "union",
            NodeTag::Enum => "enum",
            NodeTag::EnumOption => "option",
            NodeTag::Struct => "struct",
            NodeTag::StructField => "field",
            NodeTag::GenericParameter => "generic",
            NodeTag::ExpressionStatement => "expr-stmt",
            NodeTag::Block => "block",
            NodeTag::If => "if",
            NodeTag::While => "while",
            NodeTag::For => "for",
            NodeTag::Defer => "defer",
            NodeTag::Return => "return",
            NodeTag::Continue => "continue",
            NodeTag::Break => "break",
            NodeTag::PrimitiveType => "prim",
            NodeTag::TypeReference => "type",
            NodeTag::TupleType => "tuple-type",
            NodeTag::ArrayType => "array-type",
            NodeTag::FunctionType => "func-type",
            NodeTag::PointerType => "ptr",
            NodeTag::OptionalType => "optional",
        }
    }
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind, range: Option<Range>) -> Self {
        Self { id, kind, range, resolved: None }
    }

    pub fn tag(&self) -> NodeTag {
        match &self.kind {
            NodeKind::Boolean(_) => NodeTag::Boolean,
            NodeKind::Integer(_) => NodeTag::Integer,
            NodeKind::Float(_) => NodeTag::Float,
            NodeKind::Char(_) => NodeTag::Char,
            NodeKind::String(_) => NodeTag::String,
            NodeKind::Null => NodeTag::Null,
            NodeKind::StringExpression { .. } => NodeTag::StringExpression,
            NodeKind::Identifier { .. } => NodeTag::Identifier,
            NodeKind::Grouping { .. } => NodeTag::Grouping,
            NodeKind::Prefix { .. } => NodeTag::Prefix,
            NodeKind::Postfix { .. } => NodeTag::Postfix,
            NodeKind::Binary { .. } => NodeTag::Binary,
            NodeKind::Ternary { .. } => NodeTag::Ternary,
            NodeKind::Assignment { .. } => NodeTag::Assignment,
            NodeKind::Call { .. } => NodeTag::Call,
            NodeKind::MacroCall { .. } => NodeTag::MacroCall,
            NodeKind::Spread { .. } => NodeTag::Spread,
            NodeKind::Yield { .. } => NodeTag::Yield,
            NodeKind::New { .. } => NodeTag::New,
            NodeKind::Index { .. } => NodeTag::Index,
            NodeKind::Dot { .. } => NodeTag::Dot,
            NodeKind::Member { .. } => NodeTag::Member,
            NodeKind::Tuple { .. } => NodeTag::Tuple,
            NodeKind::StructLiteral { .. } => NodeTag::StructLiteral,
            NodeKind::StructLiteralField { .. } => NodeTag::StructLiteralField,
            NodeKind::ArrayLiteral { .. } => NodeTag::ArrayLiteral,
            NodeKind::Typed { .. } => NodeTag::Typed,
            NodeKind::Closure { .. } => NodeTag::Closure,
            NodeKind::CallSignature { .. } => NodeTag::CallSignature,
            NodeKind::Parameter { .. } => NodeTag::Parameter,
            NodeKind::VariableDeclaration(_) => NodeTag::VariableDeclaration,
            NodeKind::FunctionDeclaration(_) => NodeTag::FunctionDeclaration,
            NodeKind::TypeAlias(_) => NodeTag::TypeAlias,
            NodeKind::Union(_) => NodeTag::Union,
            NodeKind::Enum(_) => NodeTag::Enum,
            NodeKind::EnumOption { .. } => NodeTag::EnumOption,
            NodeKind::Struct(_) => NodeTag::Struct,
            NodeKind::StructField { .. } => NodeTag::StructField,
            NodeKind::GenericParameter { .. } => NodeTag::GenericParameter,
            NodeKind::ExpressionStatement { .. } => NodeTag::ExpressionStatement,
            NodeKind::Block { .. } => NodeTag::Block,
            NodeKind::If { .. } => NodeTag::If,
            NodeKind::While { .. } => NodeTag::While,
            NodeKind::For { .. } => NodeTag::For,
            NodeKind::Defer { .. } => NodeTag::Defer,
            NodeKind::Return { .. } => NodeTag::Return,
            NodeKind::Continue => NodeTag::Continue,
            NodeKind::Break => NodeTag::Break,
            NodeKind::PrimitiveType(_) => NodeTag::PrimitiveType,
            NodeKind::TypeReference { .. } => NodeTag::TypeReference,
            NodeKind::TupleType { .. } => NodeTag::TupleType,
            NodeKind::ArrayType { .. } => NodeTag::ArrayType,
            NodeKind::FunctionType { .. } => NodeTag::FunctionType,
            NodeKind::PointerType { .. } => NodeTag::PointerType,
            NodeKind::OptionalType { .. } => NodeTag::OptionalType,
        }
    }

    /// Name introduced by a declaration node, if any.
    ///
    /// Tuple-destructuring variables introduce several names; this returns
    /// the first.
    pub fn declared_name(&self) -> Option<&Ident> {
        match &self.kind {
            NodeKind::VariableDeclaration(d) => d.names.first(),
            NodeKind::FunctionDeclaration(d) => Some(&d.name),
            NodeKind::TypeAlias(d) => Some(&d.name),
            NodeKind::Union(d) => Some(&d.name),
            NodeKind::Enum(d) => Some(&d.name),
            NodeKind::Struct(d) => Some(&d.name),
            NodeKind::EnumOption { name, .. }
            | NodeKind::StructField { name, .. }
            | NodeKind::GenericParameter { name, .. }
            | NodeKind::Parameter { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Call `f` on every direct child, in source order.
    pub fn for_each_child<'a>(&'a self, mut f: impl FnMut(&'a Node)) {
        match &self.kind {
            NodeKind::Boolean(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::Char(_)
            | NodeKind::String(_)
            | NodeKind::Null
            | NodeKind::Identifier { .. }
            | NodeKind::Dot { .. }
            | NodeKind::Continue
            | NodeKind::Break
            | NodeKind::PrimitiveType(_) => {}

            NodeKind::StringExpression { parts: list }
            | NodeKind::Tuple { elements: list }
            | NodeKind::ArrayLiteral { elements: list }
            | NodeKind::Block { statements: list }
            | NodeKind::TupleType { elements: list } => list.iter().for_each(f),

            NodeKind::Grouping { expr: inner }
            | NodeKind::Prefix { operand: inner, .. }
            | NodeKind::Postfix { operand: inner, .. }
            | NodeKind::Spread { expr: inner }
            | NodeKind::StructLiteralField { value: inner, .. }
            | NodeKind::ExpressionStatement { expr: inner }
            | NodeKind::Defer { stmt: inner }
            | NodeKind::PointerType { pointee: inner, .. }
            | NodeKind::OptionalType { inner } => f(inner),

            NodeKind::Yield { value } | NodeKind::Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }

            NodeKind::Binary { lhs: a, rhs: b, .. }
            | NodeKind::Assignment { target: a, value: b, .. }
            | NodeKind::Member { target: a, member: b, .. }
            | NodeKind::Typed { expr: a, ty: b }
            | NodeKind::Closure { signature: a, body: b, .. }
            | NodeKind::While { condition: a, body: b } => {
                f(a);
                f(b);
            }

            NodeKind::Ternary { condition, when_true, when_false } => {
                f(condition);
                if let Some(t) = when_true {
                    f(t);
                }
                f(when_false);
            }

            NodeKind::Call { callee: head, args: list }
            | NodeKind::New { ty: head, args: list }
            | NodeKind::Index { target: head, args: list }
            | NodeKind::StructLiteral { path: head, fields: list } => {
                f(head);
                list.iter().for_each(f);
            }

            NodeKind::MacroCall { target, args } => {
                f(target);
                if let Some(args) = args {
                    args.iter().for_each(f);
                }
            }

            NodeKind::CallSignature { params, return_type }
            | NodeKind::FunctionType { params, return_type } => {
                params.iter().for_each(&mut f);
                if let Some(r) = return_type {
                    f(r);
                }
            }

            NodeKind::Parameter { ty, default, .. } => {
                if let Some(t) = ty {
                    f(t);
                }
                if let Some(d) = default {
                    f(d);
                }
            }

            NodeKind::VariableDeclaration(d) => {
                d.attributes.iter().for_each(&mut f);
                if let Some(t) = &d.ty {
                    f(t);
                }
                if let Some(i) = &d.init {
                    f(i);
                }
            }
            NodeKind::FunctionDeclaration(d) => {
                d.attributes.iter().for_each(&mut f);
                d.generics.iter().for_each(&mut f);
                f(&d.signature);
                if let Some(b) = &d.body {
                    f(b);
                }
            }
            NodeKind::TypeAlias(d) => {
                d.attributes.iter().for_each(&mut f);
                d.generics.iter().for_each(&mut f);
                f(&d.ty);
            }
            NodeKind::Union(d) => {
                d.attributes.iter().for_each(&mut f);
                d.generics.iter().for_each(&mut f);
                d.members.iter().for_each(f);
            }
            NodeKind::Enum(d) => {
                d.attributes.iter().for_each(&mut f);
                if let Some(b) = &d.base {
                    f(b);
                }
                d.options.iter().for_each(f);
            }
            NodeKind::EnumOption { attributes, value, .. } => {
                attributes.iter().for_each(&mut f);
                if let Some(v) = value {
                    f(v);
                }
            }
            NodeKind::Struct(d) => {
                d.attributes.iter().for_each(&mut f);
                d.generics.iter().for_each(&mut f);
                d.members.iter().for_each(f);
            }
            NodeKind::StructField { attributes, ty, default, .. } => {
                attributes.iter().for_each(&mut f);
                f(ty);
                if let Some(d) = default {
                    f(d);
                }
            }
            NodeKind::GenericParameter { constraints, .. } => constraints.iter().for_each(f),

            NodeKind::If { condition, then_branch, else_branch } => {
                f(condition);
                f(then_branch);
                if let Some(e) = else_branch {
                    f(e);
                }
            }
            NodeKind::For { init, condition, step, body } => {
                for part in [init, condition, step].into_iter().flatten() {
                    f(part);
                }
                f(body);
            }

            NodeKind::TypeReference { args, .. } => args.iter().for_each(f),
            NodeKind::ArrayType { element, size } => {
                f(element);
                if let Some(s) = size {
                    f(s);
                }
            }
        }
    }

    /// Mutable counterpart of [`Node::for_each_child`].
    pub fn for_each_child_mut(&mut self, mut f: impl FnMut(&mut Node)) {
        match &mut self.kind {
            NodeKind::Boolean(_)
            | NodeKind::Integer(_)
            | NodeKind::Float(_)
            | NodeKind::Char(_)
            | NodeKind::String(_)
            | NodeKind::Null
            | NodeKind::Identifier { .. }
            | NodeKind::Dot { .. }
            | NodeKind::Continue
            | NodeKind::Break
            | NodeKind::PrimitiveType(_) => {}

            NodeKind::StringExpression { parts: list }
            | NodeKind::Tuple { elements: list }
            | NodeKind::ArrayLiteral { elements: list }
            | NodeKind::Block { statements: list }
            | NodeKind::TupleType { elements: list } => list.iter_mut().for_each(f),

            NodeKind::Grouping { expr: inner }
            | NodeKind::Prefix { operand: inner, .. }
            | NodeKind::Postfix { operand: inner, .. }
            | NodeKind::Spread { expr: inner }
            | NodeKind::StructLiteralField { value: inner, .. }
            | NodeKind::ExpressionStatement { expr: inner }
            | NodeKind::Defer { stmt: inner }
            | NodeKind::PointerType { pointee: inner, .. }
            | NodeKind::OptionalType { inner } => f(inner),

            NodeKind::Yield { value } | NodeKind::Return { value } => {
                if let Some(v) = value {
                    f(v);
                }
            }

            NodeKind::Binary { lhs: a, rhs: b, .. }
            | NodeKind::Assignment { target: a, value: b, .. }
            | NodeKind::Member { target: a, member: b, .. }
            | NodeKind::Typed { expr: a, ty: b }
            | NodeKind::Closure { signature: a, body: b, .. }
            | NodeKind::While { condition: a, body: b } => {
                f(a);
                f(b);
            }

            NodeKind::Ternary { condition, when_true, when_false } => {
                f(condition);
                if let Some(t) = when_true {
                    f(t);
                }
                f(when_false);
            }

            NodeKind::Call { callee: head, args: list }
            | NodeKind::New { ty: head, args: list }
            | NodeKind::Index { target: head, args: list }
            | NodeKind::StructLiteral { path: head, fields: list } => {
                f(head);
                list.iter_mut().for_each(f);
            }

            NodeKind::MacroCall { target, args } => {
                f(target);
                if let Some(args) = args {
                    args.iter_mut().for_each(f);
                }
            }

            NodeKind::CallSignature { params, return_type }
            | NodeKind::FunctionType { params, return_type } => {
                params.iter_mut().for_each(&mut f);
                if let Some(r) = return_type {
                    f(r);
                }
            }

            NodeKind::Parameter { ty, default, .. } => {
                if let Some(t) = ty {
                    f(t);
                }
                if let Some(d) = default {
                    f(d);
                }
            }

            NodeKind::VariableDeclaration(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                if let Some(t) = &mut d.ty {
                    f(t);
                }
                if let Some(i) = &mut d.init {
                    f(i);
                }
            }
            NodeKind::FunctionDeclaration(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                d.generics.iter_mut().for_each(&mut f);
                f(&mut d.signature);
                if let Some(b) = &mut d.body {
                    f(b);
                }
            }
            NodeKind::TypeAlias(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                d.generics.iter_mut().for_each(&mut f);
                f(&mut d.ty);
            }
            NodeKind::Union(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                d.generics.iter_mut().for_each(&mut f);
                d.members.iter_mut().for_each(f);
            }
            NodeKind::Enum(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                if let Some(b) = &mut d.base {
                    f(b);
                }
                d.options.iter_mut().for_each(f);
            }
            NodeKind::EnumOption { attributes, value, .. } => {
                attributes.iter_mut().for_each(&mut f);
                if let Some(v) = value {
                    f(v);
                }
            }
            NodeKind::Struct(d) => {
                d.attributes.iter_mut().for_each(&mut f);
                d.generics.iter_mut().for_each(&mut f);
                d.members.iter_mut().for_each(f);
            }
            NodeKind::StructField { attributes, ty, default, .. } => {
                attributes.iter_mut().for_each(&mut f);
                f(ty);
                if let Some(d) = default {
                    f(d);
                }
            }
            NodeKind::GenericParameter { constraints, .. } => constraints.iter_mut().for_each(f),

            NodeKind::If { condition, then_branch, else_branch } => {
                f(condition);
                f(then_branch);
                if let Some(e) = else_branch {
                    f(e);
                }
            }
            NodeKind::For { init, condition, step, body } => {
                for part in [init, condition, step].into_iter().flatten() {
                    f(part);
                }
                f(body);
            }

            NodeKind::TypeReference { args, .. } => args.iter_mut().for_each(f),
            NodeKind::ArrayType { element, size } => {
                f(element);
                if let Some(s) = size {
                    f(s);
                }
            }
        }
    }

    /// Depth-first search for the node with `id` in this subtree.
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        if self.id == id {
            return Some(self);
        }
        let mut found = None;
        self.for_each_child(|child| {
            if found.is_none() {
                found = child.find(id);
            }
        });
        found
    }
}

/// An ordered sequence of sibling nodes.
///
/// Append-only with a running count; no random access or removal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeList {
    nodes: Vec<Node>,
}

impl NodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: Node) {
        self.nodes.push(node);
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Node> {
        self.nodes.iter_mut()
    }
}

impl FromIterator<Node> for NodeList {
    fn from_iter<I: IntoIterator<Item = Node>>(iter: I) -> Self {
        Self { nodes: iter.into_iter().collect() }
    }
}

impl IntoIterator for NodeList {
    type Item = Node;
    type IntoIter = std::vec::IntoIter<Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.into_iter()
    }
}

impl<'a> IntoIterator for &'a NodeList {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}

impl<'a> IntoIterator for &'a mut NodeList {
    type Item = &'a mut Node;
    type IntoIter = std::slice::IterMut<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter_mut()
    }
}

/// A parsed source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Program {
    pub source: SourceId,
    /// Top-level statements and declarations.
    pub items: NodeList,
    /// Number of node ids handed out while parsing.
    pub node_count: u32,
}

impl Program {
    pub fn find(&self, id: NodeId) -> Option<&Node> {
        self.items.iter().find_map(|item| item.find(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(id: u32, kind: NodeKind) -> Node {
        Node::new(NodeId(id), kind, None)
    }

    fn ident(id: u32, name: &str) -> Node {
        leaf(id, NodeKind::Identifier { name: name.to_string() })
    }

    fn sample() -> Node {
        let call = leaf(
            2,
            NodeKind::Call {
                callee: Box::new(ident(0, "f")),
                args: [ident(1, "x")].into_iter().collect(),
            },
        );
        leaf(
            4,
            NodeKind::Binary {
                op: TokenKind::Plus,
                lhs: Box::new(call),
                rhs: Box::new(leaf(3, NodeKind::Integer(1))),
            },
        )
    }

    #[test]
    fn node_list_preserves_order() {
        let mut list = NodeList::new();
        for i in 0..5 {
            list.push(leaf(i, NodeKind::Integer(i as u64)));
        }
        assert_eq!(list.len(), 5);
        let ids: Vec<u32> = list.iter().map(|n| n.id.0).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn clone_is_deep() {
        let original = sample();
        let mut copy = original.clone();
        copy.for_each_child_mut(|child| {
            child.resolved = Some(NodeId(99));
            child.for_each_child_mut(|grandchild| grandchild.range = None);
        });
        if let NodeKind::Binary { lhs, .. } = &mut copy.kind {
            if let NodeKind::Call { args, .. } = &mut lhs.kind {
                args.push(ident(7, "y"));
            }
        }

        assert_ne!(original, copy);
        match &original.kind {
            NodeKind::Binary { lhs, .. } => {
                assert_eq!(lhs.resolved, None);
                match &lhs.kind {
                    NodeKind::Call { args, .. } => assert_eq!(args.len(), 1),
                    other => panic!("expected call, got {:?}", other),
                }
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn children_in_source_order() {
        let node = sample();
        let mut tags = Vec::new();
        node.for_each_child(|c| tags.push(c.tag()));
        assert_eq!(tags, vec![NodeTag::Call, NodeTag::Integer]);
    }

    #[test]
    fn find_descends() {
        let node = sample();
        assert_eq!(node.find(NodeId(1)).map(|n| n.tag()), Some(NodeTag::Identifier));
        assert!(node.find(NodeId(42)).is_none());
    }

    #[test]
    fn ternary_skips_missing_branch() {
        let node = leaf(
            3,
            NodeKind::Ternary {
                condition: Box::new(ident(0, "a")),
                when_true: None,
                when_false: Box::new(ident(1, "c")),
            },
        );
        let mut count = 0;
        node.for_each_child(|_| count += 1);
        assert_eq!(count, 2);
    }
}
