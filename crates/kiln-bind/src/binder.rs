// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The binder implementation.

use kiln_ast::{Ident, Node, NodeId, NodeKind, NodeList, Program, Range};
use kiln_diagnostics::{suggestions, Log, ToDiagnostic};

use crate::error::BindError;
use crate::scope::{Binding, ScopeStack};
use crate::BindSummary;

/// An enclosing construct that `return`, `break` and `continue` target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Function(NodeId),
    Closure(NodeId),
    Loop(NodeId),
}

pub struct Binder<'l> {
    log: &'l mut dyn Log,
    scopes: ScopeStack,
    contexts: Vec<Context>,
    resolved: usize,
    errors: usize,
}

impl<'l> Binder<'l> {
    pub fn new(log: &'l mut dyn Log) -> Self {
        Self { log, scopes: ScopeStack::new(), contexts: Vec::new(), resolved: 0, errors: 0 }
    }

    /// Bind every item of `program` inside a single root scope.
    pub fn bind_program(mut self, program: &mut Program) -> BindSummary {
        self.scopes.push();
        self.bind_list(&mut program.items);
        self.scopes.pop();

        let summary = BindSummary {
            scopes_opened: self.scopes.opened,
            scopes_closed: self.scopes.closed,
            frames_allocated: self.scopes.frames_allocated(),
            max_depth: self.scopes.max_depth,
            resolved: self.resolved,
            errors: self.errors,
        };
        log::debug!(
            "bound {} references, {} scopes opened, {} frames, max depth {}",
            summary.resolved,
            summary.scopes_opened,
            summary.frames_allocated,
            summary.max_depth
        );
        summary
    }

    fn report(&mut self, error: BindError) {
        self.errors += 1;
        self.log.log(error.to_diagnostic());
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    fn declare(&mut self, name: &Ident, decl: NodeId) {
        let binding = Binding { decl, range: name.range };
        if let Err(first) = self.scopes.define(&name.text, binding) {
            self.report(BindError::redefinition(name.text.clone(), name.range, first.range));
        }
    }

    /// Declare the names a list makes visible before any of its items run:
    /// functions and types, which may be used ahead of their definition.
    fn hoist(&mut self, node: &Node) {
        let name = match &node.kind {
            NodeKind::FunctionDeclaration(d) => &d.name,
            NodeKind::Struct(d) => &d.name,
            NodeKind::Enum(d) => &d.name,
            NodeKind::Union(d) => &d.name,
            NodeKind::TypeAlias(d) => &d.name,
            _ => return,
        };
        self.declare(name, node.id);
    }

    fn bind_list(&mut self, list: &mut NodeList) {
        for item in list.iter() {
            self.hoist(item);
        }
        for item in list.iter_mut() {
            self.bind_node(item);
        }
    }

    fn bind_all(&mut self, list: &mut NodeList) {
        for node in list.iter_mut() {
            self.bind_node(node);
        }
    }

    /// Attribute names are not declared anywhere; only arguments are bound,
    /// so `@[align(N)]` resolves `N` but not `align`.
    fn bind_attributes(&mut self, attributes: &mut NodeList) {
        for attribute in attributes.iter_mut() {
            if let NodeKind::Call { callee, args } = &mut attribute.kind {
                if matches!(callee.kind, NodeKind::Identifier { .. }) {
                    self.bind_all(args);
                    continue;
                }
            }
            if !matches!(attribute.kind, NodeKind::Identifier { .. }) {
                self.bind_node(attribute);
            }
        }
    }

    fn bind_opt(&mut self, node: &mut Option<Box<Node>>) {
        if let Some(node) = node {
            self.bind_node(node);
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    fn resolve(&mut self, name: &str, range: Option<Range>) -> Option<NodeId> {
        match self.scopes.lookup(name) {
            Some(binding) => {
                self.resolved += 1;
                Some(binding.decl)
            }
            None => {
                let suggestion = suggestions::did_you_mean(name, self.scopes.visible_names());
                self.report(BindError::undefined(name.to_string(), suggestion, range));
                None
            }
        }
    }

    fn enclosing_function(&self) -> Option<NodeId> {
        self.contexts.iter().rev().find_map(|context| match context {
            Context::Function(id) | Context::Closure(id) => Some(*id),
            Context::Loop(_) => None,
        })
    }

    /// Nearest loop inside the current function or closure.
    fn enclosing_loop(&self) -> Option<NodeId> {
        for context in self.contexts.iter().rev() {
            match context {
                Context::Loop(id) => return Some(*id),
                Context::Function(_) | Context::Closure(_) => return None,
            }
        }
        None
    }

    fn in_context<T>(&mut self, context: Context, f: impl FnOnce(&mut Self) -> T) -> T {
        self.contexts.push(context);
        let result = f(self);
        self.contexts.pop();
        result
    }

    fn in_scope<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        self.scopes.push();
        let result = f(self);
        self.scopes.pop();
        result
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    fn bind_node(&mut self, node: &mut Node) {
        let id = node.id;
        let range = node.range;

        match &mut node.kind {
            NodeKind::Identifier { name } => {
                node.resolved = self.resolve(name, range);
                return;
            }
            NodeKind::TypeReference { path, args } => {
                if let Some(head) = path.first() {
                    node.resolved = self.resolve(&head.text, head.range.or(range));
                }
                self.bind_all(args);
                return;
            }
            // Member names and leading-dot shorthands depend on types.
            NodeKind::Member { target, .. } => {
                self.bind_node(target);
                return;
            }
            NodeKind::Dot { .. } => return,
            // A bare macro name is not a declaration in any scope.
            NodeKind::MacroCall { target, args } => {
                if !matches!(target.kind, NodeKind::Identifier { .. }) {
                    self.bind_node(target);
                }
                if let Some(args) = args {
                    self.bind_all(args);
                }
                return;
            }

            NodeKind::Return { value } => {
                node.resolved = self.enclosing_function();
                if node.resolved.is_none() {
                    self.report(BindError::return_outside_function(range));
                }
                self.bind_opt(value);
                return;
            }
            NodeKind::Break => {
                node.resolved = self.enclosing_loop();
                if node.resolved.is_none() {
                    self.report(BindError::break_outside_loop(range));
                }
                return;
            }
            NodeKind::Continue => {
                node.resolved = self.enclosing_loop();
                if node.resolved.is_none() {
                    self.report(BindError::continue_outside_loop(range));
                }
                return;
            }

            NodeKind::VariableDeclaration(d) => {
                self.bind_attributes(&mut d.attributes);
                self.bind_opt(&mut d.ty);
                self.bind_opt(&mut d.init);
                for name in &d.names {
                    self.declare(name, id);
                }
                return;
            }
            NodeKind::FunctionDeclaration(d) => {
                self.bind_attributes(&mut d.attributes);
                self.in_scope(|b| {
                    b.bind_all(&mut d.generics);
                    b.bind_node(&mut d.signature);
                    b.in_context(Context::Function(id), |b| b.bind_opt(&mut d.body));
                });
                return;
            }
            NodeKind::Closure { signature, body, .. } => {
                self.in_scope(|b| {
                    b.bind_node(signature);
                    b.in_context(Context::Closure(id), |b| b.bind_node(body));
                });
                return;
            }
            NodeKind::Parameter { name, ty, default } => {
                self.bind_opt(ty);
                self.bind_opt(default);
                self.declare(name, id);
                return;
            }
            NodeKind::GenericParameter { name, constraints } => {
                self.bind_all(constraints);
                self.declare(name, id);
                return;
            }
            NodeKind::Struct(d) => {
                self.bind_attributes(&mut d.attributes);
                self.in_scope(|b| {
                    b.bind_all(&mut d.generics);
                    b.bind_list(&mut d.members);
                });
                return;
            }
            NodeKind::StructField { attributes, name, ty, default, .. } => {
                self.bind_attributes(attributes);
                self.bind_node(ty);
                self.bind_opt(default);
                self.declare(name, id);
                return;
            }
            NodeKind::Enum(d) => {
                self.bind_attributes(&mut d.attributes);
                self.bind_opt(&mut d.base);
                self.in_scope(|b| b.bind_all(&mut d.options));
                return;
            }
            NodeKind::EnumOption { attributes, name, value } => {
                self.bind_attributes(attributes);
                self.bind_opt(value);
                self.declare(name, id);
                return;
            }
            NodeKind::TypeAlias(d) => {
                self.bind_attributes(&mut d.attributes);
                self.in_scope(|b| {
                    b.bind_all(&mut d.generics);
                    b.bind_node(&mut d.ty);
                });
                return;
            }
            NodeKind::Union(d) => {
                self.bind_attributes(&mut d.attributes);
                self.in_scope(|b| {
                    b.bind_all(&mut d.generics);
                    b.bind_all(&mut d.members);
                });
                return;
            }

            NodeKind::Block { statements } => {
                self.in_scope(|b| b.bind_list(statements));
                return;
            }
            NodeKind::If { condition, then_branch, else_branch } => {
                // A binding condition is visible in both branches.
                let binds = matches!(condition.kind, NodeKind::VariableDeclaration(_));
                let mut bind_if = |b: &mut Self| {
                    b.bind_node(condition);
                    b.bind_node(then_branch);
                    b.bind_opt(else_branch);
                };
                if binds {
                    self.in_scope(bind_if);
                } else {
                    bind_if(self);
                }
                return;
            }
            NodeKind::While { condition, body } => {
                let binds = matches!(condition.kind, NodeKind::VariableDeclaration(_));
                let mut bind_while = |b: &mut Self| {
                    b.bind_node(condition);
                    b.in_context(Context::Loop(id), |b| b.bind_node(body));
                };
                if binds {
                    self.in_scope(bind_while);
                } else {
                    bind_while(self);
                }
                return;
            }
            NodeKind::For { init, condition, step, body } => {
                self.in_scope(|b| {
                    b.bind_opt(init);
                    b.in_context(Context::Loop(id), |b| {
                        b.bind_opt(condition);
                        b.bind_opt(step);
                        b.bind_node(body);
                    });
                });
                return;
            }
            // `defer func f() {}` still declares `f`.
            NodeKind::Defer { stmt } => {
                self.hoist(stmt);
                self.bind_node(stmt);
                return;
            }
            _ => {}
        }

        node.for_each_child_mut(|child| self.bind_node(child));
    }
}
