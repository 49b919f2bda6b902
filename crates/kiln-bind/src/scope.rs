// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Scope frames for name binding.
//!
//! Frames live in a pool indexed by nesting depth. Leaving a scope only
//! lowers the depth; entering one again at the same depth clears and reuses
//! the frame that is already there, so the pool never grows past the deepest
//! nesting seen.

use std::collections::HashMap;

use kiln_ast::{NodeId, Range};

/// A declared name as recorded in a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    /// The declaring node.
    pub decl: NodeId,
    /// Range of the declared name, for redefinition labels.
    pub range: Option<Range>,
}

/// One lexical nesting level.
#[derive(Debug, Default)]
pub struct Scope {
    bindings: HashMap<String, Binding>,
    /// Names in declaration order.
    order: Vec<String>,
}

impl Scope {
    pub fn get(&self, name: &str) -> Option<Binding> {
        self.bindings.get(name).copied()
    }

    /// Declared names, earliest first.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    fn insert(&mut self, name: &str, binding: Binding) {
        self.bindings.insert(name.to_string(), binding);
        self.order.push(name.to_string());
    }

    fn clear(&mut self) {
        self.bindings.clear();
        self.order.clear();
    }
}

/// The open scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    frames: Vec<Scope>,
    depth: usize,
    pub(crate) opened: usize,
    pub(crate) closed: usize,
    pub(crate) max_depth: usize,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a scope one level deeper, reusing a pooled frame when possible.
    pub fn push(&mut self) {
        match self.frames.get_mut(self.depth) {
            Some(frame) => frame.clear(),
            None => self.frames.push(Scope::default()),
        }
        self.depth += 1;
        self.opened += 1;
        self.max_depth = self.max_depth.max(self.depth);
    }

    pub fn pop(&mut self) {
        debug_assert!(self.depth > 0, "scope stack underflow");
        self.depth = self.depth.saturating_sub(1);
        self.closed += 1;
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Frames created so far; bounded by the deepest nesting.
    pub fn frames_allocated(&self) -> usize {
        self.frames.len()
    }

    /// Record `name` in the innermost scope. A name already declared in
    /// that same scope is left bound to its first declaration, which is
    /// returned as the error.
    pub fn define(&mut self, name: &str, binding: Binding) -> Result<(), Binding> {
        let Some(frame) = self.depth.checked_sub(1).and_then(|top| self.frames.get_mut(top)) else {
            return Ok(());
        };
        if let Some(existing) = frame.get(name) {
            return Err(existing);
        }
        frame.insert(name, binding);
        Ok(())
    }

    /// Look up a name from the innermost scope outward.
    pub fn lookup(&self, name: &str) -> Option<Binding> {
        self.open_frames().rev().find_map(|frame| frame.get(name))
    }

    /// Every name visible from the innermost scope: inner scopes first, each
    /// in declaration order.
    pub fn visible_names(&self) -> impl Iterator<Item = &str> {
        self.open_frames().rev().flat_map(Scope::names)
    }

    fn open_frames(&self) -> std::slice::Iter<'_, Scope> {
        self.frames[..self.depth].iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(id: u32) -> Binding {
        Binding { decl: NodeId(id), range: None }
    }

    #[test]
    fn lookup_walks_outward() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define("x", binding(1)).unwrap();
        scopes.push();
        scopes.define("y", binding(2)).unwrap();

        assert_eq!(scopes.lookup("x"), Some(binding(1)));
        assert_eq!(scopes.lookup("y"), Some(binding(2)));

        scopes.pop();
        assert_eq!(scopes.lookup("y"), None);
    }

    #[test]
    fn inner_scope_shadows_outer() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define("x", binding(1)).unwrap();
        scopes.push();
        scopes.define("x", binding(2)).unwrap();
        assert_eq!(scopes.lookup("x"), Some(binding(2)));
    }

    #[test]
    fn redefinition_keeps_first() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define("x", binding(1)).unwrap();
        assert_eq!(scopes.define("x", binding(2)), Err(binding(1)));
        assert_eq!(scopes.lookup("x"), Some(binding(1)));
    }

    #[test]
    fn frames_are_reused_at_the_same_depth() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        for i in 0..10 {
            scopes.push();
            assert_eq!(scopes.lookup("tmp"), None);
            scopes.define("tmp", binding(i)).unwrap();
            scopes.pop();
        }
        scopes.pop();

        assert_eq!(scopes.frames_allocated(), 2);
        assert_eq!(scopes.opened, 11);
        assert_eq!(scopes.closed, 11);
        assert_eq!(scopes.max_depth, 2);
        assert_eq!(scopes.depth(), 0);
    }

    #[test]
    fn visible_names_skip_closed_frames() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        scopes.define("outer", binding(0)).unwrap();
        scopes.push();
        scopes.define("inner", binding(1)).unwrap();
        scopes.pop();

        let names: Vec<&str> = scopes.visible_names().collect();
        assert_eq!(names, vec!["outer"]);
    }

    #[test]
    fn visible_names_follow_declaration_order() {
        let mut scopes = ScopeStack::new();
        scopes.push();
        for (i, name) in ["zeta", "alpha", "mid"].into_iter().enumerate() {
            scopes.define(name, binding(i as u32)).unwrap();
        }
        scopes.push();
        scopes.define("inner", binding(9)).unwrap();

        let names: Vec<&str> = scopes.visible_names().collect();
        assert_eq!(names, vec!["inner", "zeta", "alpha", "mid"]);
    }
}
