// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Name binding for the Kiln language.
//!
//! One pass over a parsed [`Program`] that links every identifier use, the
//! head of every named type, and every `return`/`break`/`continue` to the
//! node it refers to, through [`Node::resolved`](kiln_ast::Node). Problems
//! are reported to the diagnostic log and never stop the walk.

mod binder;
mod error;
mod scope;

pub use binder::Binder;
pub use error::{BindError, BindErrorKind};
pub use scope::{Binding, Scope, ScopeStack};

use kiln_ast::Program;
use kiln_diagnostics::Log;

/// Counters gathered while binding one program.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BindSummary {
    pub scopes_opened: usize,
    pub scopes_closed: usize,
    /// Scope frames created; frames are reused across sibling scopes.
    pub frames_allocated: usize,
    pub max_depth: usize,
    /// Name references linked to a declaration.
    pub resolved: usize,
    pub errors: usize,
}

/// Bind all names in `program` in place.
pub fn bind(log: &mut dyn Log, program: &mut Program) -> BindSummary {
    Binder::new(log).bind_program(program)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::{Node, NodeKind, NodeTag, Source};
    use kiln_diagnostics::{codes, DiagnosticLog};
    use kiln_lexer::Lexer;

    fn bind_source(src: &str) -> (Program, DiagnosticLog, BindSummary) {
        let source = Source::new("test.kn", src);
        let mut log = DiagnosticLog::new();
        let mut program = kiln_parser::parse(&mut log, Lexer::new(&source));
        assert!(!log.has_errors(), "Parse errors: {:?}", log.diagnostics());
        let summary = bind(&mut log, &mut program);
        (program, log, summary)
    }

    fn codes_of(log: &DiagnosticLog) -> Vec<&str> {
        log.diagnostics()
            .iter()
            .filter_map(|d| d.code.as_ref().map(|c| c.0.as_str()))
            .collect()
    }

    fn all_nodes(program: &Program) -> Vec<&Node> {
        fn collect<'a>(node: &'a Node, out: &mut Vec<&'a Node>) {
            out.push(node);
            node.for_each_child(|child| collect(child, out));
        }
        let mut out = Vec::new();
        for item in &program.items {
            collect(item, &mut out);
        }
        out
    }

    fn uses_of<'a>(program: &'a Program, name: &str) -> Vec<&'a Node> {
        all_nodes(program)
            .into_iter()
            .filter(|n| matches!(&n.kind, NodeKind::Identifier { name: n2 } if n2 == name))
            .collect()
    }

    fn target_tag(program: &Program, node: &Node) -> Option<NodeTag> {
        node.resolved.and_then(|id| program.find(id)).map(|n| n.tag())
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    #[test]
    fn resolves_parameters_and_locals() {
        let (program, log, summary) = bind_source("func f(a: i32) { var b = a; return b }");
        assert!(log.is_empty(), "{:?}", log.diagnostics());

        let a = uses_of(&program, "a");
        assert_eq!(target_tag(&program, a[0]), Some(NodeTag::Parameter));
        let b = uses_of(&program, "b");
        assert_eq!(target_tag(&program, b[0]), Some(NodeTag::VariableDeclaration));
        assert_eq!(summary.resolved, 2);
    }

    #[test]
    fn functions_and_types_are_hoisted() {
        let (_, log, _) = bind_source(
            "func main() { var p: Point = make() }\n\
             func make() -> Point { return Point { x: 1 } }\n\
             struct Point { x: i32 }",
        );
        assert!(log.is_empty(), "{:?}", log.diagnostics());
    }

    #[test]
    fn variables_are_not_hoisted() {
        let (_, log, _) = bind_source("func main() { x = 1; var x = 2 }");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
        assert_eq!(log.diagnostics()[0].message, "undefined identifier 'x'");
    }

    #[test]
    fn initializer_cannot_see_its_own_variable() {
        let (_, log, _) = bind_source("var n = n + 1");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
    }

    #[test]
    fn block_names_do_not_leak() {
        let (_, log, _) = bind_source("{ var y = 1 }\ny");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
    }

    #[test]
    fn loop_variable_is_scoped_to_the_loop() {
        let (_, log, _) = bind_source("func f(n: i32) { for (var i = 0; i < n; i++) {} i }");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
    }

    #[test]
    fn condition_binding_reaches_both_branches() {
        let (_, log, _) = bind_source("func f() { if const v = g() { v } else { v } v }\nfunc g() {}");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
    }

    #[test]
    fn inner_scope_may_shadow() {
        let (program, log, _) = bind_source("var x = 1\nfunc f(x: i32) { x }");
        assert!(log.is_empty());
        let x = uses_of(&program, "x");
        assert_eq!(target_tag(&program, x[0]), Some(NodeTag::Parameter));
    }

    #[test]
    fn member_names_and_dots_are_left_alone() {
        let (program, log, _) = bind_source(
            "enum Color { Red }\nvar c: Color = .Red\nvar p = c.value.0\nvar q = Color.Red",
        );
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        assert!(uses_of(&program, "value").iter().all(|n| n.resolved.is_none()));
    }

    #[test]
    fn enum_options_stay_inside_the_enum() {
        let (_, log, _) = bind_source("enum Color { Red, Green }\nvar r = Red");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
    }

    #[test]
    fn generics_resolve_inside_their_declaration() {
        let (program, log, _) = bind_source("struct Cell[T] { value: T }\ntype Pair[K] = (K, K)\nvar c: Cell[i32]");
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        let generic_refs = all_nodes(&program)
            .into_iter()
            .filter(|n| matches!(n.kind, NodeKind::TypeReference { .. }))
            .filter(|n| target_tag(&program, n) == Some(NodeTag::GenericParameter))
            .count();
        assert_eq!(generic_refs, 3);
    }

    #[test]
    fn unknown_type_is_undefined() {
        let (_, log, _) = bind_source("var m: std.Map[string, i32]");
        assert_eq!(log.diagnostics()[0].message, "undefined identifier 'std'");
    }

    #[test]
    fn suggestion_for_near_miss() {
        let (_, log, _) = bind_source("var count = 1\nvar total = cout");
        let diag = &log.diagnostics()[0];
        assert_eq!(diag.help.as_ref().map(|h| h.message.as_str()), Some("did you mean 'count'?"));
    }

    #[test]
    fn no_suggestion_for_short_names() {
        let (_, log, _) = bind_source("var a = 1\nvar z = b");
        assert_eq!(log.error_count(), 1);
        assert!(log.diagnostics()[0].help.is_none());
    }

    #[test]
    fn suggestion_ties_follow_declaration_order() {
        let (_, log, _) = bind_source("var cat = 1\nvar car = 2\nvar z = cax");
        assert_eq!(log.diagnostics()[0].help.as_ref().map(|h| h.message.as_str()), Some("did you mean 'cat'?"));

        let (_, log, _) = bind_source("var car = 2\nvar cat = 1\nvar z = cax");
        assert_eq!(log.diagnostics()[0].help.as_ref().map(|h| h.message.as_str()), Some("did you mean 'car'?"));
    }

    // =========================================================================
    // Attributes and macros
    // =========================================================================

    #[test]
    fn attribute_names_are_not_resolved() {
        let (program, log, _) = bind_source(
            "const N = 8\n\
             @[inline] func f() {}\n\
             @[packed, align(N)] struct S { @[deprecated] x: i32 }\n\
             enum E { @[default] A }",
        );
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        let n = uses_of(&program, "N");
        assert_eq!(n.len(), 1);
        assert_eq!(target_tag(&program, n[0]), Some(NodeTag::VariableDeclaration));
        assert!(uses_of(&program, "inline").iter().all(|n| n.resolved.is_none()));
    }

    #[test]
    fn attribute_arguments_are_resolved() {
        let (_, log, _) = bind_source("@[align(M)] func g() {}");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
        assert_eq!(log.diagnostics()[0].message, "undefined identifier 'M'");
    }

    #[test]
    fn macro_names_are_not_resolved() {
        let (program, log, _) = bind_source(
            "const N = 4\n\
             func f(x: i32) { assert!(x); var b: u8[size!(N)]; var c: u8[N!()] }",
        );
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        assert_eq!(target_tag(&program, uses_of(&program, "x")[0]), Some(NodeTag::Parameter));
        let n = uses_of(&program, "N");
        assert_eq!(n.iter().filter(|n| n.resolved.is_some()).count(), 1);
    }

    #[test]
    fn computed_macro_targets_are_resolved() {
        let (program, log, _) = bind_source("func f(v: i32) { v.check()! }\nfunc g() { w.check()! }");
        assert_eq!(codes_of(&log), vec![codes::UNDEFINED_IDENTIFIER]);
        assert_eq!(log.diagnostics()[0].message, "undefined identifier 'w'");
        assert_eq!(target_tag(&program, uses_of(&program, "v")[0]), Some(NodeTag::Parameter));
    }

    #[test]
    fn range_bounds_resolve_next_to_floats() {
        let (program, log, summary) = bind_source("var lo = 0.5\nvar r = lo..1.5");
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        assert_eq!(summary.resolved, 1);
        assert_eq!(target_tag(&program, uses_of(&program, "lo")[0]), Some(NodeTag::VariableDeclaration));
        assert!(all_nodes(&program).iter().any(|n| matches!(n.kind, NodeKind::Float(x) if x == 1.5)));
    }

    // =========================================================================
    // Redefinition
    // =========================================================================

    #[test]
    fn redefinition_points_at_first_declaration() {
        let (_, log, _) = bind_source("var x = 1\nvar x = 2");
        assert_eq!(codes_of(&log), vec![codes::REDEFINITION]);

        let diag = &log.diagnostics()[0];
        assert_eq!(diag.message, "redefinition of 'x'");
        let primary = diag.primary_range().unwrap();
        assert_eq!((primary.start.line, primary.start.column), (2, 5));
        let secondary: Vec<_> = diag.secondary_ranges().collect();
        assert_eq!(secondary.len(), 1);
        assert_eq!((secondary[0].start.pos, secondary[0].end.pos), (4, 5));
    }

    #[test]
    fn hoisted_names_clash_with_variables() {
        let (_, log, _) = bind_source("func f() {}\nvar f = 1");
        assert_eq!(codes_of(&log), vec![codes::REDEFINITION]);
    }

    #[test]
    fn duplicate_members_are_reported() {
        let (_, log, _) = bind_source("struct S { a: i32; a: i32 }\nenum E { A, A }\nfunc g(p: i32, p: i32) {}");
        assert_eq!(codes_of(&log), vec![codes::REDEFINITION; 3]);
    }

    // =========================================================================
    // Control contexts
    // =========================================================================

    #[test]
    fn control_statements_link_to_their_targets() {
        let (program, log, _) = bind_source("func f() { while true { break } return }");
        assert!(log.is_empty());

        let nodes = all_nodes(&program);
        let brk = nodes.iter().find(|n| n.tag() == NodeTag::Break).unwrap();
        assert_eq!(target_tag(&program, brk), Some(NodeTag::While));
        let ret = nodes.iter().find(|n| n.tag() == NodeTag::Return).unwrap();
        assert_eq!(target_tag(&program, ret), Some(NodeTag::FunctionDeclaration));
    }

    #[test]
    fn return_in_closure_targets_the_closure() {
        let (program, log, _) = bind_source("func f() { var g = func() { return 1 } }");
        assert!(log.is_empty());
        let ret = all_nodes(&program).into_iter().find(|n| n.tag() == NodeTag::Return).unwrap();
        assert_eq!(target_tag(&program, ret), Some(NodeTag::Closure));
    }

    #[test]
    fn misplaced_control_statements() {
        let (_, log, _) = bind_source(
            "return 1\n\
             func f() { break }\n\
             func g() { while true { var h = func() { continue } } }",
        );
        assert_eq!(
            codes_of(&log),
            vec![codes::RETURN_OUTSIDE_FUNCTION, codes::BREAK_OUTSIDE_LOOP, codes::CONTINUE_OUTSIDE_LOOP]
        );
        assert_eq!(log.diagnostics()[0].message, "'return' used outside a function");
        assert_eq!(log.diagnostics()[1].message, "'break' used outside a loop");
    }

    // =========================================================================
    // Scope bookkeeping
    // =========================================================================

    #[test]
    fn scopes_balance_and_frames_are_reused() {
        let (_, _, summary) = bind_source("func f() { {} {} {} {} }");
        assert_eq!(summary.scopes_opened, 7);
        assert_eq!(summary.scopes_closed, 7);
        assert_eq!(summary.max_depth, 4);
        assert_eq!(summary.frames_allocated, 4);
    }

    #[test]
    fn binding_continues_after_errors() {
        let (_, log, summary) = bind_source("var a = x\nvar b = y\nvar c = a + b");
        assert_eq!(log.error_count(), 2);
        assert_eq!(summary.errors, 2);
        assert_eq!(summary.resolved, 2);
        assert_eq!(summary.scopes_opened, summary.scopes_closed);
    }
}
