// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Parser for the Kiln language.
//!
//! Pulls tokens from a [`kiln_lexer::Lexer`] and builds a [`kiln_ast::Program`].
//! Syntax errors are reported to the diagnostic log and parsing resumes at
//! the next statement boundary, so the program is always returned.

mod hints;
mod parser;

pub use parser::{parse, ParseError, Parser, MAX_NESTING_DEPTH, PARSER_STACK_SIZE};

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_ast::dump::{program_sexpr, sexpr};
    use kiln_ast::{NodeKind, Program, Source};
    use kiln_diagnostics::{codes, DiagnosticLog, Log};
    use kiln_lexer::Lexer;

    fn parse_with_log(src: &str) -> (Program, DiagnosticLog) {
        let source = Source::new("test.kn", src);
        let mut log = DiagnosticLog::new();
        let program = parse(&mut log, Lexer::new(&source));
        (program, log)
    }

    fn dump(src: &str) -> String {
        let (program, log) = parse_with_log(src);
        assert!(log.is_empty(), "Parse errors: {:?}", log.diagnostics());
        program_sexpr(&program)
    }

    fn codes_of(log: &DiagnosticLog) -> Vec<&str> {
        log.diagnostics()
            .iter()
            .filter_map(|d| d.code.as_ref().map(|c| c.0.as_str()))
            .collect()
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    #[test]
    fn multiplication_binds_tighter() {
        assert_eq!(dump("func X() => a + b * c"), "(func X (sig) (+ a (* b c)))");
        assert_eq!(dump("a * b + c"), "(expr-stmt (+ (* a b) c))");
    }

    #[test]
    fn equal_precedence_folds_left() {
        assert_eq!(dump("a - b - c"), "(expr-stmt (- (- a b) c))");
        assert_eq!(dump("a || b ?? c"), "(expr-stmt (?? (|| a b) c))");
    }

    #[test]
    fn assignment_and_ternary_lean_right() {
        assert_eq!(dump("a = b = c"), "(expr-stmt (= a (= b c)))");
        assert_eq!(dump("x += y * 2"), "(expr-stmt (+= x (* y 2)))");
        assert_eq!(dump("c ? a : b ? d : e"), "(expr-stmt (? c a (? b d e)))");
    }

    #[test]
    fn elvis_has_no_true_branch() {
        let (program, log) = parse_with_log("a ?: c");
        assert!(log.is_empty());
        assert_eq!(program_sexpr(&program), "(expr-stmt (? a _ c))");
        let NodeKind::ExpressionStatement { expr } = &program.items.iter().next().unwrap().kind else {
            panic!("expected expression statement");
        };
        assert!(matches!(expr.kind, NodeKind::Ternary { when_true: None, .. }));
    }

    #[test]
    fn tuple_member_path() {
        assert_eq!(dump("tuple.10.0.1"), "(expr-stmt (. (. (. tuple 10) 0) 1))");
    }

    #[test]
    fn prefix_and_postfix() {
        assert_eq!(dump("-a * b"), "(expr-stmt (* (pre- a) b))");
        assert_eq!(dump("!await x"), "(expr-stmt (pre! (preawait x)))");
        assert_eq!(dump("i++"), "(expr-stmt (post++ i))");
        assert_eq!(dump("p?.q.r"), "(expr-stmt (. (?. p q) r))");
    }

    #[test]
    fn call_index_and_macro_chains() {
        assert_eq!(dump("a.b(1)[2]!"), "(expr-stmt (macro (index (call (. a b) 1) 2)))");
        assert_eq!(dump("assert!(x, y)"), "(expr-stmt (macro assert x y))");
        assert_eq!(dump("f(...xs)"), "(expr-stmt (call f (spread xs)))");
        assert_eq!(dump("v as i32"), "(expr-stmt (as v i32))");
    }

    #[test]
    fn range_to_a_float() {
        assert_eq!(dump("var r = 0..1.5"), "(var r (.. 0 1.5))");
    }

    #[test]
    fn grouping_versus_tuple() {
        assert_eq!(dump("(a)"), "(expr-stmt (group a))");
        assert_eq!(dump("(a,)"), "(expr-stmt (tuple a))");
        assert_eq!(dump("(a, b)"), "(expr-stmt (tuple a b))");
        assert_eq!(dump("()"), "(expr-stmt (tuple))");
    }

    #[test]
    fn primaries() {
        assert_eq!(dump("[1, 2,]"), "(expr-stmt (array 1 2))");
        assert_eq!(dump("x = .Red"), "(expr-stmt (= x .Red))");
        assert_eq!(dump("new Foo(1)"), "(expr-stmt (new Foo 1))");
        assert_eq!(dump("`a${x}b`"), "(expr-stmt (strexpr \"a\" x \"b\"))");
        assert_eq!(dump("`${a}${b}`"), "(expr-stmt (strexpr a b))");
        assert_eq!(dump("x = 'c'"), "(expr-stmt (= x 'c'))");
    }

    #[test]
    fn struct_literals_only_outside_headers() {
        assert_eq!(
            dump("var p = Point { x: 1, y: 2 }"),
            "(var p (struct-lit Point (field-init 1) (field-init 2)))"
        );
        assert_eq!(dump("if p {}"), "(if p (block))");
        assert_eq!(dump("if (Point {} == p) {}"), "(if (group (== (struct-lit Point) p)) (block))");
    }

    #[test]
    fn closures() {
        assert_eq!(
            dump("var f = async func(x: i32) => x * 2"),
            "(var f (async-closure (sig (param x i32)) (* x 2)))"
        );
        assert_eq!(dump("var g = func() -> bool { return true }"), "(var g (closure (sig bool) (block (return true))))");
    }

    #[test]
    fn yield_with_and_without_value() {
        assert_eq!(dump("func g() { yield 1; yield }"), "(func g (sig) (block (expr-stmt (yield 1)) (expr-stmt (yield))))");
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    #[test]
    fn struct_with_fields_and_nested_members() {
        assert_eq!(
            dump("struct Point[T] { x: T; private y: i32 = 0\n func len() -> T; }"),
            "(struct Point (generic T) (field x T) (field y i32 0) (func len (sig T)))"
        );
    }

    #[test]
    fn enums() {
        assert_eq!(
            dump("enum Color: u8 { Red, @[deprecated] Green = 2, }"),
            "(enum Color u8 (option Red) (option Green deprecated 2))"
        );
    }

    #[test]
    fn empty_enum_is_reported_but_kept() {
        let (program, log) = parse_with_log("enum E {}");
        assert_eq!(codes_of(&log), vec![codes::TOO_FEW_ITEMS]);
        assert_eq!(program_sexpr(&program), "(enum E)");
    }

    #[test]
    fn aliases_and_unions() {
        assert_eq!(dump("type Id = i64;"), "(alias Id i64)");
        assert_eq!(dump("type Num = i32 | f64 | Big"), "(union Num i32 f64 Big)");
        assert_eq!(dump("type Pair[T] = (T, T)"), "(alias Pair (generic T) (tuple-type T T))");
    }

    #[test]
    fn variables() {
        assert_eq!(dump("var x: i32 = 1"), "(var x i32 1)");
        assert_eq!(dump("var y"), "(var y)");
        assert_eq!(dump("const (a, b) = pair"), "(const (a,b) pair)");
        assert_eq!(dump("export opaque var z = 0"), "(var z 0)");
    }

    #[test]
    fn const_requires_initializer() {
        let (program, log) = parse_with_log("const x: i32\nvar y = 2");
        assert_eq!(codes_of(&log), vec![codes::UNEXPECTED_TOKEN]);
        assert_eq!(program_sexpr(&program), "(var y 2)");
    }

    #[test]
    fn function_bodies() {
        assert_eq!(dump("func f(a: i32, b = 2) -> i32 { return a }"), "(func f (sig (param a i32) (param b 2) i32) (block (return a)))");
        assert_eq!(dump("func proto();"), "(func proto (sig))");
        assert_eq!(dump("async func run() {}"), "(func run (sig) (block))");
    }

    #[test]
    fn async_call_operator_is_a_declaration() {
        let (program, log) = parse_with_log("async func ()(x: i32);");
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        let NodeKind::FunctionDeclaration(decl) = &program.items.iter().next().unwrap().kind else {
            panic!("expected function");
        };
        assert_eq!(decl.name.text, "operator_call");
        assert!(decl.is_async);
    }

    #[test]
    fn async_closure_statement() {
        assert_eq!(dump("async func () => 1"), "(expr-stmt (async-closure (sig) 1))");
        assert_eq!(dump("async func(a: i32) {}"), "(expr-stmt (async-closure (sig (param a i32)) (block)))");
    }

    #[test]
    fn attributes_and_generic_constraints() {
        assert_eq!(
            dump("@[inline, align(8)] export func max[T: Ord | Eq](a: T) -> T;"),
            "(func max inline (call align 8) (generic T Ord Eq) (sig (param a T) T))"
        );
    }

    #[test]
    fn operator_overloads() {
        assert_eq!(dump("func +(a: V, b: V) -> V => a"), "(func operator_add (sig (param a V) (param b V) V) a)");
        assert_eq!(dump("func -(a: V) -> V;"), "(func operator_neg (sig (param a V) V))");
        assert_eq!(dump("func -(a: V, b: V) -> V;"), "(func operator_sub (sig (param a V) (param b V) V))");
        assert_eq!(dump("func [](i: i32) -> T;"), "(func operator_index (sig (param i i32) T))");
        assert_eq!(dump("func []=(i: i32, v: T);"), "(func operator_index_set (sig (param i i32) (param v T)))");
        assert_eq!(dump("func ()(x: i32);"), "(func operator_call (sig (param x i32)))");
        assert_eq!(dump("func init();"), "(func operator_init (sig))");
        assert_eq!(dump("func +=(o: V);"), "(func operator_add_assign (sig (param o V)))");
    }

    #[test]
    fn overload_remembers_operator_token() {
        let (program, _) = parse_with_log("func *(p: P) -> T;");
        let NodeKind::FunctionDeclaration(decl) = &program.items.iter().next().unwrap().kind else {
            panic!("expected function");
        };
        assert_eq!(decl.name.text, "operator_deref");
        assert_eq!(decl.operator, Some(kiln_ast::token::TokenKind::Star));
    }

    // =========================================================================
    // Types
    // =========================================================================

    #[test]
    fn type_forms() {
        assert_eq!(dump("var a: &const u8[]?"), "(var a (ptr-const (optional (array-type u8))))");
        assert_eq!(dump("var m: std.Map[string, i32]"), "(var m (std.Map string i32))");
        assert_eq!(dump("var f: func(i32, bool) -> string"), "(var f (func-type i32 bool string))");
        assert_eq!(dump("var t: (i32, f64)"), "(var t (tuple-type i32 f64))");
        assert_eq!(dump("var pp: &&T"), "(var pp (ptr (ptr T)))");
    }

    #[test]
    fn bracket_after_named_type() {
        assert_eq!(dump("var g: Grid[4]"), "(var g (array-type Grid 4))");
        assert_eq!(dump("var v: Vec[T]"), "(var v (Vec T))");
        assert_eq!(dump("var w: Vec[T][]"), "(var w (array-type (Vec T)))");
        assert_eq!(dump("var b: u8[N!()]"), "(var b (array-type u8 (macro N)))");
        assert_eq!(dump("var c: u8[N]"), "(var c (array-type u8 N))");
    }

    // =========================================================================
    // Statements
    // =========================================================================

    #[test]
    fn if_else_chains_and_bindings() {
        assert_eq!(
            dump("if const x = g() { return x } else if y {} else {}"),
            "(if (const x (call g)) (block (return x)) (if y (block) (block)))"
        );
        assert_eq!(dump("while (var n = next()) { break }"), "(while (var n (call next)) (block (break)))");
    }

    #[test]
    fn for_loops() {
        assert_eq!(
            dump("for (var i = 0; i < n; i++) { continue }"),
            "(for (var i 0) (< i n) (post++ i) (block (continue)))"
        );
        assert_eq!(dump("for (;;) {}"), "(for (block))");
    }

    #[test]
    fn defer_and_return() {
        assert_eq!(
            dump("func f() { defer close(h); return }"),
            "(func f (sig) (block (defer (expr-stmt (call close h))) (return)))"
        );
    }

    #[test]
    fn semicolons_are_optional() {
        assert_eq!(dump("var a = 1; var b = 2 a = b"), "(var a 1)\n(var b 2)\n(expr-stmt (= a b))");
    }

    // =========================================================================
    // Error recovery
    // =========================================================================

    #[test]
    fn recovery_keeps_valid_statements() {
        let (program, log) = parse_with_log("func main() { var x = ; return 1 }\nfunc ok() {}");
        assert_eq!(log.error_count(), 1);
        assert_eq!(
            program_sexpr(&program),
            "(func main (sig) (block (return 1)))\n(func ok (sig) (block))"
        );
    }

    #[test]
    fn recovery_at_top_level() {
        let (program, log) = parse_with_log(") ) var = 5\nfunc f() {}");
        assert_eq!(log.error_count(), 2);
        assert_eq!(program_sexpr(&program), "(func f (sig) (block))");
    }

    #[test]
    fn recovery_stops_at_closing_brace() {
        let (program, log) = parse_with_log("func f() { x = ) }\nvar y = 1");
        assert_eq!(log.error_count(), 1);
        assert_eq!(program_sexpr(&program), "(func f (sig) (block))\n(var y 1)");
    }

    #[test]
    fn expected_token_message_and_hint() {
        let (_, log) = parse_with_log("var x: = 1");
        let diag = &log.diagnostics()[0];
        assert_eq!(diag.message, "expected type, found '='");
        assert!(diag.help.is_some());
        assert!(diag.primary_range().is_some());
    }

    #[test]
    fn unclosed_paren_at_end_of_file() {
        let (_, log) = parse_with_log("f(a, b");
        assert_eq!(log.error_count(), 1);
        assert_eq!(log.diagnostics()[0].message, "unclosed '(' - missing ')'");
    }

    #[test]
    fn deep_nesting_is_reported() {
        let depth = MAX_NESTING_DEPTH + 10;
        let src = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        let (_, log) = parse_with_log(&src);
        assert_eq!(codes_of(&log), vec![codes::TOO_DEEPLY_NESTED]);
    }

    #[test]
    fn nesting_under_the_limit_parses() {
        let depth = MAX_NESTING_DEPTH - 10;
        let src = format!("var v = {}x{}", "(".repeat(depth), ")".repeat(depth));
        let (program, log) = parse_with_log(&src);
        assert!(log.is_empty(), "{:?}", log.diagnostics());
        assert_eq!(program.items.len(), 1);
    }

    #[test]
    fn node_ids_are_unique_and_counted() {
        let (program, _) = parse_with_log("func f(a: i32) { return a + 1 }");
        let root = program.items.iter().next().unwrap();
        let mut ids = Vec::new();
        kiln_ast::visit::walk(&mut IdCollector(&mut ids), root);
        let count = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(program.node_count as usize, count);
        assert_eq!(sexpr(root), "(func f (sig (param a i32)) (block (return (+ a 1))))");
    }

    struct IdCollector<'a>(&'a mut Vec<kiln_ast::NodeId>);

    impl kiln_ast::visit::Visitor for IdCollector<'_> {
        fn visit_function_declaration(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_call_signature(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_parameter(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_primitive_type(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_block(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_return_stmt(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_binary(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_identifier(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
        fn visit_integer(&mut self, node: &kiln_ast::Node) {
            self.0.push(node.id);
        }
    }

    #[test]
    fn ranges_span_whole_constructs() {
        let (program, _) = parse_with_log("var total = a + b");
        let item = program.items.iter().next().unwrap();
        let range = item.range.unwrap();
        assert_eq!((range.start.pos, range.end.pos), (0, 17));
    }

    #[test]
    fn lexer_errors_flow_into_the_same_log() {
        let (program, log) = parse_with_log("var x = 1 # 2");
        assert_eq!(codes_of(&log)[0], codes::UNEXPECTED_CHARACTER);
        assert!(!program.items.is_empty());
        assert!(log.error_count() >= 1);
    }
}
