// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Help text attached to "expected X, found Y" parse errors.

use kiln_ast::token::TokenKind;

/// Hint for a failed `expect`, keyed on what was wanted and what was found.
pub fn for_expected(expected: &str, found: TokenKind) -> Option<&'static str> {
    match (expected, found) {
        // Colon hints
        ("':'", TokenKind::Eq) => Some("use ':' for types, '=' for values"),
        ("':'", _) => Some("syntax: name: Type"),

        // Block hints
        ("'{'", _) => Some("blocks start with '{'"),
        ("'}'", _) => Some("every '{' needs a matching '}'"),
        ("function body", _) => Some("a function body is a block, '=> expr' or ';'"),
        ("closure body", _) => Some("a closure body is a block or '=> expr'"),

        // Parentheses hints
        ("'('", _) => Some("calls and signatures need parentheses"),
        ("')'", TokenKind::Eof) => Some("add ')' to close the parenthesis"),
        ("')'", TokenKind::Semi) => Some("a 'for' header has three parts: init; condition; step"),
        ("']'", TokenKind::Eof) => Some("add ']' to close the bracket"),

        // Expression hints
        ("expression", TokenKind::Eq) => Some("put the value after '='"),
        ("expression", TokenKind::Semi) => Some("statement is incomplete"),
        ("expression", TokenKind::RBrace) => Some("statement is incomplete"),
        ("expression", _) => Some("try a value, variable, or function call"),

        // Name hints
        ("a name", TokenKind::IntegerLiteral) => Some("names can't start with a number"),
        ("a name", k) if k.is_keyword() => Some("keywords can't be used as names"),
        ("a name", _) => Some("names start with a letter or '_'"),
        ("a member name", _) => Some("members are names or tuple indexes like '.0'"),
        ("a function name", _) => Some("use a name, or an operator like '+' or '[]' for overloads"),

        // Declaration hints
        ("'='", _) => Some("constants and condition bindings need a value"),
        ("a declaration", _) => Some("start with 'func', 'struct', 'enum', 'type', 'var' or 'const'"),

        // Type hints
        ("type", _) => Some("try a type like 'i32', 'string', or a struct name"),

        // String expression hints
        ("'`'", TokenKind::Eof) => Some("close the string expression with '`'"),

        _ => None,
    }
}
