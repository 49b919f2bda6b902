// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Compact S-expression rendering of a tree, for debugging and tests.
//!
//! `a + b * c` renders as `(+ a (* b c))`; declarations carry their name in
//! the head, e.g. `(func main (sig) (block))`.

use std::fmt::Write;

use crate::node::{Node, NodeKind, Program};

pub fn sexpr(node: &Node) -> String {
    let mut out = String::new();
    write_node(&mut out, node);
    out
}

/// One line per top-level item.
pub fn program_sexpr(program: &Program) -> String {
    program.items.iter().map(sexpr).collect::<Vec<_>>().join("\n")
}

fn write_node(out: &mut String, node: &Node) {
    let tag = node.tag().name();
    let head = match &node.kind {
        NodeKind::Boolean(b) => return write_atom(out, b),
        NodeKind::Integer(n) => return write_atom(out, n),
        NodeKind::Float(x) => return write_atom(out, format_args!("{:?}", x)),
        NodeKind::Char(c) => return write_atom(out, format_args!("{:?}", c)),
        NodeKind::String(s) => return write_atom(out, format_args!("{:?}", s)),
        NodeKind::Null => return out.push_str("null"),
        NodeKind::Identifier { name } => return out.push_str(name),
        NodeKind::Dot { name } => return write_atom(out, format_args!(".{}", name.text)),
        NodeKind::PrimitiveType(kind) => return out.push_str(kind.text()),
        NodeKind::TypeReference { path, args } if args.is_empty() => {
            return out.push_str(&join_path(path));
        }

        NodeKind::Prefix { op, .. } => format!("pre{}", op.text()),
        NodeKind::Postfix { op, .. } => format!("post{}", op.text()),
        NodeKind::Binary { op, .. } | NodeKind::Assignment { op, .. } => op.text().to_string(),
        NodeKind::Member { optional, .. } => (if *optional { "?." } else { "." }).to_string(),
        NodeKind::Ternary { condition, when_true, when_false } => {
            out.push_str("(? ");
            write_node(out, condition);
            out.push(' ');
            match when_true {
                Some(t) => write_node(out, t),
                None => out.push('_'),
            }
            out.push(' ');
            write_node(out, when_false);
            out.push(')');
            return;
        }
        NodeKind::TypeReference { path, .. } => join_path(path),
        NodeKind::PointerType { is_const: true, .. } => "ptr-const".to_string(),
        NodeKind::Closure { is_async: true, .. } => "async-closure".to_string(),

        NodeKind::VariableDeclaration(d) => {
            let names: Vec<&str> = d.names.iter().map(|n| n.text.as_str()).collect();
            let names = if d.is_tuple { format!("({})", names.join(",")) } else { names.join(",") };
            format!("{} {}", if d.is_const { "const" } else { "var" }, names)
        }
        _ => match node.declared_name() {
            Some(name) => format!("{} {}", tag, name.text),
            None => tag.to_string(),
        },
    };

    out.push('(');
    out.push_str(&head);
    node.for_each_child(|child| {
        out.push(' ');
        write_node(out, child);
    });
    out.push(')');
}

fn write_atom(out: &mut String, value: impl std::fmt::Display) {
    let _ = write!(out, "{}", value);
}

fn join_path(path: &[crate::node::Ident]) -> String {
    path.iter().map(|p| p.text.as_str()).collect::<Vec<_>>().join(".")
}
