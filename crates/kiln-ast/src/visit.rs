// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Visitor dispatch over node tags.
//!
//! A [`Visitor`] has one handler per [`NodeTag`]; each defaults to a no-op so
//! a pass only overrides the shapes it cares about. [`dispatch`] is an
//! exhaustive match, so a new node shape does not compile until it has a
//! handler here. [`walk`] drives a pre-order traversal of a whole subtree.

use crate::node::{Node, NodeTag, Program};

#[allow(unused_variables)]
pub trait Visitor {
    // Literals
    fn visit_boolean(&mut self, node: &Node) {}
    fn visit_integer(&mut self, node: &Node) {}
    fn visit_float(&mut self, node: &Node) {}
    fn visit_char(&mut self, node: &Node) {}
    fn visit_string(&mut self, node: &Node) {}
    fn visit_null(&mut self, node: &Node) {}
    fn visit_string_expression(&mut self, node: &Node) {}

    // Expressions
    fn visit_identifier(&mut self, node: &Node) {}
    fn visit_grouping(&mut self, node: &Node) {}
    fn visit_prefix(&mut self, node: &Node) {}
    fn visit_postfix(&mut self, node: &Node) {}
    fn visit_binary(&mut self, node: &Node) {}
    fn visit_ternary(&mut self, node: &Node) {}
    fn visit_assignment(&mut self, node: &Node) {}
    fn visit_call(&mut self, node: &Node) {}
    fn visit_macro_call(&mut self, node: &Node) {}
    fn visit_spread(&mut self, node: &Node) {}
    fn visit_yield_expr(&mut self, node: &Node) {}
    fn visit_new_expr(&mut self, node: &Node) {}
    fn visit_index(&mut self, node: &Node) {}
    fn visit_dot(&mut self, node: &Node) {}
    fn visit_member(&mut self, node: &Node) {}
    fn visit_tuple(&mut self, node: &Node) {}
    fn visit_struct_literal(&mut self, node: &Node) {}
    fn visit_struct_literal_field(&mut self, node: &Node) {}
    fn visit_array_literal(&mut self, node: &Node) {}
    fn visit_typed(&mut self, node: &Node) {}
    fn visit_closure(&mut self, node: &Node) {}
    fn visit_call_signature(&mut self, node: &Node) {}
    fn visit_parameter(&mut self, node: &Node) {}

    // Declarations
    fn visit_variable_declaration(&mut self, node: &Node) {}
    fn visit_function_declaration(&mut self, node: &Node) {}
    fn visit_type_alias(&mut self, node: &Node) {}
    fn visit_union(&mut self, node: &Node) {}
    fn visit_enum_decl(&mut self, node: &Node) {}
    fn visit_enum_option(&mut self, node: &Node) {}
    fn visit_struct_decl(&mut self, node: &Node) {}
    fn visit_struct_field(&mut self, node: &Node) {}
    fn visit_generic_parameter(&mut self, node: &Node) {}

    // Statements
    fn visit_expression_statement(&mut self, node: &Node) {}
    fn visit_block(&mut self, node: &Node) {}
    fn visit_if_stmt(&mut self, node: &Node) {}
    fn visit_while_stmt(&mut self, node: &Node) {}
    fn visit_for_stmt(&mut self, node: &Node) {}
    fn visit_defer(&mut self, node: &Node) {}
    fn visit_return_stmt(&mut self, node: &Node) {}
    fn visit_continue_stmt(&mut self, node: &Node) {}
    fn visit_break_stmt(&mut self, node: &Node) {}

    // Type expressions
    fn visit_primitive_type(&mut self, node: &Node) {}
    fn visit_type_reference(&mut self, node: &Node) {}
    fn visit_tuple_type(&mut self, node: &Node) {}
    fn visit_array_type(&mut self, node: &Node) {}
    fn visit_function_type(&mut self, node: &Node) {}
    fn visit_pointer_type(&mut self, node: &Node) {}
    fn visit_optional_type(&mut self, node: &Node) {}
}

/// Call the handler matching `node`'s tag. Does not descend.
pub fn dispatch<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    match node.tag() {
        NodeTag::Boolean => visitor.visit_boolean(node),
        NodeTag::Integer => visitor.visit_integer(node),
        NodeTag::Float => visitor.visit_float(node),
        NodeTag::Char => visitor.visit_char(node),
        NodeTag::String => visitor.visit_string(node),
        NodeTag::Null => visitor.visit_null(node),
        NodeTag::StringExpression => visitor.visit_string_expression(node),
        NodeTag::Identifier => visitor.visit_identifier(node),
        NodeTag::Grouping => visitor.visit_grouping(node),
        NodeTag::Prefix => visitor.visit_prefix(node),
        NodeTag::Postfix => visitor.visit_postfix(node),
        NodeTag::Binary => visitor.visit_binary(node),
        NodeTag::Ternary => visitor.visit_ternary(node),
        NodeTag::Assignment => visitor.visit_assignment(node),
        NodeTag::Call => visitor.visit_call(node),
        NodeTag::MacroCall => visitor.visit_macro_call(node),
        NodeTag::Spread => visitor.visit_spread(node),
        NodeTag::Yield => visitor.visit_yield_expr(node),
        NodeTag::New => visitor.visit_new_expr(node),
        NodeTag::Index => visitor.visit_index(node),
        NodeTag::Dot => visitor.visit_dot(node),
        NodeTag::Member => visitor.visit_member(node),
        NodeTag::Tuple => visitor.visit_tuple(node),
        NodeTag::StructLiteral => visitor.visit_struct_literal(node),
        NodeTag::StructLiteralField => visitor.visit_struct_literal_field(node),
        NodeTag::ArrayLiteral => visitor.visit_array_literal(node),
        NodeTag::Typed => visitor.visit_typed(node),
        NodeTag::Closure => visitor.visit_closure(node),
        NodeTag::CallSignature => visitor.visit_call_signature(node),
        NodeTag::Parameter => visitor.visit_parameter(node),
        NodeTag::VariableDeclaration => visitor.visit_variable_declaration(node),
        NodeTag::FunctionDeclaration => visitor.visit_function_declaration(node),
        NodeTag::TypeAlias => visitor.visit_type_alias(node),
        NodeTag::Union => visitor.visit_union(node),
        NodeTag::Enum => visitor.visit_enum_decl(node),
        NodeTag::EnumOption => visitor.visit_enum_option(node),
        NodeTag::Struct => visitor.visit_struct_decl(node),
        NodeTag::StructField => visitor.visit_struct_field(node),
        NodeTag::GenericParameter => visitor.visit_generic_parameter(node),
        NodeTag::ExpressionStatement => visitor.visit_expression_statement(node),
        NodeTag::Block => visitor.visit_block(node),
        NodeTag::If => visitor.visit_if_stmt(node),
        NodeTag::While => visitor.visit_while_stmt(node),
        NodeTag::For => visitor.visit_for_stmt(node),
        NodeTag::Defer => visitor.visit_defer(node),
        NodeTag::Return => visitor.visit_return_stmt(node),
        NodeTag::Continue => visitor.visit_continue_stmt(node),
        NodeTag::Break => visitor.visit_break_stmt(node),
        NodeTag::PrimitiveType => visitor.visit_primitive_type(node),
        NodeTag::TypeReference => visitor.visit_type_reference(node),
        NodeTag::TupleType => visitor.visit_tuple_type(node),
        NodeTag::ArrayType => visitor.visit_array_type(node),
        NodeTag::FunctionType => visitor.visit_function_type(node),
        NodeTag::PointerType => visitor.visit_pointer_type(node),
        NodeTag::OptionalType => visitor.visit_optional_type(node),
    }
}

/// Dispatch `node` and then every node beneath it, parents before children.
pub fn walk<V: Visitor + ?Sized>(visitor: &mut V, node: &Node) {
    dispatch(visitor, node);
    node.for_each_child(|child| walk(visitor, child));
}

pub fn walk_program<V: Visitor + ?Sized>(visitor: &mut V, program: &Program) {
    for item in &program.items {
        walk(visitor, item);
    }
}
