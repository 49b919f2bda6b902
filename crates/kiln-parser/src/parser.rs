// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The parser implementation: recursive descent for statements and
//! declarations, precedence climbing for binary operators.

use std::collections::VecDeque;

use kiln_ast::decl::{EnumDecl, FunctionDecl, Modifiers, StructDecl, TypeAliasDecl, UnionDecl, VariableDecl};
use kiln_ast::token::{self, Token, TokenKind, TokenValue};
use kiln_ast::{Ident, Node, NodeId, NodeKind, NodeList, Program, Range};
use kiln_diagnostics::{codes, Diagnostic, DiagnosticLog, Log, ToDiagnostic};
use kiln_lexer::Lexer;
use thiserror::Error;

/// Tokens buffered ahead of the cursor, the current one included.
const LOOKAHEAD: usize = 4;

/// Deepest expression, type or statement nesting accepted.
pub const MAX_NESTING_DEPTH: usize = 256;

/// Stack of the parsing thread. One nesting level recurses through every
/// expression layer, so [`MAX_NESTING_DEPTH`] levels outgrow a default
/// thread stack in debug builds.
pub const PARSER_STACK_SIZE: usize = 64 * 1024 * 1024;

static EOF_TOKEN: Token = Token { kind: TokenKind::Eof, range: None, value: None };

/// Parse a whole file. Problems are reported to `log`; the returned program
/// holds everything that parsed.
///
/// Runs on a scoped thread with a [`PARSER_STACK_SIZE`] stack so the nesting
/// limit is reached before the stack runs out, whatever thread calls this.
/// Diagnostics are replayed into `log` in the order they were reported.
pub fn parse(log: &mut dyn Log, lexer: Lexer<'_>) -> Program {
    let source = lexer.source();
    let outcome = std::thread::scope(|scope| {
        let worker = std::thread::Builder::new()
            .name("kiln-parser".into())
            .stack_size(PARSER_STACK_SIZE)
            .spawn_scoped(scope, move || {
                let mut local = DiagnosticLog::new();
                let program = Parser::new(lexer, &mut local).parse_program();
                (program, local)
            });
        match worker {
            Ok(handle) => match handle.join() {
                Ok(parsed) => Some(parsed),
                Err(payload) => std::panic::resume_unwind(payload),
            },
            Err(e) => {
                log::warn!("parsing {} on the calling thread: {}", source.name(), e);
                None
            }
        }
    });

    match outcome {
        Some((program, local)) => {
            for diagnostic in local.into_diagnostics() {
                log.log(diagnostic);
            }
            program
        }
        None => Parser::new(Lexer::new(source), log).parse_program(),
    }
}

/// The parser for Kiln source code.
pub struct Parser<'s, 'l> {
    lexer: Lexer<'s>,
    log: &'l mut dyn Log,
    tokens: VecDeque<Token>,
    /// Range of the last consumed token.
    last_range: Option<Range>,
    /// Tokens consumed so far; recovery uses it to detect progress.
    consumed: usize,
    next_node_id: u32,
    /// Whether `Name {` may start a struct literal (off in control flow headers).
    allow_struct_literals: bool,
    depth: usize,
    /// An `async` already consumed by the statement parser, picked up by the
    /// function or closure that follows it.
    pending_async: Option<Token>,
}

type PResult<T> = Result<T, ParseError>;

impl<'s, 'l> Parser<'s, 'l> {
    pub fn new(lexer: Lexer<'s>, log: &'l mut dyn Log) -> Self {
        let mut parser = Self {
            lexer,
            log,
            tokens: VecDeque::with_capacity(LOOKAHEAD),
            last_range: None,
            consumed: 0,
            next_node_id: 0,
            allow_struct_literals: true,
            depth: 0,
            pending_async: None,
        };
        parser.fill();
        parser
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn node(&mut self, kind: NodeKind, range: Option<Range>) -> Node {
        Node::new(self.next_id(), kind, range)
    }

    fn report(&mut self, error: ParseError) {
        log::debug!("parse error at {:?}: {}", error.range, error.message);
        self.log.log(error.to_diagnostic());
    }

    /// Skip to the next statement boundary after an error.
    ///
    /// Stops at an error-boundary token, end of input, or (inside a block)
    /// the `}` closing it. At least one token is discarded when the failed
    /// item consumed none.
    fn synchronize(&mut self, mark: usize, in_block: bool) {
        self.pending_async = None;
        if self.consumed == mark && !self.check(TokenKind::Eof) {
            self.advance();
        }

        let mut brace_depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::RBrace if brace_depth == 0 => {
                    if in_block {
                        break;
                    }
                }
                TokenKind::RBrace => brace_depth -= 1,
                TokenKind::LBrace => brace_depth += 1,
                kind if brace_depth == 0 && kind.is_error_boundary() => break,
                _ => {}
            }
            self.advance();
        }
        log::debug!("resynchronized at {}", self.kind());
    }

    /// Run `f` one nesting level deeper, failing past [`MAX_NESTING_DEPTH`].
    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(ParseError::too_deeply_nested(self.current().range));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    fn with_struct_literals<T>(&mut self, allow: bool, f: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let old = std::mem::replace(&mut self.allow_struct_literals, allow);
        let result = f(self);
        self.allow_struct_literals = old;
        result
    }

    // =========================================================================
    // Token Navigation
    // =========================================================================

    fn fill(&mut self) {
        while self.tokens.len() < LOOKAHEAD {
            let token = self.lexer.next(&mut *self.log);
            self.tokens.push_back(token);
        }
    }

    fn current(&self) -> &Token {
        self.tokens.front().unwrap_or(&EOF_TOKEN)
    }

    fn kind(&self) -> TokenKind {
        self.current().kind
    }

    fn peek(&self, n: usize) -> TokenKind {
        self.tokens.get(n).map_or(TokenKind::Eof, |t| t.kind)
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens.pop_front().unwrap_or_else(|| EOF_TOKEN.clone());
        if token.kind != TokenKind::Eof {
            self.consumed += 1;
        }
        if token.range.is_some() {
            self.last_range = token.range;
        }
        self.fill();
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn eat(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(&kind.to_string()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        if !self.check(TokenKind::Identifier) {
            return Err(self.error_expected("a name"));
        }
        let token = self.advance();
        Ok(Ident::new(token.text().unwrap_or_default(), token.range))
    }

    fn error_expected(&self, expected: &str) -> ParseError {
        ParseError::expected(expected, self.kind(), self.current().range)
    }

    fn start(&self) -> Option<Range> {
        self.current().range
    }

    /// Range from `start` through the last consumed token.
    fn finish(&self, start: Option<Range>) -> Option<Range> {
        match (start, self.last_range) {
            (Some(s), Some(e)) if s.source == e.source && s.start.pos <= e.start.pos => Some(Range::merge(s, e)),
            (s, e) => s.or(e),
        }
    }

    /// Comma-separated items up to `close`, allowing a trailing comma.
    fn parse_list(
        &mut self,
        close: TokenKind,
        mut item: impl FnMut(&mut Self) -> PResult<Node>,
    ) -> PResult<NodeList> {
        self.with_struct_literals(true, |p| {
            let mut list = NodeList::new();
            while !p.check(close) {
                list.push(item(p)?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            p.expect(close)?;
            Ok(list)
        })
    }

    // =========================================================================
    // Top-Level Parsing
    // =========================================================================

    pub fn parse_program(mut self) -> Program {
        let source = self.lexer.source().id();
        let mut items = NodeList::new();

        while !self.check(TokenKind::Eof) {
            let mark = self.consumed;
            match self.parse_statement() {
                Ok(item) => items.push(item),
                Err(e) => {
                    self.report(e);
                    self.synchronize(mark, false);
                }
            }
        }

        log::debug!("parsed {} top-level items, {} nodes", items.len(), self.next_node_id);
        Program { source, items, node_count: self.next_node_id }
    }

    // =========================================================================
    // Declarations
    // =========================================================================

    /// `func name(` is a declaration; `func(` is a closure unless it spells
    /// the call operator `func ()(`.
    fn is_function_declaration(&self, func_at: usize) -> bool {
        match self.peek(func_at + 1) {
            TokenKind::LParen => {
                self.peek(func_at + 2) == TokenKind::RParen && self.peek(func_at + 3) == TokenKind::LParen
            }
            _ => true,
        }
    }

    fn parse_declaration(&mut self) -> PResult<Node> {
        let start = self.start();
        let attributes = self.parse_attributes()?;
        self.parse_declaration_after(attributes, start)
    }

    fn parse_declaration_after(&mut self, attributes: NodeList, start: Option<Range>) -> PResult<Node> {
        let mut modifiers = Modifiers::default();
        loop {
            match self.kind() {
                TokenKind::Export => modifiers.export = true,
                TokenKind::Opaque => modifiers.opaque = true,
                _ => break,
            }
            self.advance();
        }

        match self.kind() {
            TokenKind::Struct => self.parse_struct(attributes, modifiers, start),
            TokenKind::Enum => self.parse_enum(attributes, modifiers, start),
            TokenKind::Type => self.parse_type_declaration(attributes, modifiers, start),
            TokenKind::Var | TokenKind::Const => self.parse_variable(attributes, modifiers, start, false),
            TokenKind::Func | TokenKind::Async => self.parse_function(attributes, modifiers, start),
            _ => Err(self.error_expected("a declaration")),
        }
    }

    /// Zero or more `@[expr, ...]` groups, flattened.
    fn parse_attributes(&mut self) -> PResult<NodeList> {
        let mut attributes = NodeList::new();
        while self.eat(TokenKind::At) {
            self.expect(TokenKind::LBracket)?;
            for attribute in self.parse_list(TokenKind::RBracket, |p| p.parse_expression())? {
                attributes.push(attribute);
            }
        }
        Ok(attributes)
    }

    fn parse_generics(&mut self) -> PResult<NodeList> {
        if !self.eat(TokenKind::LBracket) {
            return Ok(NodeList::new());
        }
        self.parse_list(TokenKind::RBracket, |p| {
            let start = p.start();
            let name = p.expect_ident()?;
            let mut constraints = NodeList::new();
            if p.eat(TokenKind::Colon) {
                loop {
                    constraints.push(p.parse_type()?);
                    if !p.eat(TokenKind::Pipe) {
                        break;
                    }
                }
            }
            let range = p.finish(start);
            Ok(p.node(NodeKind::GenericParameter { name, constraints }, range))
        })
    }

    fn parse_struct(&mut self, attributes: NodeList, modifiers: Modifiers, start: Option<Range>) -> PResult<Node> {
        self.expect(TokenKind::Struct)?;
        let name = self.expect_ident()?;
        let generics = self.parse_generics()?;
        self.expect(TokenKind::LBrace)?;

        let members = self.with_struct_literals(true, |p| {
            let mut members = NodeList::new();
            while !p.check(TokenKind::RBrace) && !p.check(TokenKind::Eof) {
                members.push(p.nested(|p| p.parse_struct_member())?);
                while p.eat(TokenKind::Semi) || p.eat(TokenKind::Comma) {}
            }
            Ok(members)
        })?;
        self.expect(TokenKind::RBrace)?;

        let decl = StructDecl { attributes, modifiers, name, generics, members };
        let range = self.finish(start);
        Ok(self.node(NodeKind::Struct(Box::new(decl)), range))
    }

    /// A field `[private] name: Type [= default]`, or a nested declaration.
    fn parse_struct_member(&mut self) -> PResult<Node> {
        let start = self.start();
        let attributes = self.parse_attributes()?;
        let is_field = self.check(TokenKind::Private)
            || (self.check(TokenKind::Identifier) && self.peek(1) == TokenKind::Colon);
        if !is_field {
            return self.parse_declaration_after(attributes, start);
        }

        let is_private = self.eat(TokenKind::Private);
        let name = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = Box::new(self.parse_type()?);
        let default = if self.eat(TokenKind::Eq) { Some(Box::new(self.parse_expression()?)) } else { None };

        let range = self.finish(start);
        Ok(self.node(NodeKind::StructField { attributes, is_private, name, ty, default }, range))
    }

    fn parse_enum(&mut self, attributes: NodeList, modifiers: Modifiers, start: Option<Range>) -> PResult<Node> {
        self.expect(TokenKind::Enum)?;
        let name = self.expect_ident()?;
        let base = if self.eat(TokenKind::Colon) { Some(Box::new(self.parse_type()?)) } else { None };
        self.expect(TokenKind::LBrace)?;

        let options = self.parse_list(TokenKind::RBrace, |p| {
            let start = p.start();
            let attributes = p.parse_attributes()?;
            let name = p.expect_ident()?;
            let value = if p.eat(TokenKind::Eq) { Some(Box::new(p.parse_expression()?)) } else { None };
            let range = p.finish(start);
            Ok(p.node(NodeKind::EnumOption { attributes, name, value }, range))
        })?;

        let range = self.finish(start);
        if options.is_empty() {
            self.report(ParseError::too_few_items("an enum needs at least one option", range));
        }
        let decl = EnumDecl { attributes, modifiers, name, base, options };
        Ok(self.node(NodeKind::Enum(Box::new(decl)), range))
    }

    /// `type Name = T` or the union form `type Name = A | B`.
    fn parse_type_declaration(
        &mut self,
        attributes: NodeList,
        modifiers: Modifiers,
        start: Option<Range>,
    ) -> PResult<Node> {
        self.expect(TokenKind::Type)?;
        let name = self.expect_ident()?;
        let generics = self.parse_generics()?;
        self.expect(TokenKind::Eq)?;

        let first = self.parse_type()?;
        if !self.check(TokenKind::Pipe) {
            let decl = TypeAliasDecl { attributes, modifiers, name, generics, ty: Box::new(first) };
            let range = self.finish(start);
            return Ok(self.node(NodeKind::TypeAlias(Box::new(decl)), range));
        }

        let mut members = NodeList::new();
        members.push(first);
        while self.eat(TokenKind::Pipe) {
            members.push(self.parse_type()?);
        }
        let decl = UnionDecl { attributes, modifiers, name, generics, members };
        let range = self.finish(start);
        Ok(self.node(NodeKind::Union(Box::new(decl)), range))
    }

    /// `var`/`const` with one name or a `(a, b)` destructuring list.
    fn parse_variable(
        &mut self,
        attributes: NodeList,
        modifiers: Modifiers,
        start: Option<Range>,
        require_init: bool,
    ) -> PResult<Node> {
        let is_const = self.check(TokenKind::Const);
        if !self.eat(TokenKind::Const) {
            self.expect(TokenKind::Var)?;
        }

        let (names, is_tuple) = if self.eat(TokenKind::LParen) {
            let mut names = Vec::new();
            while !self.check(TokenKind::RParen) {
                names.push(self.expect_ident()?);
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RParen)?;
            if names.is_empty() {
                return Err(ParseError::too_few_items("a destructuring needs at least one name", self.finish(start)));
            }
            (names, true)
        } else {
            (vec![self.expect_ident()?], false)
        };

        let ty = if self.eat(TokenKind::Colon) { Some(Box::new(self.parse_type()?)) } else { None };
        let init = if self.eat(TokenKind::Eq) { Some(Box::new(self.parse_expression()?)) } else { None };
        if init.is_none() && (is_const || require_init) {
            return Err(self.error_expected("'='"));
        }

        let decl = VariableDecl { attributes, modifiers, is_const, names, is_tuple, ty, init };
        let range = self.finish(start);
        Ok(self.node(NodeKind::VariableDeclaration(Box::new(decl)), range))
    }

    fn parse_function(&mut self, attributes: NodeList, modifiers: Modifiers, start: Option<Range>) -> PResult<Node> {
        let is_async = self.pending_async.take().is_some() || self.eat(TokenKind::Async);
        self.expect(TokenKind::Func)?;

        let (name, operator) = self.parse_function_name()?;
        let generics = if operator.is_none() { self.parse_generics()? } else { NodeList::new() };
        let signature = self.parse_call_signature()?;

        // A one-parameter overload of `-`, `+`, `*` or `&` is the unary form.
        let name = match (operator, &signature.kind) {
            (Some(op), NodeKind::CallSignature { params, .. }) if params.len() == 1 => {
                match op.unary_operator_name() {
                    Some(unary) => Ident::new(unary, name.range),
                    None => name,
                }
            }
            _ => name,
        };

        let body = if self.check(TokenKind::LBrace) {
            Some(Box::new(self.parse_block()?))
        } else if self.eat(TokenKind::FatArrow) {
            Some(Box::new(self.parse_expression()?))
        } else if self.eat(TokenKind::Semi)
            || matches!(self.kind(), TokenKind::Eof | TokenKind::RBrace)
            || self.kind().is_error_boundary()
        {
            None
        } else {
            return Err(self.error_expected("function body"));
        };

        let decl = FunctionDecl {
            attributes,
            modifiers,
            is_async,
            name,
            operator,
            generics,
            signature: Box::new(signature),
            body,
        };
        let range = self.finish(start);
        Ok(self.node(NodeKind::FunctionDeclaration(Box::new(decl)), range))
    }

    /// A plain name, or an operator spelled after `func` mapped to its
    /// `operator_*` name.
    fn parse_function_name(&mut self) -> PResult<(Ident, Option<TokenKind>)> {
        let kind = self.kind();
        let range = self.start();

        let name = match kind {
            TokenKind::Identifier => return Ok((self.expect_ident()?, None)),
            TokenKind::Init => {
                self.advance();
                token::OPERATOR_INIT
            }
            TokenKind::LBracket => {
                self.advance();
                self.expect(TokenKind::RBracket)?;
                if self.eat(TokenKind::Eq) {
                    token::OPERATOR_INDEX_SET
                } else {
                    token::OPERATOR_INDEX
                }
            }
            TokenKind::LParen => {
                self.advance();
                self.expect(TokenKind::RParen)?;
                token::OPERATOR_CALL
            }
            _ => match kind.operator_name() {
                Some(name) => {
                    self.advance();
                    name
                }
                None => return Err(self.error_expected("a function name")),
            },
        };

        Ok((Ident::new(name, self.finish(range)), Some(kind)))
    }

    fn parse_call_signature(&mut self) -> PResult<Node> {
        let start = self.start();
        self.expect(TokenKind::LParen)?;
        let params = self.parse_list(TokenKind::RParen, |p| p.parse_parameter())?;
        let return_type = if self.eat(TokenKind::Arrow) { Some(Box::new(self.parse_type()?)) } else { None };
        let range = self.finish(start);
        Ok(self.node(NodeKind::CallSignature { params, return_type }, range))
    }

    fn parse_parameter(&mut self) -> PResult<Node> {
        let start = self.start();
        let name = self.expect_ident()?;
        let ty = if self.eat(TokenKind::Colon) { Some(Box::new(self.parse_type()?)) } else { None };
        let default = if self.eat(TokenKind::Eq) { Some(Box::new(self.parse_expression()?)) } else { None };
        let range = self.finish(start);
        Ok(self.node(NodeKind::Parameter { name, ty, default }, range))
    }

    // =========================================================================
    // Statement Parsing
    // =========================================================================

    fn parse_statement(&mut self) -> PResult<Node> {
        self.nested(|p| {
            let stmt = p.parse_statement_kind()?;
            p.eat(TokenKind::Semi);
            Ok(stmt)
        })
    }

    fn parse_statement_kind(&mut self) -> PResult<Node> {
        let start = self.start();
        match self.kind() {
            TokenKind::At
            | TokenKind::Export
            | TokenKind::Opaque
            | TokenKind::Struct
            | TokenKind::Enum
            | TokenKind::Type
            | TokenKind::Var
            | TokenKind::Const => self.parse_declaration(),
            TokenKind::Func if self.is_function_declaration(0) => self.parse_declaration(),
            // `async func ()(` is only told apart from a closure one token
            // past the ring, so classify with `func` at the front.
            TokenKind::Async if self.peek(1) == TokenKind::Func => {
                self.pending_async = Some(self.advance());
                if self.is_function_declaration(0) {
                    self.parse_declaration_after(NodeList::new(), start)
                } else {
                    self.parse_expression_statement(start)
                }
            }
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => {
                self.advance();
                let condition = Box::new(self.parse_condition()?);
                let body = Box::new(self.parse_block()?);
                let range = self.finish(start);
                Ok(self.node(NodeKind::While { condition, body }, range))
            }
            TokenKind::For => self.parse_for(),
            TokenKind::Defer => {
                self.advance();
                let stmt = Box::new(self.parse_statement()?);
                let range = self.finish(start);
                Ok(self.node(NodeKind::Defer { stmt }, range))
            }
            TokenKind::Return => {
                self.advance();
                let value = if matches!(self.kind(), TokenKind::Semi | TokenKind::RBrace | TokenKind::Eof) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                let range = self.finish(start);
                Ok(self.node(NodeKind::Return { value }, range))
            }
            TokenKind::Break => {
                self.advance();
                let range = self.finish(start);
                Ok(self.node(NodeKind::Break, range))
            }
            TokenKind::Continue => {
                self.advance();
                let range = self.finish(start);
                Ok(self.node(NodeKind::Continue, range))
            }
            _ => self.parse_expression_statement(start),
        }
    }

    fn parse_expression_statement(&mut self, start: Option<Range>) -> PResult<Node> {
        let expr = Box::new(self.parse_expression()?);
        let range = self.finish(start);
        Ok(self.node(NodeKind::ExpressionStatement { expr }, range))
    }

    /// Parse a block, recovering from errors statement by statement.
    fn parse_block(&mut self) -> PResult<Node> {
        self.nested(|p| {
            let start = p.start();
            p.expect(TokenKind::LBrace)?;
            let statements = p.with_struct_literals(true, |p| Ok(p.parse_block_body()))?;
            p.expect(TokenKind::RBrace)?;
            let range = p.finish(start);
            Ok(p.node(NodeKind::Block { statements }, range))
        })
    }

    fn parse_block_body(&mut self) -> NodeList {
        let mut statements = NodeList::new();
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let mark = self.consumed;
            match self.parse_statement() {
                Ok(stmt) => statements.push(stmt),
                Err(e) => {
                    // Record error but stay within the block
                    self.report(e);
                    self.synchronize(mark, true);
                }
            }
        }
        statements
    }

    fn parse_if(&mut self) -> PResult<Node> {
        let start = self.start();
        self.expect(TokenKind::If)?;
        let condition = Box::new(self.parse_condition()?);
        let then_branch = Box::new(self.parse_block()?);

        let else_branch = if self.eat(TokenKind::Else) {
            if self.check(TokenKind::If) {
                Some(Box::new(self.nested(|p| p.parse_if())?))
            } else {
                Some(Box::new(self.parse_block()?))
            }
        } else {
            None
        };

        let range = self.finish(start);
        Ok(self.node(NodeKind::If { condition, then_branch, else_branch }, range))
    }

    /// An `if`/`while` condition: an expression, or a `var`/`const`
    /// binding, optionally parenthesized.
    fn parse_condition(&mut self) -> PResult<Node> {
        let binding_at = match (self.kind(), self.peek(1)) {
            (TokenKind::Var | TokenKind::Const, _) => Some(false),
            (TokenKind::LParen, TokenKind::Var | TokenKind::Const) => Some(true),
            _ => None,
        };

        match binding_at {
            Some(parenthesized) => {
                if parenthesized {
                    self.advance();
                }
                let start = self.start();
                let binding = self.with_struct_literals(parenthesized, |p| {
                    p.parse_variable(NodeList::new(), Modifiers::default(), start, true)
                })?;
                if parenthesized {
                    self.expect(TokenKind::RParen)?;
                }
                Ok(binding)
            }
            None => self.with_struct_literals(false, |p| p.parse_expression()),
        }
    }

    /// `for (init; condition; step) body`; every header part is optional.
    fn parse_for(&mut self) -> PResult<Node> {
        let start = self.start();
        self.expect(TokenKind::For)?;
        self.expect(TokenKind::LParen)?;

        let init = if self.check(TokenKind::Semi) {
            None
        } else if matches!(self.kind(), TokenKind::Var | TokenKind::Const) {
            let start = self.start();
            Some(Box::new(self.parse_variable(NodeList::new(), Modifiers::default(), start, false)?))
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.expect(TokenKind::Semi)?;

        let condition = if self.check(TokenKind::Semi) { None } else { Some(Box::new(self.parse_expression()?)) };
        self.expect(TokenKind::Semi)?;

        let step = if self.check(TokenKind::RParen) { None } else { Some(Box::new(self.parse_expression()?)) };
        self.expect(TokenKind::RParen)?;

        let body = Box::new(self.parse_block()?);
        let range = self.finish(start);
        Ok(self.node(NodeKind::For { init, condition, step, body }, range))
    }

    // =========================================================================
    // Expression Parsing
    // =========================================================================

    pub fn parse_expression(&mut self) -> PResult<Node> {
        self.nested(|p| p.parse_ternary())
    }

    /// `c ? t : f`, or Elvis `c ?: f`. Both branches nest to the right.
    fn parse_ternary(&mut self) -> PResult<Node> {
        let start = self.start();
        let condition = self.parse_assignment()?;
        if !self.kind().is_ternary_operator() {
            return Ok(condition);
        }
        self.advance();

        let when_true = if self.eat(TokenKind::Colon) {
            None
        } else {
            let branch = self.parse_expression()?;
            self.expect(TokenKind::Colon)?;
            Some(Box::new(branch))
        };
        let when_false = Box::new(self.parse_expression()?);

        let range = self.finish(start);
        Ok(self.node(NodeKind::Ternary { condition: Box::new(condition), when_true, when_false }, range))
    }

    fn parse_assignment(&mut self) -> PResult<Node> {
        let start = self.start();
        let target = self.parse_binary(token::LOOSEST_PRECEDENCE)?;

        let op = self.kind();
        if !op.is_assignment_operator() {
            return Ok(target);
        }
        self.advance();
        let value = Box::new(self.parse_expression()?);

        let range = self.finish(start);
        Ok(self.node(NodeKind::Assignment { op, target: Box::new(target), value }, range))
    }

    /// Precedence climbing: operators looser than or equal to `limit` end
    /// this level, so equal precedence folds left.
    fn parse_binary(&mut self, limit: u8) -> PResult<Node> {
        let start = self.start();
        let mut lhs = self.parse_prefix()?;

        loop {
            let op = self.kind();
            if !op.is_binary_operator() || op.precedence() >= limit {
                break;
            }
            self.advance();
            let rhs = self.nested(|p| p.parse_binary(op.precedence()))?;
            let range = self.finish(start);
            lhs = self.node(NodeKind::Binary { op, lhs: Box::new(lhs), rhs: Box::new(rhs) }, range);
        }

        Ok(lhs)
    }

    fn parse_prefix(&mut self) -> PResult<Node> {
        let op = self.kind();
        if !op.is_prefix_operator() {
            return self.parse_postfix();
        }

        let start = self.start();
        self.advance();
        let operand = Box::new(self.nested(|p| p.parse_prefix())?);
        let range = self.finish(start);
        Ok(self.node(NodeKind::Prefix { op, operand }, range))
    }

    fn parse_postfix(&mut self) -> PResult<Node> {
        let start = self.start();
        let mut expr = self.parse_primary()?;

        loop {
            let kind = match self.kind() {
                op @ (TokenKind::PlusPlus | TokenKind::MinusMinus) => {
                    self.advance();
                    NodeKind::Postfix { op, operand: Box::new(expr) }
                }
                TokenKind::Dot | TokenKind::QuestionDot => {
                    let optional = self.advance().kind == TokenKind::QuestionDot;
                    let member = Box::new(self.parse_member_name()?);
                    NodeKind::Member { target: Box::new(expr), member, optional }
                }
                TokenKind::LBracket => {
                    self.advance();
                    let args = self.parse_list(TokenKind::RBracket, |p| p.parse_expression())?;
                    NodeKind::Index { target: Box::new(expr), args }
                }
                TokenKind::Bang => {
                    self.advance();
                    let args = if self.eat(TokenKind::LParen) {
                        Some(self.parse_list(TokenKind::RParen, |p| p.parse_expression())?)
                    } else {
                        None
                    };
                    NodeKind::MacroCall { target: Box::new(expr), args }
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_list(TokenKind::RParen, |p| p.parse_expression())?;
                    NodeKind::Call { callee: Box::new(expr), args }
                }
                TokenKind::As => {
                    self.advance();
                    let ty = Box::new(self.parse_type()?);
                    NodeKind::Typed { expr: Box::new(expr), ty }
                }
                _ => break,
            };
            let range = self.finish(start);
            expr = self.node(kind, range);
        }

        Ok(expr)
    }

    /// The right side of `.`: a name or an integer tuple index.
    fn parse_member_name(&mut self) -> PResult<Node> {
        match self.kind() {
            TokenKind::Identifier => {
                let token = self.advance();
                let name = token.text().unwrap_or_default().to_string();
                Ok(self.node(NodeKind::Identifier { name }, token.range))
            }
            TokenKind::IntegerLiteral => {
                let token = self.advance();
                let index = token.int_value().unwrap_or_default();
                Ok(self.node(NodeKind::Integer(index), token.range))
            }
            _ => Err(self.error_expected("a member name")),
        }
    }

    fn parse_primary(&mut self) -> PResult<Node> {
        let start = self.start();

        match self.kind() {
            TokenKind::IntegerLiteral
            | TokenKind::FloatLiteral
            | TokenKind::CharLiteral
            | TokenKind::StringLiteral
            | TokenKind::BooleanLiteral
            | TokenKind::NullLiteral => {
                let token = self.advance();
                Ok(self.literal(token))
            }
            TokenKind::OpenStringExpr => self.parse_string_expression(),
            TokenKind::LParen => self.parse_paren(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::LBracket => {
                self.advance();
                let elements = self.parse_list(TokenKind::RBracket, |p| p.parse_expression())?;
                let range = self.finish(start);
                Ok(self.node(NodeKind::ArrayLiteral { elements }, range))
            }
            TokenKind::Dot => {
                self.advance();
                let name = self.expect_ident()?;
                let range = self.finish(start);
                Ok(self.node(NodeKind::Dot { name }, range))
            }
            TokenKind::Identifier => {
                let token = self.advance();
                let name = token.text().unwrap_or_default().to_string();
                let path = self.node(NodeKind::Identifier { name }, token.range);
                if self.allow_struct_literals && self.check(TokenKind::LBrace) && self.looks_like_struct_literal() {
                    return self.parse_struct_literal(path, start);
                }
                Ok(path)
            }
            TokenKind::Func | TokenKind::Async => self.parse_closure(),
            TokenKind::New => {
                self.advance();
                let ty = Box::new(self.parse_type()?);
                self.expect(TokenKind::LParen)?;
                let args = self.parse_list(TokenKind::RParen, |p| p.parse_expression())?;
                let range = self.finish(start);
                Ok(self.node(NodeKind::New { ty, args }, range))
            }
            TokenKind::Yield => {
                self.advance();
                let value = if matches!(
                    self.kind(),
                    TokenKind::Semi | TokenKind::RBrace | TokenKind::RParen | TokenKind::Comma | TokenKind::Eof
                ) {
                    None
                } else {
                    Some(Box::new(self.parse_expression()?))
                };
                let range = self.finish(start);
                Ok(self.node(NodeKind::Yield { value }, range))
            }
            TokenKind::DotDotDot => {
                self.advance();
                let expr = Box::new(self.parse_expression()?);
                let range = self.finish(start);
                Ok(self.node(NodeKind::Spread { expr }, range))
            }
            _ => Err(self.error_expected("expression")),
        }
    }

    fn literal(&mut self, token: Token) -> Node {
        let kind = match (token.kind, token.value) {
            (TokenKind::IntegerLiteral, Some(TokenValue::Int(n))) => NodeKind::Integer(n),
            (TokenKind::FloatLiteral, Some(TokenValue::Float(x))) => NodeKind::Float(x),
            (TokenKind::CharLiteral, Some(TokenValue::Char(c))) => NodeKind::Char(c),
            (TokenKind::StringLiteral, Some(TokenValue::Text(s))) => NodeKind::String(s),
            (TokenKind::BooleanLiteral, Some(TokenValue::Bool(b))) => NodeKind::Boolean(b),
            _ => NodeKind::Null,
        };
        self.node(kind, token.range)
    }

    /// Segments and embedded expressions up to the closing backtick. Empty
    /// separator segments are dropped.
    fn parse_string_expression(&mut self) -> PResult<Node> {
        let start = self.start();
        self.expect(TokenKind::OpenStringExpr)?;

        let mut parts = NodeList::new();
        loop {
            match self.kind() {
                TokenKind::CloseStringExpr => {
                    self.advance();
                    break;
                }
                TokenKind::StringSegment => {
                    let token = self.advance();
                    if let Some(TokenValue::Text(text)) = token.value {
                        if !text.is_empty() {
                            parts.push(self.node(NodeKind::String(text), token.range));
                        }
                    }
                }
                TokenKind::Eof => return Err(self.error_expected("'`'")),
                _ => parts.push(self.with_struct_literals(true, |p| p.parse_expression())?),
            }
        }

        let range = self.finish(start);
        Ok(self.node(NodeKind::StringExpression { parts }, range))
    }

    /// `(e)` is a grouping; `()`, `(e,)` and `(a, b)` are tuples.
    fn parse_paren(&mut self) -> PResult<Node> {
        let start = self.start();
        self.expect(TokenKind::LParen)?;

        let (elements, is_tuple) = self.with_struct_literals(true, |p| {
            let mut elements = NodeList::new();
            let mut is_tuple = true;
            if !p.check(TokenKind::RParen) {
                elements.push(p.parse_expression()?);
                is_tuple = p.check(TokenKind::Comma);
                while p.eat(TokenKind::Comma) && !p.check(TokenKind::RParen) {
                    elements.push(p.parse_expression()?);
                }
            }
            p.expect(TokenKind::RParen)?;
            Ok((elements, is_tuple))
        })?;

        let range = self.finish(start);
        if is_tuple {
            return Ok(self.node(NodeKind::Tuple { elements }, range));
        }
        match elements.into_iter().next() {
            Some(expr) => Ok(self.node(NodeKind::Grouping { expr: Box::new(expr) }, range)),
            None => Ok(self.node(NodeKind::Tuple { elements: NodeList::new() }, range)),
        }
    }

    /// `Name {}` or `Name { field: ...`.
    fn looks_like_struct_literal(&self) -> bool {
        match self.peek(1) {
            TokenKind::RBrace => true,
            TokenKind::Identifier => self.peek(2) == TokenKind::Colon,
            _ => false,
        }
    }

    fn parse_struct_literal(&mut self, path: Node, start: Option<Range>) -> PResult<Node> {
        self.expect(TokenKind::LBrace)?;
        let fields = self.parse_list(TokenKind::RBrace, |p| {
            let start = p.start();
            let name = p.expect_ident()?;
            p.expect(TokenKind::Colon)?;
            let value = Box::new(p.parse_expression()?);
            let range = p.finish(start);
            Ok(p.node(NodeKind::StructLiteralField { name, value }, range))
        })?;
        let range = self.finish(start);
        Ok(self.node(NodeKind::StructLiteral { path: Box::new(path), fields }, range))
    }

    /// `[async] func(params) [-> T]` followed by `=> expr` or a block.
    fn parse_closure(&mut self) -> PResult<Node> {
        let (start, is_async) = match self.pending_async.take() {
            Some(token) => (token.range, true),
            None => (self.start(), self.eat(TokenKind::Async)),
        };
        self.expect(TokenKind::Func)?;
        let signature = Box::new(self.parse_call_signature()?);

        let body = if self.eat(TokenKind::FatArrow) {
            self.parse_expression()?
        } else if self.check(TokenKind::LBrace) {
            self.parse_block()?
        } else {
            return Err(self.error_expected("closure body"));
        };

        let range = self.finish(start);
        Ok(self.node(NodeKind::Closure { is_async, signature, body: Box::new(body) }, range))
    }

    // =========================================================================
    // Type Parsing
    // =========================================================================

    pub fn parse_type(&mut self) -> PResult<Node> {
        self.nested(|p| p.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> PResult<Node> {
        let start = self.start();
        let kind = self.kind();

        let base = match kind {
            k if k.is_primitive_type() => {
                self.advance();
                let range = self.finish(start);
                let prim = self.node(NodeKind::PrimitiveType(k), range);
                return self.parse_type_suffixes(prim, start);
            }
            TokenKind::Identifier => {
                let mut path = vec![self.expect_ident()?];
                while self.check(TokenKind::Dot) && self.peek(1) == TokenKind::Identifier {
                    self.advance();
                    path.push(self.expect_ident()?);
                }
                let args = if self.check(TokenKind::LBracket) && !self.at_array_suffix() {
                    self.advance();
                    self.parse_list(TokenKind::RBracket, |p| p.parse_type())?
                } else {
                    NodeList::new()
                };
                NodeKind::TypeReference { path, args }
            }
            TokenKind::LParen => {
                self.advance();
                let elements = self.parse_list(TokenKind::RParen, |p| p.parse_type())?;
                NodeKind::TupleType { elements }
            }
            TokenKind::Func => {
                self.advance();
                self.expect(TokenKind::LParen)?;
                let params = self.parse_list(TokenKind::RParen, |p| p.parse_type())?;
                let return_type = if self.eat(TokenKind::Arrow) { Some(Box::new(self.parse_type()?)) } else { None };
                NodeKind::FunctionType { params, return_type }
            }
            TokenKind::Amp => {
                self.advance();
                let is_const = self.eat(TokenKind::Const);
                let pointee = Box::new(self.parse_type()?);
                NodeKind::PointerType { is_const, pointee }
            }
            TokenKind::AmpAmp => {
                // `&&T` is a pointer to a pointer.
                self.advance();
                let inner_start = self.start();
                let is_const = self.eat(TokenKind::Const);
                let pointee = Box::new(self.parse_type()?);
                let inner_range = self.finish(inner_start);
                let inner = self.node(NodeKind::PointerType { is_const, pointee }, inner_range);
                NodeKind::PointerType { is_const: false, pointee: Box::new(inner) }
            }
            _ => return Err(self.error_expected("type")),
        };

        let range = self.finish(start);
        let ty = self.node(base, range);
        self.parse_type_suffixes(ty, start)
    }

    /// `[` after a named type opens generic arguments unless it is `[]`,
    /// `[N]` or `[macro!(...)]`.
    fn at_array_suffix(&self) -> bool {
        match self.peek(1) {
            TokenKind::RBracket => true,
            TokenKind::IntegerLiteral => self.peek(2) == TokenKind::RBracket,
            TokenKind::Identifier => self.peek(2) == TokenKind::Bang,
            _ => false,
        }
    }

    /// Trailing `[]`, `[N]` and `?`. Any `[` left after the base type is an
    /// array suffix; generic arguments were taken already.
    fn parse_type_suffixes(&mut self, mut ty: Node, start: Option<Range>) -> PResult<Node> {
        loop {
            let kind = if self.eat(TokenKind::LBracket) {
                let size = if self.check(TokenKind::RBracket) {
                    None
                } else {
                    Some(Box::new(self.with_struct_literals(true, |p| p.parse_expression())?))
                };
                self.expect(TokenKind::RBracket)?;
                NodeKind::ArrayType { element: Box::new(ty), size }
            } else if self.eat(TokenKind::Question) {
                NodeKind::OptionalType { inner: Box::new(ty) }
            } else {
                break;
            };
            let range = self.finish(start);
            ty = self.node(kind, range);
        }
        Ok(ty)
    }
}

// =============================================================================
// Errors
// =============================================================================

/// A parse error with location and friendly message.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ParseError {
    pub range: Option<Range>,
    pub message: String,
    pub hint: Option<String>,
    pub code: &'static str,
}

impl ParseError {
    fn expected(expected: &str, found: TokenKind, range: Option<Range>) -> Self {
        let message = format_expected_message(expected, found);
        let hint = crate::hints::for_expected(expected, found).map(String::from);
        Self { range, message, hint, code: codes::UNEXPECTED_TOKEN }
    }

    fn too_few_items(message: &str, range: Option<Range>) -> Self {
        Self { range, message: message.to_string(), hint: None, code: codes::TOO_FEW_ITEMS }
    }

    fn too_deeply_nested(range: Option<Range>) -> Self {
        Self {
            range,
            message: "too deeply nested".to_string(),
            hint: Some(format!("nesting is limited to {} levels", MAX_NESTING_DEPTH)),
            code: codes::TOO_DEEPLY_NESTED,
        }
    }
}

impl ToDiagnostic for ParseError {
    fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(&self.message).with_code(self.code).at(self.range);
        match &self.hint {
            Some(hint) => diag.with_help(hint),
            None => diag,
        }
    }
}

/// Format a user-friendly "expected X, found Y" message.
fn format_expected_message(expected: &str, found: TokenKind) -> String {
    match expected {
        "'{'" => format!("expected '{{' to start block, found {}", found),
        "'}'" => format!("expected '}}' to close block, found {}", found),
        "')'" if found == TokenKind::Eof => "unclosed '(' - missing ')'".to_string(),
        "']'" if found == TokenKind::Eof => "unclosed '[' - missing ']'".to_string(),
        "'`'" => "unclosed string expression - missing '`'".to_string(),
        "a name" => format!("expected name, found {}", found),
        _ => format!("expected {}, found {}", expected, found),
    }
}
