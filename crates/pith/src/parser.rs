//! Recursive-descent statement parser with a precedence-climbing expression
//! ladder.
//!
//! The parser never aborts. Unexpected input is recorded as a [`ParseError`]
//! diagnostic, one token is skipped, and parsing continues, so a script still
//! runs the portion that parsed. Blocks come in two shapes: layout blocks
//! (`:` newline indent ... dedent) and inline blocks (`:` followed by
//! statements on the same line, separated by `;`).

use std::rc::Rc;

use crate::{
    ast::{ArraySpec, BinaryOp, ClassMember, FuncDef, Node, NodeKind, SwitchArm, TypeSpec, TypeTag, UnaryOp},
    error::ParseError,
    lexer::tokenize,
    token::{Keyword, Token, TokenKind},
};

/// Parses a complete source string into a program node plus any diagnostics.
pub(crate) fn parse(source: &str) -> (Node, Vec<ParseError>) {
    let tokens = tokenize(source);
    Parser::new(tokens).parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    diagnostics: Vec<ParseError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            diagnostics: Vec::new(),
        }
    }

    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        &self.tokens[(self.pos + offset).min(self.tokens.len() - 1)].kind
    }

    fn line(&self) -> usize {
        self.tokens[self.pos.min(self.tokens.len() - 1)].line
    }

    fn advance(&mut self) -> TokenKind {
        let token = self.tokens[self.pos.min(self.tokens.len() - 1)].kind.clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Consumes the current token when it equals `kind`.
    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        self.eat(&TokenKind::Kw(kw))
    }

    fn at_kw(&self, kw: Keyword) -> bool {
        *self.peek() == TokenKind::Kw(kw)
    }

    fn error(&mut self, message: impl Into<String>) {
        let line = self.line();
        self.diagnostics.push(ParseError::new(line, message));
    }

    /// Consumes an identifier, or records a diagnostic and substitutes `_`.
    ///
    /// Keywords are accepted as names in the positions where the grammar
    /// accepts any word token.
    fn expect_name(&mut self, what: &str) -> String {
        match self.advance() {
            TokenKind::Ident(name) => name,
            TokenKind::Kw(kw) => kw.to_string(),
            other => {
                let line = self.line();
                self.diagnostics
                    .push(ParseError::new(line, format!("Expected {what}, found {}.", other.describe())));
                "_".to_owned()
            }
        }
    }

    // --- Program and blocks ---

    fn parse_program(mut self) -> (Node, Vec<ParseError>) {
        let mut stmts = Vec::new();
        while *self.peek() != TokenKind::Eof {
            match self.peek() {
                TokenKind::Newline | TokenKind::Semicolon | TokenKind::Indent | TokenKind::Dedent => {
                    self.advance();
                }
                _ => {
                    if let Some(stmt) = self.parse_statement() {
                        stmts.push(stmt);
                    }
                }
            }
        }
        (Node::new(NodeKind::Program(stmts), 0), self.diagnostics)
    }

    /// Parses a `:`-introduced block body.
    ///
    /// A newline after the colon opens a layout block terminated by the
    /// matching dedent; anything else is an inline block running to the end
    /// of the line (or to a `case`/`default`/`elif`/`else` that belongs to
    /// the enclosing construct).
    fn parse_block(&mut self) -> Vec<Node> {
        self.eat(&TokenKind::Colon);
        let mut stmts = Vec::new();

        if self.eat(&TokenKind::Newline) {
            if !self.eat(&TokenKind::Indent) {
                // `x:` followed by an unindented line is an empty block.
                return stmts;
            }
            loop {
                match self.peek() {
                    TokenKind::Dedent | TokenKind::Eof => break,
                    TokenKind::Newline | TokenKind::Semicolon => {
                        self.advance();
                    }
                    _ => {
                        if let Some(stmt) = self.parse_statement() {
                            stmts.push(stmt);
                        }
                    }
                }
            }
            self.eat(&TokenKind::Dedent);
        } else {
            loop {
                match self.peek() {
                    TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof => break,
                    TokenKind::Kw(Keyword::Case | Keyword::Default | Keyword::Elif | Keyword::Else) => break,
                    TokenKind::Semicolon => {
                        self.advance();
                    }
                    _ => {
                        if let Some(stmt) = self.parse_statement() {
                            stmts.push(stmt);
                        }
                    }
                }
            }
        }
        stmts
    }

    // --- Statements ---

    fn parse_statement(&mut self) -> Option<Node> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Kw(Keyword::Class) => Some(self.parse_class_def()),
            TokenKind::Kw(Keyword::Define) => {
                let def = self.parse_function_definition();
                Some(Node::new(NodeKind::FuncDef(def), line))
            }
            TokenKind::Kw(Keyword::Print) => Some(self.parse_print()),
            TokenKind::Kw(Keyword::Import) => {
                self.advance();
                let name = self.expect_name("module name after 'import'");
                Some(Node::new(NodeKind::Import(name), line))
            }
            TokenKind::Kw(kw) if kw.starts_declaration() => Some(self.parse_typed_decl()),
            TokenKind::Ident(_) if matches!(self.peek_at(1), TokenKind::Ident(_)) => Some(self.parse_named_decl()),
            TokenKind::Kw(Keyword::If) => Some(self.parse_if()),
            TokenKind::Kw(Keyword::While) => {
                self.advance();
                let cond = self.expect_expression("condition after 'while'")?;
                let body = self.parse_block();
                Some(Node::new(
                    NodeKind::While {
                        cond: Box::new(cond),
                        body,
                    },
                    line,
                ))
            }
            TokenKind::Kw(Keyword::Foreach) => self.parse_foreach(),
            TokenKind::Kw(Keyword::For) => self.parse_for(),
            TokenKind::Kw(Keyword::Do) => Some(self.parse_do_while()),
            TokenKind::Kw(Keyword::Switch) => self.parse_switch(),
            TokenKind::Kw(Keyword::Return) => {
                self.advance();
                let value = self.parse_expression().map(Box::new);
                Some(Node::new(NodeKind::Return(value), line))
            }
            TokenKind::Kw(Keyword::Pass) => {
                self.advance();
                Some(Node::new(NodeKind::Block(Vec::new()), line))
            }
            TokenKind::Kw(Keyword::Break) => {
                self.advance();
                Some(Node::new(NodeKind::Break, line))
            }
            TokenKind::Kw(Keyword::Continue) => {
                self.advance();
                Some(Node::new(NodeKind::Continue, line))
            }
            _ => {
                // Expression statement, possibly the target of an assignment.
                if let Some(expr) = self.parse_expression() {
                    if self.eat(&TokenKind::Assign) {
                        let value = self.expect_expression("expression after '='")?;
                        return Some(Node::new(
                            NodeKind::Assign {
                                target: Box::new(expr),
                                value: Box::new(value),
                            },
                            line,
                        ));
                    }
                    return Some(expr);
                }
                let found = self.peek().describe();
                self.error(format!("Unexpected {found}."));
                self.advance();
                None
            }
        }
    }

    fn parse_print(&mut self) -> Node {
        let line = self.line();
        self.advance();
        let mut args = Vec::new();
        self.eat(&TokenKind::LParen);
        if *self.peek() != TokenKind::RParen {
            loop {
                if let Some(arg) = self.expect_expression("expression in print()") {
                    args.push(arg);
                }
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.eat(&TokenKind::RParen);
        Node::new(NodeKind::Print(args), line)
    }

    /// `type name (= expr)?` with optional `<...>` generics and `[size?]`.
    fn parse_typed_decl(&mut self) -> Node {
        let line = self.line();
        let TokenKind::Kw(base) = self.advance() else {
            unreachable!("caller checked for a type keyword");
        };
        let type_spec = self.parse_generic_suffix(base);

        let array = if self.eat(&TokenKind::LBracket) {
            let spec = if matches!(self.peek(), TokenKind::IntLit(_)) {
                let size = self.parse_expression().expect("int literal is an expression");
                ArraySpec::Sized(Box::new(size))
            } else {
                ArraySpec::Unsized
            };
            self.eat(&TokenKind::RBracket);
            Some(spec)
        } else {
            None
        };

        let name = self.expect_name("variable name");
        let init = if self.eat(&TokenKind::Assign) {
            self.expect_expression("initializer after '='").map(Box::new)
        } else {
            None
        };
        Node::new(
            NodeKind::VarDecl {
                name,
                type_spec,
                array,
                init,
            },
            line,
        )
    }

    /// `Type name (= expr)?` where `Type` is a user-defined class name.
    fn parse_named_decl(&mut self) -> Node {
        let line = self.line();
        let type_name = self.expect_name("type name");
        let name = self.expect_name("variable name");
        let init = if self.eat(&TokenKind::Assign) {
            self.expect_expression("initializer after '='").map(Box::new)
        } else {
            None
        };
        Node::new(
            NodeKind::VarDecl {
                name,
                type_spec: TypeSpec::Named(type_name),
                array: None,
                init,
            },
            line,
        )
    }

    /// Reads the `<inner>` / `<key, value>` suffix of `list` and `map`.
    fn parse_generic_suffix(&mut self, base: Keyword) -> TypeSpec {
        if matches!(base, Keyword::List | Keyword::Map) && self.eat(&TokenKind::Lt) {
            let first = self.expect_name("type parameter");
            if self.eat(&TokenKind::Comma) {
                let second = self.expect_name("type parameter");
                self.eat(&TokenKind::Gt);
                TypeSpec::Map {
                    key: TypeTag::from_name(&first),
                    value: TypeTag::from_name(&second),
                }
            } else {
                self.eat(&TokenKind::Gt);
                TypeSpec::List(first)
            }
        } else {
            TypeSpec::Builtin(base.to_string())
        }
    }

    /// `define [retType] name(params) : block`.
    ///
    /// Parameter and return types are accepted and discarded; only the
    /// parameter names survive into the definition.
    fn parse_function_definition(&mut self) -> Rc<FuncDef> {
        self.advance(); // 'define'

        // Without a return type the name is immediately followed by '('.
        if *self.peek_at(1) != TokenKind::LParen {
            self.advance(); // return type
            if self.eat(&TokenKind::LBracket) {
                // Generic return types like list[int].
                while !matches!(self.peek(), TokenKind::RBracket | TokenKind::Eof) {
                    self.advance();
                }
                self.eat(&TokenKind::RBracket);
            }
        }
        let line = self.line();
        let name = self.expect_name("function name");

        self.eat(&TokenKind::LParen);
        let mut params = Vec::new();
        if *self.peek() != TokenKind::RParen {
            loop {
                if matches!(self.peek_at(1), TokenKind::Ident(_)) {
                    self.advance(); // parameter type
                }
                params.push(self.expect_name("parameter name"));
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.eat(&TokenKind::RParen);

        let body = self.parse_block();
        Rc::new(FuncDef {
            name,
            params,
            body,
            line,
        })
    }

    /// `class Name (extends Parent)? : members`.
    fn parse_class_def(&mut self) -> Node {
        let line = self.line();
        self.advance(); // 'class'
        let name = self.expect_name("class name");

        let parent = if self.eat_kw(Keyword::Extends) {
            Some(self.expect_name("parent class name"))
        } else {
            None
        };

        let mut members = Vec::new();
        if *self.peek() == TokenKind::Colon {
            self.advance();
            let layout = self.eat(&TokenKind::Newline);
            if layout {
                self.eat(&TokenKind::Indent);
            }
            loop {
                match self.peek() {
                    TokenKind::Dedent | TokenKind::Eof => break,
                    TokenKind::Newline if !layout => break,
                    TokenKind::Newline | TokenKind::Semicolon => {
                        self.advance();
                    }
                    TokenKind::Kw(Keyword::Pass) => {
                        self.advance();
                    }
                    TokenKind::Kw(Keyword::Define) => {
                        members.push(ClassMember::Method(self.parse_function_definition()));
                    }
                    _ => members.push(self.parse_field_decl()),
                }
            }
            if layout {
                self.eat(&TokenKind::Dedent);
            }
        }
        Node::new(NodeKind::ClassDef { name, parent, members }, line)
    }

    /// A field declaration inside a class body: `type name`, with the same
    /// generic and array suffixes as variable declarations. The type is
    /// recorded only as documentation; the runtime initialises every field
    /// to void.
    fn parse_field_decl(&mut self) -> ClassMember {
        let type_token = self.advance();
        if let TokenKind::Kw(base @ (Keyword::List | Keyword::Map)) = type_token {
            self.parse_generic_suffix(base);
        }
        if self.eat(&TokenKind::LBracket) {
            self.eat(&TokenKind::RBracket);
        }
        let line = self.line();
        let name = self.expect_name("field name");
        ClassMember::Field { name, line }
    }

    fn parse_if(&mut self) -> Node {
        let line = self.line();
        self.advance(); // 'if' or 'elif'
        let cond = self
            .expect_expression("condition after 'if'")
            .unwrap_or(Node::new(NodeKind::BoolLit(false), line));
        let then_body = self.parse_block();

        let else_branch = if self.at_kw(Keyword::Elif) {
            // Each elif becomes the if of the previous branch's else.
            Some(Box::new(self.parse_if()))
        } else if self.eat_kw(Keyword::Else) {
            let else_line = self.line();
            let body = self.parse_block();
            Some(Box::new(Node::new(NodeKind::Block(body), else_line)))
        } else {
            None
        };

        Node::new(
            NodeKind::If {
                cond: Box::new(cond),
                then_body,
                else_branch,
            },
            line,
        )
    }

    fn parse_foreach(&mut self) -> Option<Node> {
        let line = self.line();
        self.advance();
        self.eat(&TokenKind::LParen);
        self.advance(); // loop variable type, discarded
        let var = self.expect_name("loop variable name");
        if !self.eat_kw(Keyword::In) {
            self.error("Expected 'in' keyword in foreach-loop.");
        }
        let iterable = self.expect_expression("collection after 'in'")?;
        self.eat(&TokenKind::RParen);
        let body = self.parse_block();
        Some(Node::new(
            NodeKind::Foreach {
                var,
                iterable: Box::new(iterable),
                body,
            },
            line,
        ))
    }

    fn parse_for(&mut self) -> Option<Node> {
        let line = self.line();
        self.advance();
        self.eat(&TokenKind::LParen);
        let init = self.parse_statement()?;
        self.eat(&TokenKind::Semicolon);
        let cond = self.expect_expression("loop condition")?;
        self.eat(&TokenKind::Semicolon);
        let step = self.parse_statement()?;
        self.eat(&TokenKind::RParen);
        let body = self.parse_block();
        Some(Node::new(
            NodeKind::For {
                init: Box::new(init),
                cond: Box::new(cond),
                step: Box::new(step),
                body,
            },
            line,
        ))
    }

    fn parse_do_while(&mut self) -> Node {
        let line = self.line();
        self.advance();
        let body = self.parse_block();
        let cond = if self.eat_kw(Keyword::While) {
            self.eat(&TokenKind::LParen);
            let cond = self.expect_expression("condition after 'while'");
            self.eat(&TokenKind::RParen);
            cond.map(Box::new)
        } else {
            self.error("Expected 'while' after 'do' block.");
            None
        };
        Node::new(NodeKind::DoWhile { body, cond }, line)
    }

    fn parse_switch(&mut self) -> Option<Node> {
        let line = self.line();
        self.advance();
        self.eat(&TokenKind::LParen);
        let scrutinee = self.expect_expression("switch scrutinee")?;
        self.eat(&TokenKind::RParen);
        self.eat(&TokenKind::Colon);

        let layout = self.eat(&TokenKind::Newline);
        if layout {
            self.eat(&TokenKind::Indent);
        }

        let mut arms = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Dedent | TokenKind::Eof => break,
                TokenKind::Newline if !layout => break,
                TokenKind::Newline | TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::Kw(Keyword::Case) => {
                    let arm_line = self.line();
                    self.advance();
                    let Some(value) = self.expect_expression("case value") else {
                        continue;
                    };
                    let body = self.parse_block();
                    arms.push(SwitchArm::Case {
                        value,
                        body,
                        line: arm_line,
                    });
                }
                TokenKind::Kw(Keyword::Default) => {
                    let arm_line = self.line();
                    self.advance();
                    let body = self.parse_block();
                    arms.push(SwitchArm::Default { body, line: arm_line });
                }
                _ => {
                    self.advance();
                }
            }
        }
        if layout {
            self.eat(&TokenKind::Dedent);
        }
        Some(Node::new(
            NodeKind::Switch {
                scrutinee: Box::new(scrutinee),
                arms,
            },
            line,
        ))
    }

    // --- Expressions (precedence-climbing ladder) ---

    fn parse_expression(&mut self) -> Option<Node> {
        self.parse_logic_or()
    }

    /// Like [`parse_expression`] but records a diagnostic when nothing
    /// expression-shaped is present.
    fn expect_expression(&mut self, what: &str) -> Option<Node> {
        let expr = self.parse_expression();
        if expr.is_none() {
            self.error(format!("Expected {what}."));
        }
        expr
    }

    fn parse_logic_or(&mut self) -> Option<Node> {
        let mut lhs = self.parse_logic_and()?;
        while self.at_kw(Keyword::Or) {
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("operand after 'or'") else {
                return Some(lhs);
            };
            lhs = binary(BinaryOp::Or, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_logic_and(&mut self) -> Option<Node> {
        let mut lhs = self.parse_equality()?;
        while self.at_kw(Keyword::And) {
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("operand after 'and'") else {
                return Some(lhs);
            };
            lhs = binary(BinaryOp::And, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_equality(&mut self) -> Option<Node> {
        let mut lhs = self.parse_comparison()?;
        loop {
            let op = match self.peek() {
                TokenKind::EqEq => BinaryOp::Eq,
                TokenKind::Ne => BinaryOp::Ne,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("right-hand operand") else {
                return Some(lhs);
            };
            lhs = binary(op, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_comparison(&mut self) -> Option<Node> {
        let mut lhs = self.parse_term()?;
        loop {
            let op = match self.peek() {
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::Ge => BinaryOp::Ge,
                TokenKind::Le => BinaryOp::Le,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("right-hand operand") else {
                return Some(lhs);
            };
            lhs = binary(op, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_term(&mut self) -> Option<Node> {
        let mut lhs = self.parse_factor()?;
        loop {
            let op = match self.peek() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("right-hand operand") else {
                return Some(lhs);
            };
            lhs = binary(op, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_factor(&mut self) -> Option<Node> {
        let mut lhs = self.parse_power()?;
        loop {
            let op = match self.peek() {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                TokenKind::Percent => BinaryOp::Rem,
                _ => break,
            };
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("right-hand operand") else {
                return Some(lhs);
            };
            lhs = binary(op, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_power(&mut self) -> Option<Node> {
        let mut lhs = self.parse_unary()?;
        while *self.peek() == TokenKind::Caret {
            let line = self.line();
            self.advance();
            let Some(rhs) = self.expect_expression("right-hand operand") else {
                return Some(lhs);
            };
            lhs = binary(BinaryOp::Pow, lhs, rhs, line);
        }
        Some(lhs)
    }

    fn parse_unary(&mut self) -> Option<Node> {
        let op = match self.peek() {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Minus => UnaryOp::Neg,
            _ => return self.parse_postfix(),
        };
        let line = self.line();
        self.advance();
        let operand = self.parse_unary()?;
        Some(Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            line,
        ))
    }

    /// Postfix chain: calls `(...)`, field access `.name`, index `[...]`.
    fn parse_postfix(&mut self) -> Option<Node> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                TokenKind::LParen => {
                    let line = self.line();
                    self.advance();
                    let mut args = Vec::new();
                    if *self.peek() != TokenKind::RParen {
                        loop {
                            if let Some(arg) = self.expect_expression("call argument") {
                                args.push(arg);
                            }
                            if !self.eat(&TokenKind::Comma) {
                                break;
                            }
                        }
                    }
                    self.eat(&TokenKind::RParen);
                    expr = Node::new(
                        NodeKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        line,
                    );
                }
                TokenKind::Dot => {
                    let line = self.line();
                    self.advance();
                    let field = self.expect_name("member name after '.'");
                    expr = Node::new(
                        NodeKind::FieldAccess {
                            object: Box::new(expr),
                            field,
                        },
                        line,
                    );
                }
                TokenKind::LBracket => {
                    let line = self.line();
                    self.advance();
                    let Some(index) = self.expect_expression("index expression") else {
                        self.eat(&TokenKind::RBracket);
                        return Some(expr);
                    };
                    self.eat(&TokenKind::RBracket);
                    expr = Node::new(
                        NodeKind::IndexAccess {
                            object: Box::new(expr),
                            index: Box::new(index),
                        },
                        line,
                    );
                }
                _ => break,
            }
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Node> {
        let line = self.line();
        match self.peek().clone() {
            TokenKind::Kw(Keyword::New) => {
                self.advance();
                // `new Name(args)` reuses the postfix parser so the class
                // expression may itself be a dotted or indexed path.
                let target = self.parse_postfix()?;
                let node = match target.kind {
                    NodeKind::Call { callee, args } => NodeKind::New { class: callee, args },
                    _ => NodeKind::New {
                        class: Box::new(target),
                        args: Vec::new(),
                    },
                };
                Some(Node::new(node, line))
            }
            TokenKind::IntLit(text) => {
                self.advance();
                Some(Node::new(NodeKind::IntLit(text.parse().unwrap_or(i32::MAX)), line))
            }
            TokenKind::FloatLit(text) => {
                self.advance();
                Some(Node::new(NodeKind::FloatLit(text.parse().unwrap_or(0.0)), line))
            }
            TokenKind::StrLit(text) => {
                self.advance();
                Some(Node::new(NodeKind::StrLit(text), line))
            }
            TokenKind::Kw(Keyword::True) => {
                self.advance();
                Some(Node::new(NodeKind::BoolLit(true), line))
            }
            TokenKind::Kw(Keyword::False) => {
                self.advance();
                Some(Node::new(NodeKind::BoolLit(false), line))
            }
            TokenKind::Ident(name) => {
                self.advance();
                Some(Node::new(NodeKind::VarRef(name), line))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expect_expression("expression after '('");
                self.eat(&TokenKind::RParen);
                expr
            }
            TokenKind::LBracket => {
                self.advance();
                let mut items = Vec::new();
                if *self.peek() != TokenKind::RBracket {
                    loop {
                        if let Some(item) = self.expect_expression("list element") {
                            items.push(item);
                        }
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.eat(&TokenKind::RBracket);
                Some(Node::new(NodeKind::ListLit(items), line))
            }
            TokenKind::LBrace => {
                self.advance();
                let mut pairs = Vec::new();
                if *self.peek() != TokenKind::RBrace {
                    loop {
                        let Some(key) = self.expect_expression("map key") else {
                            break;
                        };
                        self.eat(&TokenKind::Colon);
                        let Some(value) = self.expect_expression("map value") else {
                            break;
                        };
                        pairs.push((key, value));
                        if !self.eat(&TokenKind::Comma) {
                            break;
                        }
                    }
                }
                self.eat(&TokenKind::RBrace);
                Some(Node::new(NodeKind::MapLit(pairs), line))
            }
            _ => None,
        }
    }
}

fn binary(op: BinaryOp, lhs: Node, rhs: Node, line: usize) -> Node {
    Node::new(
        NodeKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        },
        line,
    )
}
