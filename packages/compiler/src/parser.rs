//! Recursive-descent parser for the component language.

use crate::ast::{
    ActionDef, AttrDef, DirectiveNode, Element, Expr, Import, Program, PropDef,
    SourceDirective, StateDef, StyleBlock, TextPart, ViewNode,
};
use crate::error::{CompileError, CompilePhase};
use crate::lexer::Lexer;
use crate::token::{Span, Token, TokenKind};
use rustc_hash::FxHashSet;

/// Directive names with fixed meanings; an event binding may not shadow
/// them.
const RESERVED_DIRECTIVES: &[&str] = &["page", "route", "client", "server", "if", "for"];

pub struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

/// Parses a full component source file.
pub fn parse(source: &str) -> Result<Program, CompileError> {
    let tokens = Lexer::new(source).tokenize()?;
    Parser {
        source,
        tokens,
        pos: 0,
    }
    .program()
}

/// Parses a standalone expression (used for interpolation holes).
pub fn parse_expression(source: &str, origin: Span) -> Result<Expr, CompileError> {
    let tokens = Lexer::new(source)
        .tokenize()
        .map_err(|e| reposition(e, origin))?;
    let mut parser = Parser {
        source,
        tokens,
        pos: 0,
    };
    parser.skip_newlines();
    let expr = parser.expr().map_err(|e| reposition(e, origin))?;
    parser.skip_newlines();
    if !parser.at_eof() {
        return Err(reposition(
            parser.error_here("unexpected trailing tokens in expression"),
            origin,
        ));
    }
    Ok(expr)
}

/// Errors from sub-parsed fragments report the position of the enclosing
/// string literal.
fn reposition(mut error: CompileError, origin: Span) -> CompileError {
    error.line = origin.line;
    error.column = origin.column;
    error
}

impl<'a> Parser<'a> {
    // ---- token plumbing ----

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn next(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), TokenKind::Eof)
    }

    fn skip_newlines(&mut self) {
        while matches!(
            self.peek_kind(),
            TokenKind::Newline | TokenKind::Punct(';')
        ) {
            self.next();
        }
    }

    fn error_here(&self, message: impl Into<String>) -> CompileError {
        let span = self.peek().span;
        CompileError::new(CompilePhase::Parser, message, span.line, span.column)
    }

    fn error_at(&self, span: Span, message: impl Into<String>) -> CompileError {
        CompileError::new(CompilePhase::Parser, message, span.line, span.column)
    }

    fn expect_punct(&mut self, c: char) -> Result<Token, CompileError> {
        match self.peek_kind() {
            TokenKind::Punct(found) if *found == c => Ok(self.next()),
            other => Err(self.error_here(format!("expected `{c}`, found {}", show(other)))),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), CompileError> {
        match self.peek_kind().clone() {
            TokenKind::Ident(name) => {
                let token = self.next();
                Ok((name, token.span))
            }
            other => Err(self.error_here(format!("expected an identifier, found {}", show(&other)))),
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), CompileError> {
        let (name, span) = self.expect_ident()?;
        if name != keyword {
            return Err(self.error_at(span, format!("expected `{keyword}`, found `{name}`")));
        }
        Ok(())
    }

    fn expect_string(&mut self) -> Result<(String, Span), CompileError> {
        match self.peek_kind().clone() {
            TokenKind::Str { value, .. } => {
                let token = self.next();
                Ok((value, token.span))
            }
            other => Err(self.error_here(format!("expected a string literal, found {}", show(&other)))),
        }
    }

    fn eat_punct(&mut self, c: char) -> bool {
        if matches!(self.peek_kind(), TokenKind::Punct(found) if *found == c) {
            self.next();
            true
        } else {
            false
        }
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek_kind(), TokenKind::Op(found) if *found == op) {
            self.next();
            true
        } else {
            false
        }
    }

    // ---- top level ----

    fn program(&mut self) -> Result<Program, CompileError> {
        let mut program = Program::default();

        self.skip_newlines();
        // a leading string literal is the source directive
        if let TokenKind::Str { value, .. } = self.peek_kind().clone() {
            let normalized = value.trim().to_ascii_lowercase();
            let token = self.next();
            program.directive = match normalized.as_str() {
                "use client" => Some(SourceDirective::UseClient),
                "use server" => Some(SourceDirective::UseServer),
                _ => {
                    return Err(self
                        .error_at(token.span, format!("unknown source directive `{value}`"))
                        .with_suggestion("expected 'use client' or 'use server'"));
                }
            };
            self.skip_newlines();
            if matches!(self.peek_kind(), TokenKind::Str { .. }) {
                return Err(self
                    .error_here("a file may carry at most one source directive"));
            }
        }

        loop {
            self.skip_newlines();
            if self.at_eof() {
                break;
            }
            match self.peek_kind().clone() {
                TokenKind::Ident(word) => match word.as_str() {
                    "import" => {
                        let import = self.import()?;
                        program.imports.push(import);
                    }
                    "props" => {
                        let defs = self.key_value_block("props")?;
                        program.props =
                            defs.into_iter()
                                .map(|(name, default, span)| PropDef {
                                    name,
                                    default,
                                    span,
                                })
                                .collect();
                    }
                    "state" => {
                        let defs = self.key_value_block("state")?;
                        program.state = defs
                            .into_iter()
                            .map(|(name, init, span)| StateDef { name, init, span })
                            .collect();
                    }
                    "actions" => {
                        program.actions = self.actions_block()?;
                    }
                    "view" => {
                        self.expect_keyword("view")?;
                        self.skip_newlines();
                        self.expect_punct('{')?;
                        program.view = self.view_children()?;
                    }
                    "style" => {
                        program.style = Some(self.style_block()?);
                    }
                    other => {
                        return Err(self.error_here(format!(
                            "unexpected `{other}` at the top level"
                        )));
                    }
                },
                TokenKind::Directive(name) => match name.as_str() {
                    "page" => {
                        let token = self.next();
                        if program.page.is_some() {
                            return Err(self
                                .error_at(token.span, "duplicate @page declaration"));
                        }
                        let (name, _) = self.expect_ident()?;
                        program.page = Some(name);
                    }
                    "route" => {
                        let token = self.next();
                        if program.route.is_some() {
                            return Err(self
                                .error_at(token.span, "duplicate @route declaration"));
                        }
                        let (path, _) = self.expect_string()?;
                        program.route = Some(path);
                    }
                    other => {
                        return Err(self.error_here(format!(
                            "unexpected directive @{other} at the top level"
                        )));
                    }
                },
                TokenKind::Str { .. } => {
                    return Err(self.error_here(
                        "a source directive must be the first token in the file",
                    ));
                }
                other => {
                    return Err(self.error_here(format!(
                        "unexpected {} at the top level",
                        show(&other)
                    )));
                }
            }
        }
        Ok(program)
    }

    fn import(&mut self) -> Result<Import, CompileError> {
        self.expect_keyword("import")?;
        let (name, span) = self.expect_ident()?;
        self.expect_keyword("from")?;
        let (path, _) = self.expect_string()?;
        Ok(Import { name, path, span })
    }

    /// `props { k: v, ... }` and `state { k: v, ... }` share a shape.
    /// Duplicate keys are rejected.
    fn key_value_block(
        &mut self,
        block: &str,
    ) -> Result<Vec<(String, Expr, Span)>, CompileError> {
        self.expect_keyword(block)?;
        self.skip_newlines();
        self.expect_punct('{')?;
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat_punct('}') {
                break;
            }
            let (name, span) = self.expect_ident()?;
            if !seen.insert(name.clone()) {
                return Err(self
                    .error_at(span, format!("duplicate {block} key `{name}`")));
            }
            self.expect_punct(':')?;
            let value = self.expr()?;
            out.push((name, value, span));
            if !self.eat_punct(',') {
                self.skip_newlines();
            }
        }
        Ok(out)
    }

    fn actions_block(&mut self) -> Result<Vec<ActionDef>, CompileError> {
        self.expect_keyword("actions")?;
        self.skip_newlines();
        self.expect_punct('{')?;
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat_punct('}') {
                break;
            }
            let (name, span) = self.expect_ident()?;
            self.expect_punct('(')?;
            let mut params = Vec::new();
            loop {
                self.skip_newlines();
                if self.eat_punct(')') {
                    break;
                }
                let (param, _) = self.expect_ident()?;
                params.push(param);
                if !self.eat_punct(',') {
                    self.skip_newlines();
                    self.expect_punct(')')?;
                    break;
                }
            }
            self.skip_newlines();
            self.expect_punct('{')?;
            let mut body = Vec::new();
            loop {
                self.skip_newlines();
                if self.eat_punct('}') {
                    break;
                }
                body.push(self.expr()?);
            }
            out.push(ActionDef {
                name,
                params,
                body,
                span,
            });
        }
        Ok(out)
    }

    fn style_block(&mut self) -> Result<StyleBlock, CompileError> {
        self.expect_keyword("style")?;
        self.skip_newlines();
        let open = self.expect_punct('{')?;
        let content_start = open.span.offset + open.span.len;
        let mut depth = 1usize;
        let mut content_end = content_start;
        loop {
            match self.peek_kind() {
                TokenKind::Eof => {
                    return Err(self.error_here("unterminated style block"));
                }
                TokenKind::Punct('{') => {
                    depth += 1;
                    let t = self.next();
                    content_end = t.span.offset + t.span.len;
                }
                TokenKind::Punct('}') => {
                    depth -= 1;
                    let t = self.next();
                    if depth == 0 {
                        content_end = t.span.offset;
                        break;
                    }
                    content_end = t.span.offset + t.span.len;
                }
                _ => {
                    let t = self.next();
                    content_end = t.span.offset + t.span.len;
                }
            }
        }
        Ok(StyleBlock {
            css: self.source[content_start..content_end].trim().to_string(),
            span: open.span,
        })
    }

    // ---- view ----

    /// Parses children until the matching `}`.
    fn view_children(&mut self) -> Result<Vec<ViewNode>, CompileError> {
        let mut out = Vec::new();
        loop {
            self.skip_newlines();
            if self.eat_punct('}') {
                break;
            }
            if self.at_eof() {
                return Err(self.error_here("unterminated view block"));
            }
            out.push(self.view_node()?);
        }
        Ok(out)
    }

    fn view_node(&mut self) -> Result<ViewNode, CompileError> {
        match self.peek_kind().clone() {
            TokenKind::Str { value, .. } => {
                let token = self.next();
                Ok(ViewNode::Text {
                    parts: parse_text_parts(&value, token.span)?,
                    span: token.span,
                })
            }
            TokenKind::Ident(_) | TokenKind::Punct('.') | TokenKind::Punct('#') => {
                self.element().map(ViewNode::Element)
            }
            other => Err(self.error_here(format!(
                "expected an element or a string, found {}",
                show(&other)
            ))),
        }
    }

    fn element(&mut self) -> Result<Element, CompileError> {
        let start = self.peek().clone();
        let mut tag = String::new();
        let mut classes = Vec::new();
        let mut id = None;

        let mut prev = if let TokenKind::Ident(name) = self.peek_kind().clone() {
            tag = name;
            self.next()
        } else {
            start.clone()
        };

        // glued `.class` / `#id` parts; a gap ends the selector
        loop {
            let marker = match self.peek_kind() {
                TokenKind::Punct(c @ ('.' | '#')) => *c,
                _ => break,
            };
            let consumed_any = !tag.is_empty() || !classes.is_empty() || id.is_some();
            if consumed_any && !self.peek().is_adjacent_to(&prev) {
                break;
            }
            self.next();
            let (name, span) = self.expect_ident()?;
            if marker == '.' {
                classes.push(name);
            } else if id.replace(name).is_some() {
                return Err(self.error_at(span, "an element may have only one #id"));
            }
            prev = self.tokens[self.pos - 1].clone();
        }
        if tag.is_empty() {
            tag = "div".to_string();
        }

        // `[name=value]` attributes
        let mut attrs = Vec::new();
        while self.eat_punct('[') {
            attrs.push(self.attribute()?);
        }

        // directives bind to the element they follow
        let mut directives = Vec::new();
        while let TokenKind::Directive(name) = self.peek_kind().clone() {
            let token = self.next();
            match name.as_str() {
                "client" => directives.push(DirectiveNode::Client),
                "server" => directives.push(DirectiveNode::Server),
                "if" => {
                    self.expect_punct('(')?;
                    let cond = self.expr()?;
                    self.expect_punct(')')?;
                    directives.push(DirectiveNode::If { cond });
                }
                "for" => {
                    self.expect_punct('(')?;
                    let (binding, _) = self.expect_ident()?;
                    self.expect_keyword("in")?;
                    let seq = self.expr()?;
                    self.expect_punct(')')?;
                    directives.push(DirectiveNode::For { binding, seq });
                }
                "page" | "route" => {
                    return Err(self.error_at(
                        token.span,
                        format!("@{name} is reserved and cannot be attached to an element"),
                    ));
                }
                event => {
                    debug_assert!(!RESERVED_DIRECTIVES.contains(&event));
                    self.expect_punct('(')?;
                    let handler = self.expr()?;
                    self.expect_punct(')')?;
                    directives.push(DirectiveNode::Event {
                        event: event.to_string(),
                        handler,
                        span: token.span,
                    });
                }
            }
        }

        // body: block children, a single quoted text child, or nothing
        let children = if self.eat_punct('{') {
            self.view_children()?
        } else if let TokenKind::Str { value, .. } = self.peek_kind().clone() {
            let token = self.next();
            vec![ViewNode::Text {
                parts: parse_text_parts(&value, token.span)?,
                span: token.span,
            }]
        } else {
            Vec::new()
        };

        Ok(Element {
            tag,
            classes,
            id,
            attrs,
            directives,
            children,
            span: start.span,
        })
    }

    /// One `[name=value]` or `[name]` attribute; the opening `[` is already
    /// consumed. Attribute names may contain `-`.
    fn attribute(&mut self) -> Result<AttrDef, CompileError> {
        let (mut name, span) = self.expect_ident()?;
        loop {
            let mut glued = false;
            if matches!(self.peek_kind(), TokenKind::Op("-"))
                && self.peek().is_adjacent_to(&self.tokens[self.pos - 1])
            {
                self.next();
                name.push('-');
                let (part, _) = self.expect_ident()?;
                name.push_str(&part);
                glued = true;
            }
            if !glued {
                break;
            }
        }
        let value = if self.eat_op("=") {
            match self.peek_kind().clone() {
                TokenKind::Str { value, .. } => {
                    let token = self.next();
                    parse_text_parts(&value, token.span)?
                }
                TokenKind::Number(raw) => {
                    self.next();
                    vec![TextPart::Literal(raw)]
                }
                TokenKind::Ident(word) => {
                    self.next();
                    vec![TextPart::Literal(word)]
                }
                TokenKind::Punct('{') => {
                    // `[value={expr}]` binds the attribute to an expression
                    self.next();
                    let expr = self.expr()?;
                    self.expect_punct('}')?;
                    vec![TextPart::Interpolation(expr)]
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected an attribute value, found {}",
                        show(&other)
                    )));
                }
            }
        } else {
            Vec::new()
        };
        self.expect_punct(']')?;
        Ok(AttrDef { name, value, span })
    }

    // ---- expressions ----

    pub(crate) fn expr(&mut self) -> Result<Expr, CompileError> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr, CompileError> {
        let left = self.nullish()?;
        for op in ["=", "??="] {
            if self.eat_op(op) {
                match &left {
                    Expr::Ident(..) | Expr::Member { .. } => {}
                    _ => {
                        return Err(self
                            .error_here("left side of an assignment must be a name"));
                    }
                }
                let value = self.assignment()?;
                return Ok(Expr::Assign {
                    op: if op == "=" { "=" } else { "??=" },
                    target: Box::new(left),
                    value: Box::new(value),
                });
            }
        }
        Ok(left)
    }

    fn nullish(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.logical_or()?;
        while self.eat_op("??") {
            let right = self.logical_or()?;
            left = Expr::Binary {
                op: "??",
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_or(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.logical_and()?;
        while self.eat_op("||") {
            let right = self.logical_and()?;
            left = Expr::Binary {
                op: "||",
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn logical_and(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.equality()?;
        while self.eat_op("&&") {
            let right = self.equality()?;
            left = Expr::Binary {
                op: "&&",
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.comparison()?;
        loop {
            let op = ["===", "!==", "==", "!="]
                .into_iter()
                .find(|op| self.eat_op(op));
            match op {
                Some(op) => {
                    let right = self.comparison()?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                None => return Ok(left),
            }
        }
    }

    fn comparison(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.additive()?;
        loop {
            let op = ["<=", ">=", "<", ">"].into_iter().find(|op| self.eat_op(op));
            match op {
                Some(op) => {
                    let right = self.additive()?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                None => return Ok(left),
            }
        }
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.multiplicative()?;
        loop {
            let op = ["+", "-"].into_iter().find(|op| self.eat_op(op));
            match op {
                Some(op) => {
                    let right = self.multiplicative()?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                None => return Ok(left),
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        let mut left = self.unary()?;
        loop {
            let op = ["*", "/", "%"].into_iter().find(|op| self.eat_op(op));
            match op {
                Some(op) => {
                    let right = self.unary()?;
                    left = Expr::Binary {
                        op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                }
                None => return Ok(left),
            }
        }
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        for op in ["!", "-"] {
            if self.eat_op(op) {
                let expr = self.unary()?;
                return Ok(Expr::Unary {
                    op: if op == "!" { "!" } else { "-" },
                    expr: Box::new(expr),
                });
            }
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Result<Expr, CompileError> {
        let mut expr = self.primary()?;
        loop {
            if self.eat_op("++") {
                expr = Expr::Postfix {
                    op: "++",
                    expr: Box::new(expr),
                };
            } else if self.eat_op("--") {
                expr = Expr::Postfix {
                    op: "--",
                    expr: Box::new(expr),
                };
            } else if self.eat_punct('.') {
                let (property, _) = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: false,
                };
            } else if self.eat_op("?.") {
                let (property, _) = self.expect_ident()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                    optional: true,
                };
            } else if matches!(self.peek_kind(), TokenKind::Punct('(')) {
                let open = self.next();
                let mut args = Vec::new();
                loop {
                    self.skip_newlines();
                    if self.eat_punct(')') {
                        break;
                    }
                    args.push(self.expr()?);
                    if !self.eat_punct(',') {
                        self.skip_newlines();
                        self.expect_punct(')')?;
                        break;
                    }
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                    span: open.span,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        match self.peek_kind().clone() {
            TokenKind::Number(raw) => {
                self.next();
                Ok(Expr::Number(raw))
            }
            TokenKind::Str { value, .. } => {
                self.next();
                Ok(Expr::Str(value))
            }
            TokenKind::Ident(word) => {
                let token = self.next();
                match word.as_str() {
                    "true" => Ok(Expr::Bool(true)),
                    "false" => Ok(Expr::Bool(false)),
                    "null" => Ok(Expr::Null),
                    _ => Ok(Expr::Ident(word, token.span)),
                }
            }
            TokenKind::Punct('(') => {
                self.next();
                self.skip_newlines();
                let expr = self.expr()?;
                self.skip_newlines();
                self.expect_punct(')')?;
                Ok(expr)
            }
            TokenKind::Punct('[') => {
                self.next();
                let mut items = Vec::new();
                loop {
                    self.skip_newlines();
                    if self.eat_punct(']') {
                        break;
                    }
                    items.push(self.expr()?);
                    if !self.eat_punct(',') {
                        self.skip_newlines();
                        self.expect_punct(']')?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            other => Err(self.error_here(format!(
                "expected an expression, found {}",
                show(&other)
            ))),
        }
    }
}

/// Splits raw string-literal text into literal runs and `{expr}` holes.
pub fn parse_text_parts(raw: &str, origin: Span) -> Result<Vec<TextPart>, CompileError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '{' {
            let mut depth = 1usize;
            let mut inner = String::new();
            for c in chars.by_ref() {
                match c {
                    '{' => {
                        depth += 1;
                        inner.push(c);
                    }
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                        inner.push(c);
                    }
                    _ => inner.push(c),
                }
            }
            if depth != 0 {
                return Err(CompileError::new(
                    CompilePhase::Parser,
                    "unterminated `{` interpolation in string",
                    origin.line,
                    origin.column,
                ));
            }
            if !literal.is_empty() {
                parts.push(TextPart::Literal(std::mem::take(&mut literal)));
            }
            parts.push(TextPart::Interpolation(parse_expression(&inner, origin)?));
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() || parts.is_empty() {
        parts.push(TextPart::Literal(literal));
    }
    Ok(parts)
}

fn show(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Ident(name) => format!("`{name}`"),
        TokenKind::Number(raw) => format!("number `{raw}`"),
        TokenKind::Str { .. } => "a string literal".to_string(),
        TokenKind::Directive(name) => format!("directive `@{name}`"),
        TokenKind::Punct(c) => format!("`{c}`"),
        TokenKind::Op(op) => format!("`{op}`"),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Eof => "end of input".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_component_parses() {
        let source = r#"'use client'
import Button from './Button.pulse'

@page Counter
@route "/counter"

props { label: "Count" }
state { count: 0 }

actions {
  increment() { count++ }
}

view {
  div.counter#main {
    h1 "{label}: {count}"
    button [type=button] @click(increment()) "+"
  }
}

style { .counter { color: red; } }
"#;
        let program = parse(source).unwrap();
        assert_eq!(program.directive, Some(SourceDirective::UseClient));
        assert_eq!(program.page.as_deref(), Some("Counter"));
        assert_eq!(program.route.as_deref(), Some("/counter"));
        assert_eq!(program.imports.len(), 1);
        assert_eq!(program.props.len(), 1);
        assert_eq!(program.state.len(), 1);
        assert_eq!(program.actions.len(), 1);
        assert_eq!(program.view.len(), 1);
        assert!(program.style.is_some());

        let ViewNode::Element(root) = &program.view[0] else {
            panic!("root should be an element");
        };
        assert_eq!(root.tag, "div");
        assert_eq!(root.classes, vec!["counter"]);
        assert_eq!(root.id.as_deref(), Some("main"));
        assert_eq!(root.children.len(), 2);
    }

    #[test]
    fn duplicate_state_keys_are_rejected() {
        let err = parse("state { a: 1, a: 2 }\nview { div }").unwrap_err();
        assert_eq!(err.code(), "PARSER_ERROR");
        assert!(err.message.contains("duplicate state key"));
    }

    #[test]
    fn duplicate_page_is_rejected() {
        let err = parse("@page A\n@page B\nview { div }").unwrap_err();
        assert!(err.message.contains("duplicate @page"));
    }

    #[test]
    fn second_source_directive_is_rejected() {
        let err = parse("'use client'\n'use server'\nview { div }").unwrap_err();
        assert!(err.message.contains("at most one source directive"));
    }

    #[test]
    fn reserved_directive_cannot_be_event() {
        let err = parse("view { button @page(x) }").unwrap_err();
        assert!(err.message.contains("reserved"));
        assert!(err.line >= 1);
    }

    #[test]
    fn selector_shorthand_defaults_to_div() {
        let program = parse("view { .card }").unwrap();
        let ViewNode::Element(el) = &program.view[0] else {
            panic!()
        };
        assert_eq!(el.tag, "div");
        assert_eq!(el.classes, vec!["card"]);
    }

    #[test]
    fn element_directives_attach_to_preceding_element() {
        let program =
            parse("view { canvas @client\n  div @server }").unwrap();
        let ViewNode::Element(canvas) = &program.view[0] else {
            panic!()
        };
        assert_eq!(canvas.directives, vec![DirectiveNode::Client]);
    }

    #[test]
    fn expressions_nest() {
        let expr = parse_expression("a + b * 2 === c.d", Span::default()).unwrap();
        let Expr::Binary { op: "===", .. } = expr else {
            panic!("expected === at the root, got {expr:?}");
        };
    }
}
