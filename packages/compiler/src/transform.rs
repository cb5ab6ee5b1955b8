//! AST to Rust code generation.
//!
//! The emitted code targets the runtime surface re-exported from
//! `pulse::prelude`: one pulse per `state` key, prop accessors with default
//! fallback, actions as shared closures, and a render expression built from
//! `el` / `when` / `list_unkeyed` / `client_only` / `server_only` calls.
//! Output is deterministic: identical input produces byte-identical code,
//! css and map.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::ast::{
    ActionDef, AttrDef, DirectiveNode, Element, Expr, Program, TextPart, ViewNode,
};
use crate::error::{CompileError, CompilePhase};
use crate::sourcemap::{Mapping, SourceMap};
use crate::token::Span;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Symbol {
    State,
    Prop,
    Action,
    Import,
    Local,
}

/// A fragment of generated code plus the outer names it references, used to
/// emit clone-captures when the fragment crosses a closure boundary.
struct Piece {
    code: String,
    used: BTreeSet<String>,
}

impl Piece {
    fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            used: BTreeSet::new(),
        }
    }

    fn with(code: impl Into<String>, used: BTreeSet<String>) -> Self {
        Self {
            code: code.into(),
            used,
        }
    }
}

pub(crate) struct TransformOutput {
    pub code: String,
    pub css: Option<String>,
    pub map: SourceMap,
}

pub(crate) fn transform(
    program: &Program,
    filename: &str,
    mut extract_css: Option<&mut dyn FnMut(&str, &str)>,
) -> Result<TransformOutput, CompileError> {
    let component_name = program
        .page
        .clone()
        .unwrap_or_else(|| pascal_case(file_stem(filename)));
    let scope_class = format!("pulse-{}", kebab_case(&component_name));

    let mut symbols: FxHashMap<String, Symbol> = FxHashMap::default();
    for import in &program.imports {
        symbols.insert(import.name.clone(), Symbol::Import);
    }
    for prop in &program.props {
        symbols.insert(prop.name.clone(), Symbol::Prop);
    }
    for state in &program.state {
        symbols.insert(state.name.clone(), Symbol::State);
    }
    for action in &program.actions {
        symbols.insert(action.name.clone(), Symbol::Action);
    }

    let css = program
        .style
        .as_ref()
        .map(|style| scope_css(&style.css, &scope_class));
    let inline_style = if let Some(css) = &css {
        match extract_css.as_mut() {
            Some(sink) => {
                sink(filename, css);
                false
            }
            None => true,
        }
    } else {
        false
    };

    let t = Transformer {
        symbols,
        scope_class,
    };

    let mut out = String::new();
    out.push_str(&format!("// @generated by pulse-compiler from {filename}\n"));
    out.push_str("#![allow(non_snake_case, unused_variables, unused_mut)]\n\n");
    out.push_str("use std::rc::Rc;\n\n");
    out.push_str("use pulse::prelude::*;\n");
    out.push_str("use pulse_dom::Value;\n");
    for import in &program.imports {
        out.push_str(&format!(
            "use super::{}::{};\n",
            snake_case(&import.name),
            import.name
        ));
    }
    out.push('\n');

    if let Some(directive) = program.directive {
        out.push_str(&format!(
            "pub static __COMPONENT_ID: &str = \"{component_name}\";\n"
        ));
        out.push_str(&format!(
            "pub static __DIRECTIVE: Option<&str> = Some(\"{}\");\n",
            directive.as_str()
        ));
    }
    if let Some(route) = &program.route {
        out.push_str(&format!(
            "pub static __ROUTE: Option<&str> = Some(\"{}\");\n",
            escape_str(route)
        ));
    }
    if program.directive.is_some() || program.route.is_some() {
        out.push('\n');
    }

    if inline_style {
        out.push_str(&format!(
            "const STYLE: &str = \"{}\";\n\n",
            escape_str(css.as_deref().unwrap_or(""))
        ));
    }

    out.push_str(&format!("pub fn {component_name}(props: Props) -> View {{\n"));
    out.push_str("    component(move |ctx| {\n");

    for prop in &program.props {
        let default = t.lower_value(&prop.default, &[])?;
        out.push_str(&format!(
            "        let {} = ctx.props.get_or(\"{}\", {});\n",
            prop.name, prop.name, default.code
        ));
    }
    for state in &program.state {
        let init = t.lower_value(&state.init, &[])?;
        out.push_str(&format!(
            "        let {} = pulse({});\n",
            state.name, init.code
        ));
    }
    for action in &program.actions {
        out.push_str(&t.lower_action(action)?);
    }
    if inline_style {
        let id = if program.directive.is_some() {
            "__COMPONENT_ID".to_string()
        } else {
            format!("\"{component_name}\"")
        };
        out.push_str(&format!("        inject_style({id}, STYLE);\n"));
    }

    let root = t.lower_roots(&program.view)?;
    for line in root.code.lines() {
        out.push_str("        ");
        out.push_str(line);
        out.push('\n');
    }

    out.push_str("    })(props)\n");
    out.push_str("}\n");

    let (code, map) = extract_mappings(&out, filename);
    Ok(TransformOutput { code, css, map })
}

struct Transformer {
    symbols: FxHashMap<String, Symbol>,
    scope_class: String,
}

impl Transformer {
    fn resolve(&self, name: &str, locals: &[&str]) -> Option<Symbol> {
        if locals.contains(&name) {
            return Some(Symbol::Local);
        }
        self.symbols.get(name).copied()
    }

    fn unknown(&self, name: &str, span: Span) -> CompileError {
        CompileError::new(
            CompilePhase::Transform,
            format!("unknown identifier `{name}`"),
            span.line,
            span.column,
        )
        .with_suggestion("declare it in state, props, actions, or import it")
    }

    // ---- expressions ----

    /// Lowers an expression to Rust code producing a `Value`.
    fn lower_value(&self, expr: &Expr, locals: &[&str]) -> Result<Piece, CompileError> {
        match expr {
            Expr::Number(raw) => {
                if raw.contains('.') {
                    Ok(Piece::new(format!("Value::Float({raw})")))
                } else {
                    Ok(Piece::new(format!("Value::Int({raw})")))
                }
            }
            Expr::Str(text) => Ok(Piece::new(format!(
                "Value::Text(String::from(\"{}\"))",
                escape_str(text)
            ))),
            Expr::Bool(b) => Ok(Piece::new(format!("Value::Bool({b})"))),
            Expr::Null => Ok(Piece::new("Value::Null")),
            Expr::Array(items) => {
                let mut used = BTreeSet::new();
                let mut parts = Vec::new();
                for item in items {
                    let piece = self.lower_value(item, locals)?;
                    used.extend(piece.used);
                    parts.push(piece.code);
                }
                Ok(Piece::with(
                    format!("Value::List(vec![{}])", parts.join(", ")),
                    used,
                ))
            }
            Expr::Ident(name, span) => match self.resolve(name, locals) {
                Some(Symbol::State) => Ok(Piece::with(
                    format!("{name}.get()"),
                    BTreeSet::from([name.clone()]),
                )),
                Some(Symbol::Prop) | Some(Symbol::Local) => Ok(Piece::with(
                    format!("{name}.clone()"),
                    BTreeSet::from([name.clone()]),
                )),
                Some(Symbol::Action) => Err(CompileError::new(
                    CompilePhase::Transform,
                    format!("action `{name}` can only be called"),
                    span.line,
                    span.column,
                )),
                Some(Symbol::Import) => Err(CompileError::new(
                    CompilePhase::Transform,
                    format!("component `{name}` cannot be used in an expression"),
                    span.line,
                    span.column,
                )),
                None => Err(self.unknown(name, *span)),
            },
            Expr::Member {
                object,
                property,
                optional,
            } => self.lower_member(object, property, *optional, locals),
            Expr::Call { callee, args, span } => {
                let call = self.lower_call(callee, args, *span, locals)?;
                Ok(Piece::with(
                    format!("{{ {} Value::Null }}", call.code),
                    call.used,
                ))
            }
            Expr::Unary { op, expr } => {
                let inner = self.lower_value(expr, locals)?;
                let method = if *op == "!" { "not" } else { "neg" };
                Ok(Piece::with(
                    format!("({}).{method}()", inner.code),
                    inner.used,
                ))
            }
            Expr::Postfix { .. } => Err(CompileError::new(
                CompilePhase::Transform,
                "`++`/`--` can only be used as a statement",
                0,
                0,
            )),
            Expr::Binary { op, left, right } => {
                let l = self.lower_value(left, locals)?;
                let r = self.lower_value(right, locals)?;
                let mut used = l.used;
                used.extend(r.used);
                let code = match *op {
                    "+" => format!("({}).add(&({}))", l.code, r.code),
                    "-" => format!("({}).sub(&({}))", l.code, r.code),
                    "*" => format!("({}).mul(&({}))", l.code, r.code),
                    "/" => format!("({}).div(&({}))", l.code, r.code),
                    "%" => format!("({}).rem(&({}))", l.code, r.code),
                    "==" => format!("Value::Bool(({}).loose_eq(&({})))", l.code, r.code),
                    "!=" => format!("Value::Bool(!({}).loose_eq(&({})))", l.code, r.code),
                    "===" => format!("Value::Bool(({}) == ({}))", l.code, r.code),
                    "!==" => format!("Value::Bool(({}) != ({}))", l.code, r.code),
                    "<" => format!("({}).lt(&({}))", l.code, r.code),
                    "<=" => format!("({}).le(&({}))", l.code, r.code),
                    ">" => format!("({}).gt(&({}))", l.code, r.code),
                    ">=" => format!("({}).ge(&({}))", l.code, r.code),
                    "??" => format!("({}).coalesce(&({}))", l.code, r.code),
                    "&&" => format!(
                        "{{ let __l = {}; if __l.is_truthy() {{ {} }} else {{ __l }} }}",
                        l.code, r.code
                    ),
                    "||" => format!(
                        "{{ let __l = {}; if __l.is_truthy() {{ __l }} else {{ {} }} }}",
                        l.code, r.code
                    ),
                    other => {
                        return Err(CompileError::new(
                            CompilePhase::Transform,
                            format!("unsupported operator `{other}`"),
                            0,
                            0,
                        ));
                    }
                };
                Ok(Piece::with(code, used))
            }
            Expr::Assign { .. } => Err(CompileError::new(
                CompilePhase::Transform,
                "assignments can only be used as statements",
                0,
                0,
            )),
        }
    }

    fn lower_member(
        &self,
        object: &Expr,
        property: &str,
        optional: bool,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        // `event.value` / `event.name` inside an event handler
        if let Expr::Ident(name, _) = object {
            if name == "event" && locals.contains(&"event") {
                let code = match property {
                    "value" => "event.value.clone()".to_string(),
                    "name" => "Value::Text(event.name.clone())".to_string(),
                    other => {
                        return Err(CompileError::new(
                            CompilePhase::Transform,
                            format!("unsupported event property `{other}`"),
                            0,
                            0,
                        ));
                    }
                };
                return Ok(Piece::with(code, BTreeSet::from(["event".to_string()])));
            }
        }
        let obj = self.lower_value(object, locals)?;
        let access = match property {
            "length" => format!("Value::Int(({}).length() as i64)", obj.code),
            other => {
                let span = ident_span(object);
                return Err(CompileError::new(
                    CompilePhase::Transform,
                    format!("unsupported property `{other}`"),
                    span.line,
                    span.column,
                ));
            }
        };
        let code = if optional {
            format!(
                "{{ let __o = {}; if __o.is_null() {{ Value::Null }} else {{ Value::Int(__o.length() as i64) }} }}",
                obj.code
            )
        } else {
            access
        };
        Ok(Piece::with(code, obj.used))
    }

    fn lower_call(
        &self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        let Expr::Ident(name, name_span) = callee else {
            return Err(CompileError::new(
                CompilePhase::Transform,
                "only actions can be called",
                span.line,
                span.column,
            ));
        };
        match self.resolve(name, locals) {
            Some(Symbol::Action) => {}
            Some(_) => {
                return Err(CompileError::new(
                    CompilePhase::Transform,
                    format!("`{name}` is not an action"),
                    name_span.line,
                    name_span.column,
                ));
            }
            None => return Err(self.unknown(name, *name_span)),
        }
        let mut used = BTreeSet::from([name.clone()]);
        let mut lowered = Vec::new();
        for arg in args {
            let piece = self.lower_value(arg, locals)?;
            used.extend(piece.used);
            lowered.push(piece.code);
        }
        Ok(Piece::with(
            format!("(*{name})({});", lowered.join(", ")),
            used,
        ))
    }

    /// Lowers an expression used for its effect.
    fn lower_statement(&self, expr: &Expr, locals: &[&str]) -> Result<Piece, CompileError> {
        match expr {
            Expr::Assign { op, target, value } => {
                let Expr::Ident(name, span) = target.as_ref() else {
                    return Err(CompileError::new(
                        CompilePhase::Transform,
                        "unsupported assignment target",
                        0,
                        0,
                    ));
                };
                match self.resolve(name, locals) {
                    Some(Symbol::State) => {}
                    Some(_) => {
                        return Err(CompileError::new(
                            CompilePhase::Transform,
                            format!("`{name}` is not writable; only state can be assigned"),
                            span.line,
                            span.column,
                        ));
                    }
                    None => return Err(self.unknown(name, *span)),
                }
                let piece = self.lower_value(value, locals)?;
                let mut used = piece.used;
                used.insert(name.clone());
                let code = match *op {
                    "=" => format!("{name}.set({});", piece.code),
                    _ => format!(
                        "if {name}.peek().is_null() {{ {name}.set({}); }}",
                        piece.code
                    ),
                };
                Ok(Piece::with(code, used))
            }
            Expr::Postfix { op, expr } => {
                let Expr::Ident(name, span) = expr.as_ref() else {
                    return Err(CompileError::new(
                        CompilePhase::Transform,
                        "`++`/`--` only applies to state",
                        0,
                        0,
                    ));
                };
                match self.resolve(name, locals) {
                    Some(Symbol::State) => {}
                    _ => {
                        return Err(CompileError::new(
                            CompilePhase::Transform,
                            format!("`{name}` is not state; `++`/`--` only applies to state"),
                            span.line,
                            span.column,
                        ));
                    }
                }
                let method = if *op == "++" { "add" } else { "sub" };
                Ok(Piece::with(
                    format!("{name}.update(|__v| *__v = __v.{method}(&Value::Int(1)));"),
                    BTreeSet::from([name.clone()]),
                ))
            }
            Expr::Call { callee, args, span } => self.lower_call(callee, args, *span, locals),
            other => {
                let piece = self.lower_value(other, locals)?;
                Ok(Piece::with(format!("let _ = {};", piece.code), piece.used))
            }
        }
    }

    fn lower_action(&self, action: &ActionDef) -> Result<String, CompileError> {
        let locals: Vec<&str> = action.params.iter().map(String::as_str).collect();
        let mut used = BTreeSet::new();
        let mut body = String::new();
        for statement in &action.body {
            let piece = self.lower_statement(statement, &locals)?;
            used.extend(piece.used);
            body.push_str("            ");
            body.push_str(&piece.code);
            body.push('\n');
        }
        for param in &action.params {
            used.remove(param);
        }
        // the action itself is not an upvalue of its own body
        used.remove(&action.name);
        let params = action
            .params
            .iter()
            .map(|p| format!("{p}: Value"))
            .collect::<Vec<_>>()
            .join(", ");
        let clones: String = used
            .iter()
            .map(|name| format!("            let {name} = {name}.clone();\n"))
            .collect();
        Ok(format!(
            "        let {} = Rc::new({{\n{clones}            move |{params}| {{\n{body}            }}\n        }});\n",
            action.name
        ))
    }

    // ---- view ----

    fn lower_roots(&self, roots: &[ViewNode]) -> Result<Piece, CompileError> {
        match roots {
            [] => Ok(Piece::new("View::Empty")),
            [single] => {
                let piece = self.lower_view_node(single, &[])?;
                Ok(Piece::with(
                    format!("{}.into_view()", piece.code),
                    piece.used,
                ))
            }
            many => {
                let mut used = BTreeSet::new();
                let mut parts = Vec::new();
                for node in many {
                    let piece = self.lower_view_node(node, &[])?;
                    used.extend(piece.used);
                    parts.push(format!("{}.into_view()", piece.code));
                }
                Ok(Piece::with(
                    format!("View::Fragment(vec![{}])", parts.join(", ")),
                    used,
                ))
            }
        }
    }

    fn lower_view_node(
        &self,
        node: &ViewNode,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        match node {
            ViewNode::Element(element) => self.lower_element(element, locals),
            ViewNode::Text { parts, span } => self.lower_text_view(parts, *span, locals),
        }
    }

    /// A text node appearing directly among children.
    fn lower_text_view(
        &self,
        parts: &[TextPart],
        span: Span,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        if parts
            .iter()
            .all(|part| matches!(part, TextPart::Literal(_)))
        {
            let literal: String = parts
                .iter()
                .map(|part| match part {
                    TextPart::Literal(text) => text.as_str(),
                    TextPart::Interpolation(_) => unreachable!(),
                })
                .collect();
            return Ok(Piece::new(format!(
                "/*@{}:{}*/\"{}\"",
                span.line,
                span.column,
                escape_str(&literal)
            )));
        }
        let (format_str, args, used) = self.lower_parts(parts, locals)?;
        let body = format!("format!(\"{format_str}\"{args})");
        Ok(Piece::with(
            format!(
                "/*@{}:{}*/dynamic_text({})",
                span.line,
                span.column,
                closure("||", &body, &used)
            ),
            prune_locals(used, locals),
        ))
    }

    fn lower_parts(
        &self,
        parts: &[TextPart],
        locals: &[&str],
    ) -> Result<(String, String, BTreeSet<String>), CompileError> {
        let mut format_str = String::new();
        let mut args = String::new();
        let mut used = BTreeSet::new();
        for part in parts {
            match part {
                TextPart::Literal(text) => format_str.push_str(&escape_format(text)),
                TextPart::Interpolation(expr) => {
                    let piece = self.lower_value(expr, locals)?;
                    used.extend(piece.used);
                    format_str.push_str("{}");
                    args.push_str(", ");
                    args.push_str(&piece.code);
                }
            }
        }
        Ok((format_str, args, used))
    }

    fn lower_element(
        &self,
        element: &Element,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        // `@for` and `@if` change what is in scope (and whether the body is
        // lowered at all), so they are peeled off before the base chain
        if let Some(DirectiveNode::For { binding, seq }) = element
            .directives
            .iter()
            .find(|d| matches!(d, DirectiveNode::For { .. }))
        {
            let inner = strip_directive(element, |d| matches!(d, DirectiveNode::For { .. }));
            let row_locals: Vec<&str> =
                locals.iter().copied().chain([binding.as_str()]).collect();
            let row = self.lower_element(&inner, &row_locals)?;
            let mut row_used = row.used;
            row_used.remove(binding.as_str());
            let seq_piece = self.lower_value(seq, locals)?;
            let seq_code = format!("({}).to_list()", seq_piece.code);
            let render = closure(&format!("|{binding}, _index|"), &row.code, &row_used);
            let mut used = prune_locals(row_used, locals);
            used.extend(seq_piece.used.clone());
            return Ok(Piece::with(
                format!(
                    "list_unkeyed({}, {render})",
                    closure("||", &seq_code, &seq_piece.used)
                ),
                used,
            ));
        }

        if let Some(DirectiveNode::If { cond }) = element
            .directives
            .iter()
            .find(|d| matches!(d, DirectiveNode::If { .. }))
        {
            let inner = strip_directive(element, |d| matches!(d, DirectiveNode::If { .. }));
            let branch = self.lower_element(&inner, locals)?;
            let cond_piece = self.lower_value(cond, locals)?;
            let cond_code = format!("({}).is_truthy()", cond_piece.code);
            let mut used = branch.used.clone();
            used.extend(cond_piece.used.clone());
            return Ok(Piece::with(
                format!(
                    "when({}, {})",
                    closure("||", &cond_code, &cond_piece.used),
                    closure("||", &branch.code, &branch.used)
                ),
                used,
            ));
        }

        // imported components render through their factory
        if self
            .symbols
            .get(&element.tag)
            .is_some_and(|s| *s == Symbol::Import)
        {
            return self.lower_component_use(element, locals);
        }

        let mut used = BTreeSet::new();
        let mut code = format!(
            "/*@{}:{}*/el(\"{}\")",
            element.span.line,
            element.span.column,
            element.selector()
        );
        code.push_str(&format!("\n    .class(\"{}\")", self.scope_class));

        for attr in &element.attrs {
            code.push_str(&self.lower_attr(attr, locals, &mut used)?);
        }

        for directive in &element.directives {
            if let DirectiveNode::Event {
                event, handler, ..
            } = directive
            {
                let handler_locals: Vec<&str> =
                    locals.iter().copied().chain(["event"]).collect();
                let statement = self.lower_statement(handler, &handler_locals)?;
                let mut handler_used = statement.used;
                handler_used.remove("event");
                let param = if statement.code.contains("event") {
                    "|event|"
                } else {
                    "|_event|"
                };
                let body = format!("{{ {} }}", statement.code);
                code.push_str(&format!(
                    "\n    .on(\"{}\", {})",
                    event,
                    closure(param, &body, &handler_used)
                ));
                used.extend(prune_locals(handler_used, locals));
            }
        }

        for child in &element.children {
            match child {
                ViewNode::Text { parts, span } => {
                    if parts
                        .iter()
                        .all(|part| matches!(part, TextPart::Literal(_)))
                    {
                        let literal: String = parts
                            .iter()
                            .map(|part| match part {
                                TextPart::Literal(text) => text.as_str(),
                                TextPart::Interpolation(_) => unreachable!(),
                            })
                            .collect();
                        code.push_str(&format!(
                            "\n    /*@{}:{}*/.text(\"{}\")",
                            span.line,
                            span.column,
                            escape_str(&literal)
                        ));
                    } else {
                        let (format_str, args, text_used) =
                            self.lower_parts(parts, locals)?;
                        let body = format!("format!(\"{format_str}\"{args})");
                        code.push_str(&format!(
                            "\n    /*@{}:{}*/.text_fn({})",
                            span.line,
                            span.column,
                            closure("||", &body, &text_used)
                        ));
                        used.extend(prune_locals(text_used, locals));
                    }
                }
                ViewNode::Element(_) => {
                    let piece = self.lower_view_node(child, locals)?;
                    used.extend(piece.used.clone());
                    code.push_str("\n    .child(");
                    code.push_str(&indent(&piece.code, 1));
                    code.push(')');
                }
            }
        }

        self.apply_wrappers(element, Piece::with(code, used), locals)
    }

    /// Wraps an element expression in its `@client` / `@server` selective
    /// rendering directives.
    fn apply_wrappers(
        &self,
        element: &Element,
        base: Piece,
        _locals: &[&str],
    ) -> Result<Piece, CompileError> {
        let mut code = base.code;
        let used = base.used;

        for directive in &element.directives {
            match directive {
                DirectiveNode::Client => {
                    code = format!("client_only({})", closure("||", &code, &used));
                }
                DirectiveNode::Server => {
                    code = format!("server_only({})", closure("||", &code, &used));
                }
                _ => {}
            }
        }

        Ok(Piece::with(code, used))
    }

    fn lower_component_use(
        &self,
        element: &Element,
        locals: &[&str],
    ) -> Result<Piece, CompileError> {
        let mut used = BTreeSet::new();
        let mut props = String::from("Props::new()");
        for attr in &element.attrs {
            let value = self.lower_attr_value(attr, locals, &mut used)?;
            props.push_str(&format!(".with(\"{}\", {})", attr.name, value));
        }
        let code = format!(
            "/*@{}:{}*/{}({})",
            element.span.line,
            element.span.column,
            element.tag,
            props
        );
        self.apply_wrappers(element, Piece::with(code, used), locals)
    }

    fn lower_attr(
        &self,
        attr: &AttrDef,
        locals: &[&str],
        used: &mut BTreeSet<String>,
    ) -> Result<String, CompileError> {
        if attr.value.is_empty() {
            return Ok(format!("\n    .attr(\"{}\", true)", attr.name));
        }
        if attr
            .value
            .iter()
            .all(|part| matches!(part, TextPart::Literal(_)))
        {
            let literal: String = attr
                .value
                .iter()
                .map(|part| match part {
                    TextPart::Literal(text) => text.as_str(),
                    TextPart::Interpolation(_) => unreachable!(),
                })
                .collect();
            return Ok(format!(
                "\n    .attr(\"{}\", \"{}\")",
                attr.name,
                escape_str(&literal)
            ));
        }
        let body = self.dynamic_attr_body(attr, locals, used)?;
        Ok(format!("\n    .attr_fn(\"{}\", {})", attr.name, body))
    }

    fn lower_attr_value(
        &self,
        attr: &AttrDef,
        locals: &[&str],
        used: &mut BTreeSet<String>,
    ) -> Result<String, CompileError> {
        if attr.value.is_empty() {
            return Ok("Value::Bool(true)".to_string());
        }
        match attr.value.as_slice() {
            [TextPart::Literal(text)] => Ok(format!(
                "Value::Text(String::from(\"{}\"))",
                escape_str(text)
            )),
            [TextPart::Interpolation(expr)] => {
                let piece = self.lower_value(expr, locals)?;
                used.extend(prune_locals(piece.used, locals));
                Ok(piece.code)
            }
            parts => {
                let (format_str, args, parts_used) = self.lower_parts(parts, locals)?;
                used.extend(prune_locals(parts_used, locals));
                Ok(format!("Value::Text(format!(\"{format_str}\"{args}))"))
            }
        }
    }

    fn dynamic_attr_body(
        &self,
        attr: &AttrDef,
        locals: &[&str],
        used: &mut BTreeSet<String>,
    ) -> Result<String, CompileError> {
        match attr.value.as_slice() {
            [TextPart::Interpolation(expr)] => {
                let piece = self.lower_value(expr, locals)?;
                let code = closure("||", &piece.code, &piece.used);
                used.extend(prune_locals(piece.used, locals));
                Ok(code)
            }
            parts => {
                let (format_str, args, parts_used) = self.lower_parts(parts, locals)?;
                let body = format!("Value::Text(format!(\"{format_str}\"{args}))");
                let code = closure("||", &body, &parts_used);
                used.extend(prune_locals(parts_used, locals));
                Ok(code)
            }
        }
    }
}

fn strip_directive(
    element: &Element,
    matches_one: impl Fn(&DirectiveNode) -> bool,
) -> Element {
    let mut stripped = element.clone();
    let mut removed = false;
    stripped.directives.retain(|d| {
        if !removed && matches_one(d) {
            removed = true;
            false
        } else {
            true
        }
    });
    stripped
}

/// Wraps `body` in a `move` closure, clone-capturing every used name.
fn closure(params: &str, body: &str, used: &BTreeSet<String>) -> String {
    let body = if body.starts_with('{') && body.ends_with('}') {
        body.to_string()
    } else {
        format!("{{ {body} }}")
    };
    if used.is_empty() {
        format!("move {params} {body}")
    } else {
        let clones: String = used
            .iter()
            .map(|name| format!("let {name} = {name}.clone(); "))
            .collect();
        format!("{{ {clones}move {params} {body} }}")
    }
}

/// Locals are owned by their introducing closure; they never propagate into
/// outer capture lists.
fn prune_locals(used: BTreeSet<String>, locals: &[&str]) -> BTreeSet<String> {
    used.into_iter()
        .filter(|name| !locals.contains(&name.as_str()))
        .collect()
}

fn indent(code: &str, levels: usize) -> String {
    let pad = "    ".repeat(levels);
    code.lines()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn ident_span(expr: &Expr) -> Span {
    match expr {
        Expr::Ident(_, span) => *span,
        Expr::Member { object, .. } => ident_span(object),
        Expr::Call { span, .. } => *span,
        _ => Span::default(),
    }
}

// ---- mapping extraction ----

/// Pulls `/*@line:col*/` markers out of the generated text, recording a
/// mapping for each and stripping the marker.
fn extract_mappings(code: &str, filename: &str) -> (String, SourceMap) {
    let mut map = SourceMap::new(filename);
    let mut out = String::with_capacity(code.len());
    for (line_index, line) in code.lines().enumerate() {
        let mut rest = line;
        let mut cleaned = String::with_capacity(line.len());
        while let Some(start) = rest.find("/*@") {
            cleaned.push_str(&rest[..start]);
            let after = &rest[start + 3..];
            let Some(end) = after.find("*/") else {
                cleaned.push_str(&rest[start..]);
                rest = "";
                break;
            };
            let marker = &after[..end];
            if let Some((l, c)) = marker.split_once(':') {
                if let (Ok(src_line), Ok(src_col)) = (l.parse(), c.parse()) {
                    map.push(Mapping {
                        gen_line: line_index + 1,
                        gen_col: cleaned.len() + 1,
                        src_line,
                        src_col,
                    });
                }
            }
            rest = &after[end + 2..];
        }
        cleaned.push_str(rest);
        out.push_str(&cleaned);
        out.push('\n');
    }
    (out, map)
}

// ---- css scoping ----

/// Appends the component's scope class to every rule selector, leaving
/// at-rules intact (scoping recursively inside `@media`).
fn scope_css(css: &str, scope: &str) -> String {
    let mut out = String::new();
    let mut rest = css;
    loop {
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        rest = trimmed;
        let Some(open) = rest.find('{') else {
            out.push_str(rest);
            break;
        };
        let selector = rest[..open].trim();
        let body_start = open + 1;
        let mut depth = 1usize;
        let mut end = body_start;
        for (i, c) in rest[body_start..].char_indices() {
            match c {
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        end = body_start + i;
                        break;
                    }
                }
                _ => {}
            }
        }
        let body = &rest[body_start..end];
        if let Some(at_rule) = selector.strip_prefix('@') {
            if at_rule.starts_with("media") {
                out.push_str(&format!(
                    "{selector} {{ {} }}\n",
                    scope_css(body, scope).trim()
                ));
            } else {
                out.push_str(&format!("{selector} {{{body}}}\n"));
            }
        } else {
            let scoped = selector
                .split(',')
                .map(|part| scope_selector(part.trim(), scope))
                .collect::<Vec<_>>()
                .join(", ");
            out.push_str(&format!("{scoped} {{{body}}}\n"));
        }
        rest = &rest[(end + 1).min(rest.len())..];
    }
    out.trim_end().to_string()
}

/// `.counter:hover` becomes `.counter.pulse-x:hover`.
fn scope_selector(selector: &str, scope: &str) -> String {
    match selector.find(':') {
        Some(i) => format!("{}.{scope}{}", &selector[..i], &selector[i..]),
        None => format!("{selector}.{scope}"),
    }
}

// ---- name and string helpers ----

fn file_stem(filename: &str) -> &str {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    base.split_once('.').map(|(stem, _)| stem).unwrap_or(base)
}

fn pascal_case(name: &str) -> String {
    let mut out = String::new();
    let mut upper_next = true;
    for c in name.chars() {
        if c == '-' || c == '_' || c == ' ' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    if out.is_empty() {
        out.push_str("Component");
    }
    out
}

fn kebab_case(name: &str) -> String {
    let mut out = String::new();
    for (i, c) in name.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('-');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn snake_case(name: &str) -> String {
    kebab_case(name).replace('-', "_")
}

fn escape_str(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
        .replace('\t', "\\t")
        .replace('\r', "\\r")
}

fn escape_format(text: &str) -> String {
    escape_str(text).replace('{', "{{").replace('}', "}}")
}
