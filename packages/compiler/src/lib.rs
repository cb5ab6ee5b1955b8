//! `pulse-compiler` - compiles `.pulse` component sources to Rust code over
//! the runtime API.
//!
//! The pipeline is lexer -> parser -> transformer. Output is deterministic:
//! compiling the same source twice yields byte-identical code, css and
//! source map.

pub(crate) mod ast;
pub(crate) mod error;
pub(crate) mod lexer;
pub(crate) mod parser;
pub(crate) mod sourcemap;
pub(crate) mod token;
pub(crate) mod transform;

pub use crate::ast::{
    ActionDef, AttrDef, DirectiveNode, Element, Expr, Import, Program, PropDef,
    SourceDirective, StateDef, StyleBlock, TextPart, ViewNode,
};
pub use crate::error::{CompileError, CompilePhase};
pub use crate::lexer::Lexer;
pub use crate::parser::{parse, parse_expression};
pub use crate::sourcemap::{Mapping, SourceMap};
pub use crate::token::{Span, Token, TokenKind};

/// Options for [`compile`].
pub struct CompileOptions<'a> {
    /// Source filename, used in errors, metadata and the source map.
    pub filename: &'a str,
    /// Emit a [`SourceMap`] alongside the code.
    pub source_map: bool,
    /// When present, scoped CSS is routed here as `(filename, css)` instead
    /// of being inlined into the generated code.
    pub extract_css: Option<&'a mut dyn FnMut(&str, &str)>,
}

impl<'a> CompileOptions<'a> {
    pub fn new(filename: &'a str) -> Self {
        Self {
            filename,
            source_map: false,
            extract_css: None,
        }
    }
}

/// The compiler's output: generated Rust code, the component's scoped CSS
/// (when a `style` block exists), and an optional source map.
#[derive(Clone, Debug, Default)]
pub struct CompileOutput {
    pub code: String,
    pub css: Option<String>,
    pub map: Option<SourceMap>,
}

/// Compiles one component source file.
pub fn compile(
    source: &str,
    options: CompileOptions<'_>,
) -> Result<CompileOutput, CompileError> {
    let filename = options.filename;
    tracing::debug!(file = filename, "compiling component");
    let program = parser::parse(source).map_err(|e| e.with_file(filename))?;
    let output = transform::transform(&program, filename, options.extract_css)
        .map_err(|e| e.with_file(filename))?;
    Ok(CompileOutput {
        code: output.code,
        css: output.css,
        map: options.source_map.then_some(output.map),
    })
}
