//! Generated-code to source mapping.

use serde::Serialize;

/// One generated position mapped back to its source span.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Mapping {
    /// 1-based line in the generated code.
    pub gen_line: usize,
    /// 1-based column in the generated code.
    pub gen_col: usize,
    /// 1-based line in the component source.
    pub src_line: usize,
    /// 1-based column in the component source.
    pub src_col: usize,
}

/// The structured source map emitted alongside generated code.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SourceMap {
    pub file: String,
    pub mappings: Vec<Mapping>,
}

impl SourceMap {
    pub fn new(file: &str) -> Self {
        Self {
            file: file.to_string(),
            mappings: Vec::new(),
        }
    }

    pub fn push(&mut self, mapping: Mapping) {
        self.mappings.push(mapping);
    }

    /// The source position a generated line maps to, if any.
    pub fn lookup(&self, gen_line: usize) -> Option<&Mapping> {
        self.mappings.iter().find(|m| m.gen_line == gen_line)
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("source map serializes")
    }
}
