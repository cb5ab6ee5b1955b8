//! End-to-end compiler behavior: metadata, determinism, css routing,
//! source maps and error reporting.

use pulse_compiler::{compile, CompileOptions};

const COUNTER: &str = r#"'use client'

@page Counter
@route "/counter"

props { label: "Count" }
state { count: 0 }

actions {
  increment() { count++ }
}

view {
  div.counter {
    h1 "{label}: {count}"
    button @click(increment()) "+"
  }
}

style {
  .counter { color: rebeccapurple; }
}
"#;

#[test]
fn directive_metadata_lands_in_the_generated_code() {
    let source = "'use client';\n@page B\nview { button \"x\" }";
    let out = compile(source, CompileOptions::new("B.pulse")).unwrap();
    assert!(
        out.code.contains("pub static __DIRECTIVE: Option<&str> = Some(\"use client\");"),
        "{}",
        out.code
    );
    assert!(
        out.code.contains("pub static __COMPONENT_ID: &str = \"B\";"),
        "{}",
        out.code
    );
}

#[test]
fn metadata_is_absent_without_a_source_directive() {
    let out = compile("@page B\nview { button \"x\" }", CompileOptions::new("B.pulse"))
        .unwrap();
    assert!(!out.code.contains("__DIRECTIVE"));
    assert!(!out.code.contains("__COMPONENT_ID"));
}

#[test]
fn use_server_directive_is_case_insensitive() {
    let out = compile(
        "'  Use SERVER '\n@page S\nview { div }",
        CompileOptions::new("S.pulse"),
    )
    .unwrap();
    assert!(out.code.contains("Some(\"use server\")"), "{}", out.code);
}

#[test]
fn compilation_is_deterministic() {
    let first = compile(COUNTER, CompileOptions::new("Counter.pulse")).unwrap();
    let second = compile(COUNTER, CompileOptions::new("Counter.pulse")).unwrap();
    assert_eq!(first.code, second.code);
    assert_eq!(first.css, second.css);
}

#[test]
fn generated_code_targets_the_runtime_surface() {
    let out = compile(COUNTER, CompileOptions::new("Counter.pulse")).unwrap();
    assert!(out.code.contains("let count = pulse(Value::Int(0));"), "{}", out.code);
    assert!(
        out.code
            .contains("let label = ctx.props.get_or(\"label\", Value::Text(String::from(\"Count\")));"),
        "{}",
        out.code
    );
    assert!(out.code.contains("el(\"div.counter\")"), "{}", out.code);
    assert!(out.code.contains(".on(\"click\""), "{}", out.code);
    assert!(out.code.contains("pub fn Counter(props: Props) -> View"), "{}", out.code);
}

#[test]
fn style_is_scoped_and_inlined_by_default() {
    let out = compile(COUNTER, CompileOptions::new("Counter.pulse")).unwrap();
    let css = out.css.as_deref().unwrap();
    assert!(css.contains(".counter.pulse-counter"), "{css}");
    assert!(out.code.contains("const STYLE"), "{}", out.code);
    assert!(out.code.contains("inject_style("), "{}", out.code);
}

#[test]
fn css_sink_routes_styles_out_of_the_code() {
    let mut captured: Vec<(String, String)> = Vec::new();
    let mut sink = |file: &str, css: &str| captured.push((file.to_string(), css.to_string()));
    let mut options = CompileOptions::new("Counter.pulse");
    options.extract_css = Some(&mut sink);
    let out = compile(COUNTER, options).unwrap();
    assert_eq!(captured.len(), 1);
    assert_eq!(captured[0].0, "Counter.pulse");
    assert!(captured[0].1.contains("pulse-counter"));
    assert!(!out.code.contains("const STYLE"), "{}", out.code);
    // the css still comes back to the caller
    assert!(out.css.is_some());
}

#[test]
fn source_map_points_elements_at_their_source_lines() {
    let mut options = CompileOptions::new("Counter.pulse");
    options.source_map = true;
    let out = compile(COUNTER, options).unwrap();
    let map = out.map.unwrap();
    assert_eq!(map.file, "Counter.pulse");
    // COUNTER declares the h1 on source line 14
    let h1_line = COUNTER
        .lines()
        .position(|l| l.contains("h1"))
        .map(|i| i + 1)
        .unwrap();
    assert!(
        map.mappings.iter().any(|m| m.src_line == h1_line),
        "{map:?}"
    );
    // markers never leak into the emitted code
    assert!(!out.code.contains("/*@"), "{}", out.code);
}

#[test]
fn lexer_errors_carry_position_and_code() {
    let err = compile("view { h1 \"unterminated }", CompileOptions::new("Broken.pulse"))
        .unwrap_err();
    assert_eq!(err.code(), "LEXER_ERROR");
    assert_eq!(err.file, "Broken.pulse");
    assert_eq!(err.line, 1);
}

#[test]
fn unknown_identifier_is_a_transform_error_with_position() {
    let source = "@page P\nstate { count: 0 }\nview {\n  h1 \"{missing}\"\n}";
    let err = compile(source, CompileOptions::new("P.pulse")).unwrap_err();
    assert_eq!(err.code(), "TRANSFORM_ERROR");
    assert!(err.message.contains("missing"), "{}", err.message);
    assert_eq!(err.line, 4);
    assert!(err.suggestion.is_some());
}

#[test]
fn snippet_rendering_points_a_caret_at_the_column() {
    let source = "state { a: 1, a: 2 }\nview { div }";
    let err = compile(source, CompileOptions::new("Dup.pulse")).unwrap_err();
    assert_eq!(err.code(), "PARSER_ERROR");
    let snippet = err.render_snippet(source);
    assert!(snippet.contains("Dup.pulse:1:"), "{snippet}");
    assert!(snippet.contains("1 | state { a: 1, a: 2 }"), "{snippet}");
    assert!(snippet.contains('^'), "{snippet}");
}

#[test]
fn client_and_server_element_directives_become_wrappers() {
    let source = "@page Mixed\nview {\n  canvas @client\n  div.stats @server\n}";
    let out = compile(source, CompileOptions::new("Mixed.pulse")).unwrap();
    assert!(out.code.contains("client_only("), "{}", out.code);
    assert!(out.code.contains("server_only("), "{}", out.code);
}

#[test]
fn for_directive_lowers_to_a_list_call() {
    let source =
        "@page Todos\nstate { items: [] }\nview {\n  ul {\n    li @for(item in items) \"{item}\"\n  }\n}";
    let out = compile(source, CompileOptions::new("Todos.pulse")).unwrap();
    assert!(out.code.contains("list_unkeyed("), "{}", out.code);
    assert!(out.code.contains(".to_list()"), "{}", out.code);
}

#[test]
fn if_directive_lowers_to_when() {
    let source = "@page Gate\nstate { open: false }\nview {\n  div @if(open) \"shown\"\n}";
    let out = compile(source, CompileOptions::new("Gate.pulse")).unwrap();
    assert!(out.code.contains("when("), "{}", out.code);
    assert!(out.code.contains(".is_truthy()"), "{}", out.code);
}

#[test]
fn imports_become_component_calls() {
    let source = "@page Home\nimport Button from './Button.pulse'\nview {\n  div {\n    Button [label=\"Go\"]\n  }\n}";
    let out = compile(source, CompileOptions::new("Home.pulse")).unwrap();
    assert!(out.code.contains("use super::button::Button;"), "{}", out.code);
    assert!(
        out.code.contains("Button(Props::new().with(\"label\", Value::Text(String::from(\"Go\"))))"),
        "{}",
        out.code
    );
}
