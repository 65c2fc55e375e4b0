use assert_matches::assert_matches;

use super::{emit::emit, parse::parse_document, parse::resolve_plain_tag, *};
use crate::{
    config::{DocumentConfig, OutputFormat},
    error::Error,
};

fn parse(input: &str) -> (NodeArena, NodeId) {
    let mut arena = NodeArena::new();
    let outcome = parse_document(&mut arena, input).unwrap();
    (arena, outcome.root)
}

fn round_trip(input: &str) {
    let (arena, root) = parse(input);
    let output = emit(&arena, root, &DocumentConfig::default());
    assert_eq!(output, input);
}

#[test]
fn round_trips_simple_mapping() {
    round_trip("a: 1\nb: 2\n");
}

#[test]
fn round_trips_nested_mapping() {
    round_trip("info:\n  title: Test\n  version: 1.0.0\npaths: {}\n");
}

#[test]
fn round_trips_comments_and_blank_lines() {
    round_trip("# head\nk: v # inline\n");
    round_trip("a: 1\n\nb: 2\n");
    round_trip("a: 1\n# note\nb: 2\n");
    round_trip("# leading\n\n# more\na: 1\n");
    round_trip("a: 1\n# trailing comment\n");
}

#[test]
fn round_trips_sequences() {
    round_trip("- x\n- y\n- z\n");
    round_trip("steps:\n  - id: a\n  - id: b\n");
    round_trip("steps:\n- id: a\n  use: tool\n- id: b\n");
}

#[test]
fn round_trips_anchors_and_aliases() {
    round_trip("a: &A foo\nb: *A\n");
    round_trip("defaults: &defaults\n  retries: 3\nother: *defaults\n");
}

#[test]
fn round_trips_flow_collections() {
    round_trip("x-ext: {k: 1}\nfield: 0\n");
    round_trip("tags: [a, b, c]\n");
    round_trip("empty: {}\nnone: []\n");
}

#[test]
fn round_trips_quoting_styles() {
    round_trip("plain: value\nsingle: 'one two'\ndouble: \"with \\\"quotes\\\"\"\n");
    round_trip("looks-bool: \"true\"\nreal-bool: true\n");
}

#[test]
fn round_trips_block_scalars() {
    round_trip("description: |\n  line one\n  line two\ntail: 1\n");
    round_trip("description: |-\n  no trailing newline\ntail: 1\n");
    round_trip("description: >\n  folded text\n  more text\ntail: 1\n");
}

#[test]
fn round_trips_null_values() {
    round_trip("explicit: null\ntilde: ~\nimplicit:\nnext: 1\n");
}

#[test]
fn round_trips_explicit_document_start() {
    round_trip("---\na: 1\n");
}

#[test]
fn block_scalar_value_is_decoded() {
    let (arena, root) = parse("text: |\n  one\n  two\nnext: 0\n");
    let content = arena.content(root).unwrap();
    let entries = arena.mapping_entries(content);
    let value = arena[entries[0].1].scalar_value().unwrap();
    assert_eq!(value, "one\ntwo\n");
}

#[test]
fn folded_scalar_folds_lines() {
    let (arena, root) = parse("text: >\n  one\n  two\nnext: 0\n");
    let content = arena.content(root).unwrap();
    let entries = arena.mapping_entries(content);
    let value = arena[entries[0].1].scalar_value().unwrap();
    assert_eq!(value, "one two\n");
}

#[test]
fn aliases_resolve_to_their_targets() {
    let (arena, root) = parse("a: &A foo\nb: *A\n");
    let content = arena.content(root).unwrap();
    let entries = arena.mapping_entries(content);
    let alias = entries[1].1;
    assert_matches!(&arena[alias].kind, NodeKind::Alias { name, .. } if name == "A");
    assert_eq!(arena.scalar_value(alias), Some("foo"));
}

#[test]
fn unknown_anchor_is_fatal() {
    let mut arena = NodeArena::new();
    let err = parse_document(&mut arena, "a: *missing\n").unwrap_err();
    assert_matches!(err, Error::UnknownAnchor { name, .. } if name == "missing");
}

#[test]
fn alias_key_is_fatal() {
    let mut arena = NodeArena::new();
    let err = parse_document(&mut arena, "a: &A foo\n*A : bar\n").unwrap_err();
    assert_matches!(err, Error::AliasKey { .. });
}

#[test]
fn tab_indentation_is_fatal() {
    let mut arena = NodeArena::new();
    let err = parse_document(&mut arena, "a:\n\tb: 1\n").unwrap_err();
    assert_matches!(err, Error::Syntax { .. });
}

#[test]
fn multiple_documents_are_rejected() {
    let mut arena = NodeArena::new();
    let err = parse_document(&mut arena, "a: 1\n---\nb: 2\n").unwrap_err();
    assert_matches!(err, Error::Syntax { message, .. } if message.contains("multiple documents"));
}

#[test]
fn detects_indentation_step() {
    let mut arena = NodeArena::new();
    let outcome = parse_document(&mut arena, "a:\n    b: 1\n").unwrap();
    assert_eq!(outcome.detected_indent, Some(4));
}

#[test]
fn resolves_plain_tags() {
    assert_eq!(resolve_plain_tag("hello"), tag::STR);
    assert_eq!(resolve_plain_tag("true"), tag::BOOL);
    assert_eq!(resolve_plain_tag("False"), tag::BOOL);
    assert_eq!(resolve_plain_tag("42"), tag::INT);
    assert_eq!(resolve_plain_tag("-17"), tag::INT);
    assert_eq!(resolve_plain_tag("0x1F"), tag::INT);
    assert_eq!(resolve_plain_tag("0o17"), tag::INT);
    assert_eq!(resolve_plain_tag("3.5"), tag::FLOAT);
    assert_eq!(resolve_plain_tag("1e3"), tag::FLOAT);
    assert_eq!(resolve_plain_tag(".inf"), tag::FLOAT);
    assert_eq!(resolve_plain_tag("null"), tag::NULL);
    assert_eq!(resolve_plain_tag("~"), tag::NULL);
    assert_eq!(resolve_plain_tag(""), tag::NULL);
    assert_eq!(resolve_plain_tag("1.0.0"), tag::STR);
}

#[test]
fn json_input_parses_as_flow() {
    let (arena, root) = parse("{\n  \"a\": 1,\n  \"b\": [true, null]\n}\n");
    let content = arena.content(root).unwrap();
    assert_matches!(&arena[content].kind, NodeKind::Mapping { entries } if entries.len() == 2);
    assert!(arena[content].style.contains(Style::FLOW));
}

#[test]
fn emits_json_output() {
    let (arena, root) = parse("{\n  \"a\": 1,\n  \"b\": [true, null]\n}\n");
    let config = DocumentConfig {
        output_format: OutputFormat::Json,
        ..DocumentConfig::default()
    };
    let output = emit(&arena, root, &config);
    assert_eq!(output, "{\n  \"a\": 1,\n  \"b\": [\n    true,\n    null\n  ]\n}\n");
}

#[test]
fn json_output_resolves_aliases_and_drops_comments() {
    let (arena, root) = parse("# comment\na: &A 5\nb: *A\n");
    let config = DocumentConfig {
        output_format: OutputFormat::Json,
        ..DocumentConfig::default()
    };
    let output = emit(&arena, root, &config);
    assert_eq!(output, "{\n  \"a\": 5,\n  \"b\": 5\n}\n");
}

#[test]
fn deep_eq_ignores_positions_but_not_comments() {
    let (arena_a, root_a) = parse("a: 1\nb: 2\n");
    let (arena_b, root_b) = parse("a: 1\nb: 2\n");
    assert!(arena_a.deep_eq(root_a, &arena_b, root_b));

    let (arena_c, root_c) = parse("a: 1 # changed\nb: 2\n");
    assert!(!arena_a.deep_eq(root_a, &arena_c, root_c));

    let (arena_d, root_d) = parse("b: 2\na: 1\n");
    assert!(!arena_a.deep_eq(root_a, &arena_d, root_d));
}
