//! End-to-end round-trip behavior through the public API.

use proptest::prelude::*;
use stet::{Document, Extensions, Model};

#[derive(Debug, Clone, Model)]
struct Pair {
    #[stet(key = "a")]
    a: i64,
    #[stet(key = "b")]
    b: i64,
    #[stet(core)]
    core: PairCore,
}

#[derive(Debug, Clone, Model)]
struct Kv {
    #[stet(key = "k")]
    k: String,
    #[stet(core)]
    core: KvCore,
}

#[derive(Debug, Clone, Model)]
struct Listing {
    #[stet(key = "items")]
    items: Vec<String>,
    #[stet(core)]
    core: ListingCore,
}

#[derive(Debug, Clone, Model)]
struct Anchors {
    #[stet(key = "a")]
    a: String,
    #[stet(key = "b")]
    b: String,
    #[stet(core)]
    core: AnchorsCore,
}

#[derive(Debug, Clone, Model)]
struct Fielded {
    #[stet(key = "field")]
    field: i64,
    #[stet(extensions)]
    extensions: Extensions,
    #[stet(core)]
    core: FieldedCore,
}

/// Schema-less model: everything except `x-*` keys is an unknown-key
/// finding, but the tree is preserved wholesale.
#[derive(Debug, Clone, Model)]
struct AnyDoc {
    #[stet(extensions)]
    extensions: Extensions,
    #[stet(core)]
    core: AnyDocCore,
}

#[test]
fn single_scalar_edit() {
    let (mut doc, errors) = Document::<Pair>::unmarshal("a: 1\nb: 2\n").unwrap();
    assert!(errors.is_empty(), "{errors}");
    doc.model_mut().a = 5;
    assert_eq!(doc.marshal_to_string().unwrap(), "a: 5\nb: 2\n");
}

#[test]
fn untouched_document_with_comments_is_byte_identical() {
    let input = "# head\nk: v # inline\n";
    let (mut doc, errors) = Document::<Kv>::unmarshal(input).unwrap();
    assert!(errors.is_empty(), "{errors}");
    assert_eq!(doc.marshal_to_string().unwrap(), input);
}

#[test]
fn sequence_reorder_preserves_element_trivia() {
    let input = "items:\n- x\n- y # why\n- z\n";
    let (mut doc, errors) = Document::<Listing>::unmarshal(input).unwrap();
    assert!(errors.is_empty(), "{errors}");
    doc.model_mut().items = vec!["z".into(), "x".into(), "y".into()];
    assert_eq!(
        doc.marshal_to_string().unwrap(),
        "items:\n- z\n- x\n- y # why\n"
    );
}

#[test]
fn anchors_and_aliases_survive_unchanged_values() {
    let input = "a: &A foo\nb: *A\n";
    let (mut doc, errors) = Document::<Anchors>::unmarshal(input).unwrap();
    assert!(errors.is_empty(), "{errors}");
    assert_eq!(doc.model().b, "foo");

    doc.model_mut().a = "foo".to_owned();
    assert_eq!(doc.marshal_to_string().unwrap(), input);
}

#[test]
fn writing_through_an_alias_breaks_only_the_alias() {
    let (mut doc, _) = Document::<Anchors>::unmarshal("a: &A foo\nb: *A\n").unwrap();
    doc.model_mut().b = "bar".to_owned();
    assert_eq!(doc.marshal_to_string().unwrap(), "a: &A foo\nb: bar\n");
}

#[test]
fn extensions_round_trip_untouched_next_to_edits() {
    let input = "x-ext: {k: 1}\nfield: 0\n";
    let (mut doc, errors) = Document::<Fielded>::unmarshal(input).unwrap();
    assert!(errors.is_empty(), "{errors}");
    doc.model_mut().field = 9;
    assert_eq!(doc.marshal_to_string().unwrap(), "x-ext: {k: 1}\nfield: 9\n");
}

#[test]
fn required_field_absence_invalidates_until_set() {
    let (mut doc, errors) = Document::<Pair>::unmarshal("a: 1\n").unwrap();
    assert!(!doc.is_valid());
    assert!(errors.iter().any(|err| err.to_string().contains("`b`")));

    doc.model_mut().b = 2;
    doc.sync().unwrap();
    assert!(doc.is_valid());
    assert_eq!(doc.marshal_to_string().unwrap(), "a: 1\nb: 2\n");
}

const ROUND_TRIP_CORPUS: &[&str] = &[
    "a: 1\nb: 2\n",
    "# top\n\nname: demo # trailing\n\n# middle\nvalue: 3\n",
    "servers:\n  - url: https://example.com\n    description: Production\n  - url: https://staging.example.com\n",
    "defaults: &defaults\n  retries: 3\n  timeout: 30\nservice: *defaults\n",
    "description: |\n  Multi-line text\n  with two lines\nafter: 1\n",
    "summary: >\n  folded\n  text\nafter: 1\n",
    "flow: {a: 1, b: [x, y]}\nquoted: \"a: b\"\nsingle: 'it''s'\n",
    "x-one: 1\nx-two:\n  nested: true\n",
    "empty-map: {}\nempty-seq: []\nnull-val: null\ntilde: ~\nimplicit:\nlast: 1\n",
    "steps:\n- stepId: a\n  next: b\n- stepId: b\n",
    "---\nmarked: true\n",
];

#[test]
fn round_trip_law_over_corpus() {
    for input in ROUND_TRIP_CORPUS {
        let (mut doc, _) = Document::<AnyDoc>::unmarshal(input).unwrap();
        let output = doc.marshal_to_string().unwrap();
        assert_eq!(&output, input, "corpus document changed");
    }
}

#[test]
fn marshal_unmarshal_is_idempotent() {
    for input in ROUND_TRIP_CORPUS {
        let (mut doc, _) = Document::<AnyDoc>::unmarshal(input).unwrap();
        let once = doc.marshal_to_string().unwrap();
        let (mut doc, _) = Document::<AnyDoc>::unmarshal(&once).unwrap();
        let twice = doc.marshal_to_string().unwrap();
        assert_eq!(once, twice, "second round trip diverged");
    }
}

#[test]
fn unknown_keys_are_reported_but_preserved() {
    let input = "alpha: 1\nbeta:\n  gamma: 2\n";
    let (mut doc, errors) = Document::<AnyDoc>::unmarshal(input).unwrap();
    assert_eq!(errors.len(), 2, "{errors}");
    assert_eq!(doc.marshal_to_string().unwrap(), input);
}

// ===== Generated-document round trips =====

#[derive(Debug, Clone)]
enum GenValue {
    Int(i64),
    Word(String),
    List(Vec<GenValue>),
    Map(Vec<(String, GenValue)>),
}

fn word() -> impl Strategy<Value = String> + Clone {
    "[a-z]{1,8}"
}

fn gen_scalar() -> impl Strategy<Value = GenValue> + Clone {
    prop_oneof![
        any::<i64>().prop_map(GenValue::Int),
        word().prop_map(GenValue::Word),
    ]
}

fn gen_map(
    inner: impl Strategy<Value = GenValue> + Clone,
) -> impl Strategy<Value = GenValue> + Clone {
    prop::collection::btree_map(word(), inner, 1..4)
        .prop_map(|map| GenValue::Map(map.into_iter().collect()))
}

fn gen_doc() -> impl Strategy<Value = GenValue> {
    let leaf = gen_scalar();
    // Lists hold scalars and flat maps; deeper nesting comes from maps.
    let list_item = prop_oneof![gen_scalar(), gen_map(gen_scalar())];
    let level1 = prop_oneof![
        gen_scalar(),
        prop::collection::vec(list_item, 1..4).prop_map(GenValue::List),
        gen_map(leaf),
    ];
    gen_map(level1)
}

fn render(value: &GenValue, indent: usize, out: &mut String) {
    match value {
        GenValue::Map(entries) => {
            for (key, entry) in entries {
                for _ in 0..indent {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                match entry {
                    GenValue::Int(n) => {
                        out.push(' ');
                        out.push_str(&n.to_string());
                        out.push('\n');
                    }
                    GenValue::Word(w) => {
                        out.push(' ');
                        out.push_str(w);
                        out.push('\n');
                    }
                    nested => {
                        out.push('\n');
                        render(nested, indent + 2, out);
                    }
                }
            }
        }
        GenValue::List(items) => {
            for item in items {
                for _ in 0..indent {
                    out.push(' ');
                }
                out.push_str("- ");
                match item {
                    GenValue::Int(n) => {
                        out.push_str(&n.to_string());
                        out.push('\n');
                    }
                    GenValue::Word(w) => {
                        out.push_str(w);
                        out.push('\n');
                    }
                    GenValue::Map(entries) => {
                        // Compact item: first entry on the dash line.
                        let mut first = true;
                        for (key, entry) in entries {
                            if !first {
                                for _ in 0..indent + 2 {
                                    out.push(' ');
                                }
                            }
                            first = false;
                            out.push_str(key);
                            out.push(':');
                            match entry {
                                GenValue::Int(n) => {
                                    out.push(' ');
                                    out.push_str(&n.to_string());
                                }
                                GenValue::Word(w) => {
                                    out.push(' ');
                                    out.push_str(w);
                                }
                                _ => unreachable!("list maps hold scalars only"),
                            }
                            out.push('\n');
                        }
                    }
                    GenValue::List(_) => unreachable!("lists hold scalars and maps only"),
                }
            }
        }
        _ => unreachable!("documents are maps"),
    }
}

proptest! {
    #[test]
    fn generated_documents_round_trip(doc in gen_doc()) {
        let mut input = String::new();
        render(&doc, 0, &mut input);
        let (mut loaded, _) = Document::<AnyDoc>::unmarshal(&input).unwrap();
        let output = loaded.marshal_to_string().unwrap();
        prop_assert_eq!(output, input);
    }
}
