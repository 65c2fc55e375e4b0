//! Document façade: load, mutate, save.

use std::io;

use crate::{
    cancel::CancelToken,
    config::{DocumentConfig, OutputFormat},
    core::{CoreModel, CoreValue},
    error::{Error, ValidationErrors},
    model::Model,
    node::{emit::emit, parse::parse_document, Node, NodeArena, NodeId, NodeKind},
    sync::SyncContext,
    unmarshal::UnmarshalContext,
};

/// A loaded document: the node arena, the document node, the per-document
/// config, and the typed high model parsed from it.
///
/// The document is the unit of ownership: models hold node *indices* into
/// this arena, so a model graph never outlives or escapes its document.
#[derive(Debug)]
pub struct Document<M: Model> {
    arena: NodeArena,
    root: NodeId,
    config: DocumentConfig,
    model: M,
}

impl<M: Model> Document<M> {
    /// Parses `input` (YAML, or JSON, autodetected from the first
    /// non-whitespace byte) and unmarshals it into `M`.
    ///
    /// Validation findings (type mismatches, unknown keys, absent required
    /// fields) are returned alongside the document; only structural problems
    /// are errors.
    pub fn unmarshal(input: &str) -> Result<(Self, ValidationErrors), Error> {
        Self::unmarshal_with(input, &CancelToken::new())
    }

    pub fn unmarshal_with(
        input: &str,
        cancel: &CancelToken,
    ) -> Result<(Self, ValidationErrors), Error> {
        let output_format = detect_format(input);
        let mut arena = NodeArena::new();
        let outcome = parse_document(&mut arena, input)?;
        let indent = match output_format {
            OutputFormat::Yaml => outcome.detected_indent.unwrap_or(2),
            OutputFormat::Json => detect_json_indent(input),
        };
        let config = DocumentConfig {
            output_format,
            indent,
            ..DocumentConfig::default()
        };
        tracing::debug!(format = %output_format, indent, "loaded document");

        let mut errors = ValidationErrors::default();
        let core = {
            let mut cx = UnmarshalContext::new(&arena, &config, &mut errors, cancel);
            match arena.content(outcome.root) {
                Some(content) => <M::Core as CoreValue>::unmarshal(&mut cx, content)?,
                None => {
                    // Empty document: default core, required fields missing.
                    let mut core = M::Core::default();
                    core.root_mut().config = config.clone();
                    let mut valid = true;
                    for field in M::Core::fields() {
                        if field.required {
                            valid = false;
                            cx.push_required_missing(field.key);
                        }
                    }
                    core.root_mut().valid = valid;
                    core
                }
            }
        };
        let model = M::from_core(&core)?;

        Ok((
            Self {
                arena,
                root: outcome.root,
                config,
                model,
            },
            errors,
        ))
    }

    pub fn from_reader(mut reader: impl io::Read) -> Result<(Self, ValidationErrors), Error> {
        let mut input = String::new();
        reader.read_to_string(&mut input)?;
        Self::unmarshal(&input)
    }

    /// Wraps a freshly built model into an empty document; marshalling emits
    /// it from scratch with the default config.
    pub fn new(model: M) -> Self {
        let mut arena = NodeArena::new();
        let root = arena.insert(Node::new(NodeKind::Document { content: None }));
        Self {
            arena,
            root,
            config: DocumentConfig::default(),
            model,
        }
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn into_model(self) -> M {
        self.model
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    /// Emission settings may be overridden between load and save.
    pub fn config_mut(&mut self) -> &mut DocumentConfig {
        &mut self.config
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Required-field validity after the last unmarshal or sync.
    pub fn is_valid(&self) -> bool {
        self.model.core().root().valid
    }

    /// Reconciles the high model back into the node tree and returns the
    /// content node.
    pub fn sync(&mut self) -> Result<NodeId, Error> {
        self.sync_with(&CancelToken::new())
    }

    pub fn sync_with(&mut self, cancel: &CancelToken) -> Result<NodeId, Error> {
        let mut cx = SyncContext::new(&mut self.arena, self.config.clone(), cancel.clone());
        let node = self.model.sync_changes(&mut cx, None, false)?;
        if let NodeKind::Document { content } = &mut self.arena[self.root].kind {
            *content = Some(node);
        }
        Ok(node)
    }

    /// Syncs and serializes the document.
    pub fn marshal(&mut self, writer: &mut impl io::Write) -> Result<(), Error> {
        self.marshal_with(&CancelToken::new(), writer)
    }

    pub fn marshal_with(
        &mut self,
        cancel: &CancelToken,
        writer: &mut impl io::Write,
    ) -> Result<(), Error> {
        self.sync_with(cancel)?;
        let text = emit(&self.arena, self.root, &self.config);
        writer.write_all(text.as_bytes())?;
        Ok(())
    }

    pub fn marshal_to_string(&mut self) -> Result<String, Error> {
        self.sync()?;
        Ok(emit(&self.arena, self.root, &self.config))
    }
}

fn detect_format(input: &str) -> OutputFormat {
    match input.trim_start().as_bytes().first() {
        Some(b'{') | Some(b'[') => OutputFormat::Json,
        _ => OutputFormat::Yaml,
    }
}

/// JSON indent: leading spaces of the first indented line; 0 selects
/// compact output.
fn detect_json_indent(input: &str) -> usize {
    input
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .find_map(|line| {
            let indent = line.len() - line.trim_start_matches(' ').len();
            (indent > 0).then_some(indent)
        })
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::{
        testonly::{PathItem, Step, Workflow, WorkflowCore},
        Either, Value, ValidationErrorKind,
    };

    const WORKFLOW_DOC: &str = "\
workflowId: wf-1
summary: Demo workflow
tags:
  - alpha # first
  - beta
steps:
  - stepId: a
    operationId: createUser
  - stepId: b
inputs:
  name:
    type: string
x-vendor: 1
";

    fn load(input: &str) -> (Document<Workflow>, crate::ValidationErrors) {
        Document::unmarshal(input).unwrap()
    }

    #[test]
    fn unmarshals_typed_model() {
        let (doc, errors) = load(WORKFLOW_DOC);
        assert!(errors.is_empty(), "{errors}");
        assert!(doc.is_valid());
        assert_eq!(doc.config().output_format, OutputFormat::Yaml);
        assert_eq!(doc.config().indent, 2);

        let workflow = doc.model();
        assert_eq!(workflow.workflow_id, "wf-1");
        assert_eq!(workflow.summary.as_deref(), Some("Demo workflow"));
        assert_eq!(workflow.tags, ["alpha", "beta"]);
        assert_eq!(workflow.steps.len(), 2);
        assert_eq!(workflow.steps[0].step_id, "a");
        assert_eq!(workflow.steps[0].operation_id.as_deref(), Some("createUser"));
        assert_eq!(workflow.steps[1].operation_id, None);

        let input = workflow.inputs.get_str("name").unwrap();
        let nested = input.as_map().unwrap();
        assert_eq!(nested.get_str("type").unwrap().as_str(), Some("string"));

        assert_matches!(workflow.extensions.get("x-vendor"), Some(Value::Raw(_)));
    }

    #[test]
    fn no_change_round_trip_is_byte_identical() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        assert_eq!(doc.marshal_to_string().unwrap(), WORKFLOW_DOC);
    }

    #[test]
    fn scalar_edit_touches_only_its_own_span() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        doc.model_mut().summary = Some("Changed".to_owned());
        let output = doc.marshal_to_string().unwrap();
        assert_eq!(
            output,
            WORKFLOW_DOC.replace("summary: Demo workflow", "summary: Changed")
        );
    }

    #[test]
    fn reordered_scalars_keep_their_comments() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        doc.model_mut().tags = vec!["beta".to_owned(), "alpha".to_owned()];
        let output = doc.marshal_to_string().unwrap();
        assert!(
            output.contains("tags:\n  - beta\n  - alpha # first\n"),
            "{output}"
        );
    }

    #[test]
    fn appended_sequence_element_synthesizes_nodes() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        doc.model_mut().steps.push(Step::new("c"));
        let output = doc.marshal_to_string().unwrap();
        assert!(
            output.contains("  - stepId: b\n  - stepId: c\n"),
            "{output}"
        );
    }

    #[test]
    fn unknown_keys_are_collected_not_fatal() {
        let (doc, errors) = load("workflowId: wf\nbogus: 1\n");
        assert_eq!(doc.model().workflow_id, "wf");
        assert_eq!(errors.len(), 1);
        assert_matches!(
            errors.first().unwrap().kind(),
            ValidationErrorKind::UnknownKey(key) if key == "bogus"
        );
    }

    #[test]
    fn required_field_validity_transitions() {
        let (mut doc, errors) = load("summary: s\n");
        assert!(!doc.is_valid());
        assert_matches!(
            errors.first().unwrap().kind(),
            ValidationErrorKind::RequiredFieldMissing(key) if key == "workflowId"
        );

        doc.model_mut().workflow_id = "wf".to_owned();
        doc.sync().unwrap();
        assert!(doc.is_valid());
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "summary: s\nworkflowId: wf\n"
        );
    }

    #[test]
    fn new_keys_insert_before_extensions() {
        let (mut doc, _) = load("workflowId: wf\nx-vendor: 1\n");
        doc.model_mut().summary = Some("s".to_owned());
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "workflowId: wf\nsummary: s\nx-vendor: 1\n"
        );
    }

    #[test]
    fn extensions_can_be_set_and_removed() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        doc.model_mut().extensions.set("x-new", true);
        let output = doc.marshal_to_string().unwrap();
        assert!(output.ends_with("x-vendor: 1\nx-new: true\n"), "{output}");

        doc.model_mut().extensions.remove("x-vendor");
        let output = doc.marshal_to_string().unwrap();
        assert!(!output.contains("x-vendor"), "{output}");
        assert!(output.ends_with("x-new: true\n"), "{output}");
    }

    #[test]
    fn either_fields_pick_the_decodable_side() {
        let (doc, errors) = load("workflowId: wf\nmaxRetries: 3\n");
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(doc.model().max_retries, Some(Either::Left(3)));

        let (doc, errors) = load("workflowId: wf\nmaxRetries: auto\n");
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(
            doc.model().max_retries,
            Some(Either::Right("auto".to_owned()))
        );
    }

    #[test]
    fn either_edits_rewrite_in_place() {
        let (mut doc, _) = load("workflowId: wf\nmaxRetries: 3\n");
        doc.model_mut().max_retries = Some(Either::Right("unbounded".to_owned()));
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "workflowId: wf\nmaxRetries: unbounded\n"
        );
    }

    #[test]
    fn typed_map_keys_validate_their_value_set() {
        let (doc, errors) = Document::<PathItem>::unmarshal(
            "path: /users\noperations:\n  get: listUsers\n  patch: nope\n",
        )
        .unwrap();
        assert_eq!(errors.len(), 1);
        assert_matches!(
            errors.first().unwrap().kind(),
            ValidationErrorKind::InvalidValue { actual, .. } if actual == "patch"
        );
        assert_eq!(doc.model().operations.len(), 1);
        assert!(doc.is_valid());
    }

    #[test]
    fn canceled_unmarshal_aborts() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = Document::<Workflow>::unmarshal_with(WORKFLOW_DOC, &cancel).unwrap_err();
        assert_matches!(err, Error::Canceled);
    }

    #[test]
    fn canceled_sync_aborts() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        let cancel = CancelToken::new();
        cancel.cancel();
        let err = doc.sync_with(&cancel).unwrap_err();
        assert_matches!(err, Error::Canceled);
    }

    #[test]
    fn json_documents_round_trip() {
        let input = "{\n  \"workflowId\": \"wf\",\n  \"summary\": null\n}\n";
        let (mut doc, errors) = load(input);
        assert!(errors.is_empty(), "{errors}");
        assert_eq!(doc.config().output_format, OutputFormat::Json);
        assert_eq!(doc.model().summary, None);
        assert_eq!(doc.marshal_to_string().unwrap(), input);
    }

    #[test]
    fn output_format_can_be_overridden() {
        let (mut doc, _) = load(WORKFLOW_DOC);
        doc.config_mut().output_format = OutputFormat::Json;
        let output = doc.marshal_to_string().unwrap();
        assert!(output.starts_with("{\n  \"workflowId\": \"wf-1\","), "{output}");
        assert!(!output.contains('#'), "comments must not leak: {output}");

        // JSON input parses as a flow mapping; YAML output keeps that style.
        let (mut doc, _) = load("{\n  \"workflowId\": \"wf\"\n}\n");
        doc.config_mut().output_format = OutputFormat::Yaml;
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "{\"workflowId\": \"wf\"}\n"
        );
    }

    #[test]
    fn key_quote_style_always_quotes_keys() {
        let (mut doc, _) = load("workflowId: wf\n");
        doc.config_mut().key_quote_style = crate::KeyQuoteStyle::Always;
        assert_eq!(doc.marshal_to_string().unwrap(), "\"workflowId\": wf\n");
    }

    #[test]
    fn default_styles_apply_to_synthesized_collections() {
        let (mut doc, _) = load("workflowId: wf\n");
        doc.config_mut().default_sequence_style = crate::CollectionStyle::Flow;
        doc.model_mut().tags = vec!["a".to_owned()];
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "workflowId: wf\ntags: [a]\n"
        );
    }

    #[test]
    fn custom_syncers_replace_the_default_walker() {
        use crate::testonly::{Tracked, SYNC_CALLS};

        let (mut doc, errors) =
            Document::<Tracked>::unmarshal("name: x # kept\n").unwrap();
        assert!(errors.is_empty(), "{errors}");
        let before = SYNC_CALLS.load(std::sync::atomic::Ordering::Relaxed);
        assert_eq!(doc.marshal_to_string().unwrap(), "name: x # kept\n");
        assert!(SYNC_CALLS.load(std::sync::atomic::Ordering::Relaxed) > before);
    }

    #[test]
    fn fresh_documents_marshal_from_scratch() {
        let mut workflow = Workflow {
            workflow_id: "built".to_owned(),
            summary: None,
            tags: Vec::new(),
            steps: vec![Step::new("only")],
            inputs: crate::OrderedMap::new(),
            max_retries: None,
            extensions: crate::Extensions::new(),
            core: WorkflowCore::default(),
        };
        workflow.steps[0].enabled = Some(true);
        let mut doc = Document::new(workflow);
        assert_eq!(
            doc.marshal_to_string().unwrap(),
            "workflowId: built\nsteps:\n  - stepId: only\n    enabled: true\n"
        );
    }
}
