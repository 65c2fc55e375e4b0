//! High model → core model → node tree reconciliation.
//!
//! The syncer owns the invariant that unchanged regions of a document stay
//! byte-identical: it mutates existing nodes in place wherever possible and
//! synthesizes new ones (styled per the document config) only for values
//! that have no node yet. Sequences are reconciled by node identity so
//! reordered elements keep their nodes and trivia.

use crate::{
    cancel::CancelToken,
    config::{CollectionStyle, DocumentConfig},
    core::CoreModel,
    error::Error,
    extensions::Extensions,
    field::FieldNode,
    map::{MapKey, OrderedMap},
    model::{HighValue, Model},
    node::{parse::resolve_plain_tag, tag, Node, NodeArena, NodeId, NodeKind, Style},
    value::Value,
};

/// Context for one sync pass over a document.
#[derive(Debug)]
pub struct SyncContext<'a> {
    pub(crate) arena: &'a mut NodeArena,
    config: DocumentConfig,
    cancel: CancelToken,
}

impl<'a> SyncContext<'a> {
    pub(crate) fn new(arena: &'a mut NodeArena, config: DocumentConfig, cancel: CancelToken) -> Self {
        Self {
            arena,
            config,
            cancel,
        }
    }

    pub fn config(&self) -> &DocumentConfig {
        &self.config
    }

    pub fn check_cancel(&self) -> Result<(), Error> {
        self.cancel.check()
    }

    /// Synthesizes a key node. Quoting is decided by the emitter from the
    /// document's key quote style.
    pub fn new_key_node(&mut self, key: &str) -> NodeId {
        self.arena.insert(Node::scalar(key, resolve_plain_tag(key)))
    }

    /// Writes a scalar value through to `old` in place when it is a scalar
    /// node (preserving its style and trivia); otherwise synthesizes a new
    /// scalar, carrying over the old node's comments.
    pub fn set_scalar(&mut self, old: Option<NodeId>, text: &str, node_tag: &str) -> NodeId {
        if let Some(id) = old {
            if matches!(self.arena[id].kind, NodeKind::Scalar { .. }) {
                let node = &mut self.arena[id];
                if let NodeKind::Scalar { value, tag: t, raw } = &mut node.kind {
                    *value = text.to_owned();
                    if *t != node_tag {
                        *t = node_tag.to_owned();
                        // A quote style from a previous string value would
                        // change the new tag's meaning.
                        if node_tag != tag::STR {
                            node.style
                                .remove(Style::SINGLE_QUOTED | Style::DOUBLE_QUOTED);
                        }
                    }
                    *raw = None;
                }
                return id;
            }
            let fresh = self.arena.insert(Node::scalar(text, node_tag));
            self.carry_comments(id, fresh);
            return fresh;
        }
        self.arena.insert(Node::scalar(text, node_tag))
    }

    /// A null scalar, reusing `old` when it already is one.
    pub fn null_node(&mut self, old: Option<NodeId>) -> NodeId {
        match old {
            Some(id) if self.arena[id].is_null() => id,
            _ => self.arena.new_null(),
        }
    }

    pub fn new_mapping(&mut self) -> NodeId {
        let style = match self.config.default_mapping_style {
            CollectionStyle::Flow => Style::FLOW,
            CollectionStyle::Block => Style::empty(),
        };
        self.arena
            .insert(Node::new(NodeKind::Mapping { entries: Vec::new() }).with_style(style))
    }

    pub fn new_sequence(&mut self) -> NodeId {
        let style = match self.config.default_sequence_style {
            CollectionStyle::Flow => Style::FLOW,
            CollectionStyle::Block => Style::empty(),
        };
        self.arena
            .insert(Node::new(NodeKind::Sequence { items: Vec::new() }).with_style(style))
    }

    fn carry_comments(&mut self, from: NodeId, to: NodeId) {
        let (head, line, foot) = {
            let node = &self.arena[from];
            (
                node.head_comment.clone(),
                node.line_comment.clone(),
                node.foot_comment.clone(),
            )
        };
        let target = &mut self.arena[to];
        target.head_comment = head;
        target.line_comment = line;
        target.foot_comment = foot;
    }

    /// Node editor: replaces the value side of `key` in place (the key node
    /// is left untouched, preserving its quoting and trivia) or inserts a
    /// new pair. New non-extension keys go before the first `x-*` key so
    /// extensions keep trailing the mapping.
    pub fn upsert(
        &mut self,
        mapping: NodeId,
        key: &str,
        key_node: NodeId,
        value_node: NodeId,
    ) {
        let existing = self.arena.find_key(mapping, key);
        let insert_at = if key.starts_with("x-") {
            None
        } else {
            let entries = self.arena.mapping_entries(mapping);
            entries.iter().position(|(k, _)| {
                self.arena[*k]
                    .scalar_value()
                    .is_some_and(|text| text.starts_with("x-"))
            })
        };
        if let NodeKind::Mapping { entries } = &mut self.arena[mapping].kind {
            match existing {
                Some(index) => entries[index].1 = value_node,
                None => match insert_at {
                    Some(index) => entries.insert(index, (key_node, value_node)),
                    None => entries.push((key_node, value_node)),
                },
            }
        }
    }

    /// Node editor: removes `key` and its value from the mapping.
    pub fn delete_key(&mut self, mapping: NodeId, key: &str) {
        if let Some(index) = self.arena.find_key(mapping, key) {
            if let NodeKind::Mapping { entries } = &mut self.arena[mapping].kind {
                entries.remove(index);
            }
        }
    }

    /// Builds (or rewrites) the node for a dynamic [`Value`].
    pub fn build_value_node(&mut self, value: &Value, old: Option<NodeId>) -> NodeId {
        match value {
            Value::Null => self.set_scalar(old, "null", tag::NULL),
            Value::Bool(flag) => {
                self.set_scalar(old, if *flag { "true" } else { "false" }, tag::BOOL)
            }
            Value::Number(number) => {
                let number_tag = if number.is_i64() || number.is_u64() {
                    tag::INT
                } else {
                    tag::FLOAT
                };
                self.set_scalar(old, &number.to_string(), number_tag)
            }
            Value::String(text) => self.set_scalar(old, text, tag::STR),
            Value::Seq(items) => {
                let ids: Vec<NodeId> = items
                    .iter()
                    .map(|item| self.build_value_node(item, None))
                    .collect();
                let seq = match old {
                    Some(id) if matches!(self.arena[id].kind, NodeKind::Sequence { .. }) => id,
                    _ => self.new_sequence(),
                };
                if let NodeKind::Sequence { items } = &mut self.arena[seq].kind {
                    *items = ids;
                }
                seq
            }
            Value::Map(map) => {
                let pairs: Vec<(NodeId, NodeId)> = map
                    .entries()
                    .iter()
                    .map(|entry| {
                        let key_node = entry
                            .key_node
                            .unwrap_or_else(|| self.new_key_node(&entry.key.to_scalar()));
                        let value_node = self.build_value_node(&entry.value, entry.value_node);
                        (key_node, value_node)
                    })
                    .collect();
                let mapping = match old {
                    Some(id) if matches!(self.arena[id].kind, NodeKind::Mapping { .. }) => id,
                    _ => self.new_mapping(),
                };
                if let NodeKind::Mapping { entries } = &mut self.arena[mapping].kind {
                    *entries = pairs;
                }
                mapping
            }
            Value::Raw(id) => *id,
        }
    }
}

/// Descriptor walker behind every model's default `sync_changes`: ensures a
/// mapping node, syncs declared fields in declaration order (extensions
/// last), recomputes required-field validity, and stores the node back on
/// the core.
pub fn sync_model<M: Model>(
    model: &mut M,
    cx: &mut SyncContext<'_>,
    node: Option<NodeId>,
    skip_required: bool,
) -> Result<NodeId, Error> {
    cx.check_cancel()?;
    let existing = node.or_else(|| model.root_node());
    let (mapping, returned) = match existing {
        Some(id) => {
            let resolved = cx.arena.resolve(id);
            if matches!(cx.arena[resolved].kind, NodeKind::Mapping { .. }) {
                (resolved, id)
            } else {
                let fresh = cx.new_mapping();
                cx.carry_comments(resolved, fresh);
                (fresh, fresh)
            }
        }
        None => {
            let fresh = cx.new_mapping();
            (fresh, fresh)
        }
    };

    for descriptor in M::descriptors() {
        cx.check_cancel()?;
        tracing::trace!(key = descriptor.key, "syncing field");
        (descriptor.sync)(model, cx, mapping)?;
    }

    if !skip_required {
        let valid = M::descriptors()
            .iter()
            .filter(|descriptor| descriptor.required)
            .all(|descriptor| (descriptor.present)(model.core()));
        model.core_mut().root_mut().valid = valid;
    }
    model.core_mut().root_mut().node = Some(mapping);
    Ok(returned)
}

/// Sequence reconciliation with identity matching.
///
/// High-side elements are paired with core-side elements first by node
/// identity (`HighValue::identity`, i.e. the element's root node), then by
/// value equality for elements without identity (scalars). Matched elements
/// reuse their nodes in place, so their internal trivia survives reordering;
/// unmatched high elements synthesize fresh nodes; unmatched core elements
/// are dropped. Ties consume candidates in index order.
pub(crate) fn sync_sequence<H: HighValue>(
    cx: &mut SyncContext<'_>,
    items: &mut [H],
    repr: &mut Vec<FieldNode<H::Repr>>,
    node: Option<NodeId>,
) -> Result<NodeId, Error> {
    let sequence = match node {
        Some(id) if matches!(cx.arena[cx.arena.resolve(id)].kind, NodeKind::Sequence { .. }) => {
            cx.arena.resolve(id)
        }
        _ => cx.new_sequence(),
    };

    let mut old: Vec<Option<FieldNode<H::Repr>>> = repr.drain(..).map(Some).collect();

    // Pair each high element with an unconsumed core element: by root-node
    // identity when the element has one, by value equality otherwise.
    let mut matched: Vec<Option<FieldNode<H::Repr>>> = Vec::with_capacity(items.len());
    for item in items.iter() {
        let index = match item.identity() {
            Some(id) => old.iter().position(|slot| {
                slot.as_ref().is_some_and(|field| field.value_node == Some(id))
            }),
            None => old.iter().position(|slot| {
                slot.as_ref().is_some_and(|field| item.eq_repr(&field.value))
            }),
        };
        matched.push(index.and_then(|index| old[index].take()));
    }

    let mut new_repr = Vec::with_capacity(items.len());
    let mut child_ids = Vec::with_capacity(items.len());
    for (item, slot) in items.iter_mut().zip(matched) {
        cx.check_cancel()?;
        let mut field = slot.unwrap_or_default();
        let node_id = item.sync_repr(cx, &mut field.value, field.value_node)?;
        field.value_node = Some(node_id);
        field.present = true;
        child_ids.push(node_id);
        new_repr.push(field);
    }

    *repr = new_repr;
    if let NodeKind::Sequence { items } = &mut cx.arena[sequence].kind {
        *items = child_ids;
    }
    Ok(sequence)
}

/// Ordered-map reconciliation: entries are synced by key in the high map's
/// insertion order; existing entries keep their nodes, removed keys drop
/// theirs, and the mapping's entry list is rebuilt in the final order (a
/// no-op when nothing changed).
pub(crate) fn sync_ordered_map<K, H>(
    cx: &mut SyncContext<'_>,
    map: &mut OrderedMap<K, H>,
    repr: &mut OrderedMap<K, H::Repr>,
    node: Option<NodeId>,
) -> Result<NodeId, Error>
where
    K: MapKey + Clone + std::fmt::Debug + 'static,
    H: HighValue,
{
    let mapping = match node {
        Some(id) if matches!(cx.arena[cx.arena.resolve(id)].kind, NodeKind::Mapping { .. }) => {
            cx.arena.resolve(id)
        }
        _ => cx.new_mapping(),
    };

    let mut new_repr = OrderedMap::default();
    let mut pairs = Vec::with_capacity(map.len());
    for entry in map.entries_mut() {
        cx.check_cancel()?;
        let key_text = entry.key.to_scalar();
        let (mut value_repr, old_key_node, old_value_node) =
            match repr.take_entry_by_scalar(&key_text) {
                Some(old) => (old.value, old.key_node, old.value_node),
                None => (H::Repr::default(), None, None),
            };
        let value_node = entry.value.sync_repr(cx, &mut value_repr, old_value_node)?;
        let key_node = old_key_node.unwrap_or_else(|| cx.new_key_node(&key_text));
        pairs.push((key_node, value_node));
        new_repr.push_entry(
            entry.key.clone(),
            Some(key_node),
            value_repr,
            Some(value_node),
        );
    }

    *repr = new_repr;
    if let NodeKind::Mapping { entries } = &mut cx.arena[mapping].kind {
        *entries = pairs;
    }
    Ok(mapping)
}

/// Extension sync: source-order upsert into the parent mapping (in place
/// where the key exists, appended otherwise), then removal of keys the
/// source no longer has. Loaded values are raw nodes and pass through
/// verbatim.
#[doc(hidden)]
pub fn sync_extensions(
    cx: &mut SyncContext<'_>,
    source: &mut Extensions,
    target: &mut Extensions,
    mapping: NodeId,
) -> Result<(), Error> {
    for entry in source.map_mut().entries_mut() {
        cx.check_cancel()?;
        let key = entry.key.clone();
        if let Some(existing) = target.map_mut().entry_by_scalar_mut(&key) {
            let value_node = entry
                .value
                .sync_repr(cx, &mut existing.value, existing.value_node)?;
            existing.value_node = Some(value_node);
            let key_node = existing.key_node.unwrap_or_else(|| cx.new_key_node(&key));
            existing.key_node = Some(key_node);
            cx.upsert(mapping, &key, key_node, value_node);
        } else {
            let mut value_repr = Value::default();
            let value_node = entry.value.sync_repr(cx, &mut value_repr, None)?;
            let key_node = cx.new_key_node(&key);
            target
                .map_mut()
                .push_entry(key.clone(), Some(key_node), value_repr, Some(value_node));
            cx.upsert(mapping, &key, key_node, value_node);
        }
    }

    let stale: Vec<String> = target
        .map()
        .keys()
        .filter(|key| source.get(key).is_none())
        .cloned()
        .collect();
    for key in stale {
        target.map_mut().take_entry_by_scalar(&key);
        cx.delete_key(mapping, &key);
    }
    Ok(())
}
