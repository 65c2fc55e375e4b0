//! Lossless node tree for YAML/JSON documents.
//!
//! Nodes are arena-allocated: everything refers to a node by its [`NodeId`],
//! and identity comparisons (e.g. sequence element matching during sync) are
//! comparisons of arena keys. A node carries its structural kind plus all the
//! lexical trivia needed to reproduce the source: comments, anchor names,
//! scalar quoting and collection styles, and the source position.

use std::fmt;

use slotmap::SlotMap;

pub(crate) mod emit;
pub(crate) mod parse;
#[cfg(test)]
mod tests;

slotmap::new_key_type! {
    /// Stable identity of a node within its document's [`NodeArena`].
    pub struct NodeId;
}

/// Well-known YAML 1.2 core schema tags.
pub mod tag {
    pub const STR: &str = "!!str";
    pub const INT: &str = "!!int";
    pub const FLOAT: &str = "!!float";
    pub const BOOL: &str = "!!bool";
    pub const NULL: &str = "!!null";
    pub const MAP: &str = "!!map";
    pub const SEQ: &str = "!!seq";
}

bitflags::bitflags! {
    /// Lexical presentation of a node.
    ///
    /// Scalar nodes carry at most one of the quoting/block bits; collection
    /// nodes carry [`Style::FLOW`] when written in flow style. The remaining
    /// bits record layout details that must survive a round-trip.
    pub struct Style: u8 {
        /// `'single quoted'` scalar.
        const SINGLE_QUOTED = 1;
        /// `"double quoted"` scalar.
        const DOUBLE_QUOTED = 1 << 1;
        /// `|` literal block scalar.
        const LITERAL = 1 << 2;
        /// `>` folded block scalar.
        const FOLDED = 1 << 3;
        /// Flow collection (`{...}` / `[...]`).
        const FLOW = 1 << 4;
        /// Block sequence written at the same indent as its parent mapping key.
        const ZERO_INDENTED = 1 << 5;
        /// Document introduced by an explicit `---` marker.
        const EXPLICIT_START = 1 << 6;
    }
}

impl Default for Style {
    fn default() -> Self {
        Style::empty()
    }
}

/// Structural kind of a [`Node`].
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Document root; wraps at most one content node.
    Document { content: Option<NodeId> },
    /// Ordered `(key, value)` pairs.
    Mapping { entries: Vec<(NodeId, NodeId)> },
    /// Ordered list of items.
    Sequence { items: Vec<NodeId> },
    /// Scalar with its resolved tag. `raw` retains the verbatim source text
    /// of literal/folded block scalars and is cleared on mutation.
    Scalar {
        value: String,
        tag: String,
        raw: Option<String>,
    },
    /// Reference to an anchored node.
    Alias { name: String, target: NodeId },
}

/// A single node of the document tree.
#[derive(Debug, Clone)]
pub struct Node {
    pub kind: NodeKind,
    pub style: Style,
    /// `&name` anchor declared on this node, if any.
    pub anchor: Option<String>,
    /// Comment block (and blank lines) preceding the node. Lines are
    /// newline-separated; an empty line stands for a blank source line.
    pub head_comment: String,
    /// `# ...` comment on the same line as the node.
    pub line_comment: String,
    /// Comment block following the node.
    pub foot_comment: String,
    pub line: u32,
    pub column: u32,
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            style: Style::default(),
            anchor: None,
            head_comment: String::new(),
            line_comment: String::new(),
            foot_comment: String::new(),
            line: 0,
            column: 0,
        }
    }

    pub fn scalar(value: impl Into<String>, tag: &str) -> Self {
        Self::new(NodeKind::Scalar {
            value: value.into(),
            tag: tag.to_owned(),
            raw: None,
        })
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Is this a scalar with the `!!null` tag?
    pub fn is_null(&self) -> bool {
        matches!(&self.kind, NodeKind::Scalar { tag, .. } if tag == tag::NULL)
    }

    /// Scalar text, if this node is a scalar.
    pub fn scalar_value(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { value, .. } => Some(value),
            _ => None,
        }
    }

    /// Scalar tag, if this node is a scalar.
    pub fn scalar_tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Human-readable kind name for diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            NodeKind::Document { .. } => "document",
            NodeKind::Mapping { .. } => "mapping",
            NodeKind::Sequence { .. } => "sequence",
            NodeKind::Scalar { .. } => "scalar",
            NodeKind::Alias { .. } => "alias",
        }
    }
}

/// Arena owning every node of one document.
#[derive(Debug, Clone, Default)]
pub struct NodeArena {
    nodes: SlotMap<NodeId, Node>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> NodeId {
        self.nodes.insert(node)
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows alias links to the referenced node. Alias chains cannot be
    /// cyclic (aliases only point at previously anchored nodes), but the
    /// walk is bounded anyway.
    pub fn resolve(&self, mut id: NodeId) -> NodeId {
        for _ in 0..16 {
            match &self[id].kind {
                NodeKind::Alias { target, .. } => id = *target,
                _ => return id,
            }
        }
        id
    }

    /// Unwraps a document node to its content; other kinds pass through.
    pub fn content(&self, id: NodeId) -> Option<NodeId> {
        match &self[id].kind {
            NodeKind::Document { content } => *content,
            _ => Some(id),
        }
    }

    /// Scalar text of `id` after alias resolution.
    pub fn scalar_value(&self, id: NodeId) -> Option<&str> {
        self[self.resolve(id)].scalar_value()
    }

    pub fn new_scalar(&mut self, value: impl Into<String>, tag: &str, style: Style) -> NodeId {
        self.insert(Node::scalar(value, tag).with_style(style))
    }

    pub fn new_null(&mut self) -> NodeId {
        self.new_scalar("null", tag::NULL, Style::empty())
    }

    /// Entries of a mapping node, cloned so the arena can be mutated while
    /// iterating.
    pub fn mapping_entries(&self, id: NodeId) -> Vec<(NodeId, NodeId)> {
        match &self[id].kind {
            NodeKind::Mapping { entries } => entries.clone(),
            _ => Vec::new(),
        }
    }

    /// Items of a sequence node, cloned.
    pub fn sequence_items(&self, id: NodeId) -> Vec<NodeId> {
        match &self[id].kind {
            NodeKind::Sequence { items } => items.clone(),
            _ => Vec::new(),
        }
    }

    /// Index of `key` among a mapping's entries, comparing the scalar form
    /// of each key node.
    pub fn find_key(&self, mapping: NodeId, key: &str) -> Option<usize> {
        match &self[mapping].kind {
            NodeKind::Mapping { entries } => entries
                .iter()
                .position(|(k, _)| self[*k].scalar_value() == Some(key)),
            _ => None,
        }
    }

    /// Structural equality of two subtrees, ignoring source positions.
    ///
    /// This is the `Parse(D') == Parse(D)` relation of the round-trip law:
    /// kinds, scalar values and tags, entry order, styles, anchors and
    /// comments all participate.
    pub fn deep_eq(&self, a: NodeId, other: &NodeArena, b: NodeId) -> bool {
        let (na, nb) = (&self[a], &other[b]);
        if na.style != nb.style
            || na.anchor != nb.anchor
            || na.head_comment != nb.head_comment
            || na.line_comment != nb.line_comment
            || na.foot_comment != nb.foot_comment
        {
            return false;
        }
        match (&na.kind, &nb.kind) {
            (NodeKind::Document { content: ca }, NodeKind::Document { content: cb }) => {
                match (ca, cb) {
                    (Some(ca), Some(cb)) => self.deep_eq(*ca, other, *cb),
                    (None, None) => true,
                    _ => false,
                }
            }
            (NodeKind::Mapping { entries: ea }, NodeKind::Mapping { entries: eb }) => {
                ea.len() == eb.len()
                    && ea.iter().zip(eb).all(|((ka, va), (kb, vb))| {
                        self.deep_eq(*ka, other, *kb) && self.deep_eq(*va, other, *vb)
                    })
            }
            (NodeKind::Sequence { items: ia }, NodeKind::Sequence { items: ib }) => {
                ia.len() == ib.len()
                    && ia
                        .iter()
                        .zip(ib)
                        .all(|(a, b)| self.deep_eq(*a, other, *b))
            }
            (
                NodeKind::Scalar {
                    value: va, tag: ta, ..
                },
                NodeKind::Scalar {
                    value: vb, tag: tb, ..
                },
            ) => va == vb && ta == tb,
            (NodeKind::Alias { name: na, .. }, NodeKind::Alias { name: nb, .. }) => na == nb,
            _ => false,
        }
    }
}

impl std::ops::Index<NodeId> for NodeArena {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id]
    }
}

impl std::ops::IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id]
    }
}

impl fmt::Display for Style {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, formatter)
    }
}
