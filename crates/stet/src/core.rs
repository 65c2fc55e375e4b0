//! Node-bound core models.
//!
//! A core model mirrors a high model field for field, but each field is a
//! [`FieldNode`](crate::FieldNode) remembering the source nodes it was parsed
//! from. Core types are generated by `#[derive(Model)]`, which also builds
//! the static [`CoreField`] table the engine walks instead of reflecting
//! over the type.

use std::fmt;

use crate::{
    config::DocumentConfig,
    error::Error,
    extensions::Extensions,
    node::NodeId,
    unmarshal::UnmarshalContext,
};

/// Document-level state carried by every core model.
#[derive(Debug, Clone)]
pub struct CoreRoot {
    /// The node this core was unmarshalled from (and syncs back into).
    pub node: Option<NodeId>,
    /// Document-wide emission settings, recorded at load.
    pub config: DocumentConfig,
    /// False iff a required field was absent after the last unmarshal/sync.
    pub valid: bool,
}

impl Default for CoreRoot {
    fn default() -> Self {
        Self {
            node: None,
            config: DocumentConfig::default(),
            valid: true,
        }
    }
}

/// Per-field entry in a core model's static field table.
pub struct CoreField<C> {
    /// Wire name of the field.
    pub key: &'static str,
    /// Whether absence of the field invalidates the core.
    pub required: bool,
    /// Unmarshals the field from a `(key, value)` node pair.
    pub unmarshal: fn(&mut C, &mut UnmarshalContext<'_>, NodeId, NodeId) -> Result<(), Error>,
    /// Reads the field's presence flag.
    pub present: fn(&C) -> bool,
}

impl<C> Clone for CoreField<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C> Copy for CoreField<C> {}

impl<C> fmt::Debug for CoreField<C> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("CoreField")
            .field("key", &self.key)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// A node-bound mirror of a high model. Implementations are generated by
/// `#[derive(Model)]`, which also emits the [`CoreValue`] impl delegating to
/// [`unmarshal_core`](crate::unmarshal_core).
pub trait CoreModel: CoreValue + 'static {
    /// Declared fields in declaration order.
    fn fields() -> &'static [CoreField<Self>];

    fn root(&self) -> &CoreRoot;

    fn root_mut(&mut self) -> &mut CoreRoot;

    /// The `x-*` sink, when the model declares one.
    fn extensions(&self) -> Option<&Extensions> {
        None
    }

    fn extensions_mut(&mut self) -> Option<&mut Extensions> {
        None
    }
}

/// A value that can live inside a [`FieldNode`](crate::FieldNode): scalars,
/// options, sequences, ordered maps, dynamic values, either-variants and
/// nested cores.
pub trait CoreValue: Sized + Default + Clone + fmt::Debug {
    /// Whether a null node decodes to a value (`Option`, dynamic values)
    /// rather than marking the field absent.
    const NULLABLE: bool = false;

    /// Decodes a node into this representation. Type mismatches are recorded
    /// as validation errors on the context and yield the default value; only
    /// structural impossibilities (cancellation, broken anchors) are fatal.
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error>;
}
