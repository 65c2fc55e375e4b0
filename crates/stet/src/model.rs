//! High models: the application-facing side of the dual model.
//!
//! A high model is a plain-value struct with an embedded core
//! (`#[stet(core)]`). `#[derive(Model)]` generates the [`Model`] impl with a
//! static [`FieldDescriptor`] table; the engine walks descriptors instead of
//! reflecting over the type. [`HighValue`] is the per-value bridge between a
//! high value and its core representation; implementations exist for
//! scalars, options, vectors, ordered maps, dynamic values, either-variants
//! and (generated) every model.

use std::fmt;

use crate::{
    core::{CoreModel, CoreValue},
    error::Error,
    field::FieldNode,
    map::{MapKey, OrderedMap},
    node::{tag, NodeId},
    sync::SyncContext,
};

/// A value that can appear as a high-model field, bridged to its core
/// representation `Repr`.
pub trait HighValue: Sized + Clone + fmt::Debug {
    /// What the core model stores for this value.
    type Repr: CoreValue;

    /// Deep-copies a core representation into an application value.
    fn from_repr(repr: &Self::Repr) -> Result<Self, Error>;

    /// Value equality against the cached core value; `true` lets the syncer
    /// leave the backing node untouched.
    fn eq_repr(&self, repr: &Self::Repr) -> bool {
        let _ = repr;
        false
    }

    /// Whether this value denotes an absent optional field (key removal on
    /// sync).
    fn is_absent(&self) -> bool {
        false
    }

    /// Whether this value carries nothing worth materializing. A vacant
    /// value on a field that was never present stays absent instead of
    /// emitting an empty key.
    fn is_vacant(&self) -> bool {
        false
    }

    /// Root-node identity used for sequence element matching.
    fn identity(&self) -> Option<NodeId> {
        None
    }

    /// Reconciles this value into `repr` and its backing node, returning the
    /// node that now holds the value.
    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Self::Repr,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error>;
}

/// Per-field entry in a model's static sync descriptor table.
pub struct FieldDescriptor<M: Model> {
    /// Wire name of the field (empty for the extensions slot).
    pub key: &'static str,
    pub required: bool,
    /// Syncs the field into the given mapping node.
    pub sync: fn(&mut M, &mut SyncContext<'_>, NodeId) -> Result<(), Error>,
    /// Reads the field's presence flag off the core.
    pub present: fn(&M::Core) -> bool,
}

impl<M: Model> Clone for FieldDescriptor<M> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<M: Model> Copy for FieldDescriptor<M> {}

impl<M: Model> fmt::Debug for FieldDescriptor<M> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("FieldDescriptor")
            .field("key", &self.key)
            .field("required", &self.required)
            .finish_non_exhaustive()
    }
}

/// An application-facing model struct. Implemented by `#[derive(Model)]`.
pub trait Model: Clone + fmt::Debug + 'static {
    /// The node-bound mirror of this model.
    type Core: CoreModel;

    fn core(&self) -> &Self::Core;

    fn core_mut(&mut self) -> &mut Self::Core;

    /// Writes an updated core back into the model after a sync.
    fn set_core(&mut self, core: Self::Core)
    where
        Self: Sized,
    {
        *self.core_mut() = core;
    }

    /// Declared fields in declaration order, extensions last.
    fn descriptors() -> &'static [FieldDescriptor<Self>]
    where
        Self: Sized;

    /// Populates a fresh model from an unmarshalled core.
    fn from_core(core: &Self::Core) -> Result<Self, Error>
    where
        Self: Sized;

    /// The root node identity used for cross-operation element matching.
    fn root_node(&self) -> Option<NodeId> {
        self.core().root().node
    }

    /// Reconciles this model into the node tree. The default walks the
    /// descriptor table; types with bespoke wire shapes override this.
    fn sync_changes(
        &mut self,
        cx: &mut SyncContext<'_>,
        node: Option<NodeId>,
        skip_required: bool,
    ) -> Result<NodeId, Error>
    where
        Self: Sized,
    {
        crate::sync::sync_model(self, cx, node, skip_required)
    }
}

// ===== Scalars =====

macro_rules! impl_scalar_high_value {
    ($ty:ty, $tag:expr, $render:expr) => {
        impl HighValue for $ty {
            type Repr = $ty;

            fn from_repr(repr: &$ty) -> Result<Self, Error> {
                Ok(repr.clone())
            }

            fn eq_repr(&self, repr: &$ty) -> bool {
                self == repr
            }

            fn sync_repr(
                &mut self,
                cx: &mut SyncContext<'_>,
                repr: &mut $ty,
                node: Option<NodeId>,
            ) -> Result<NodeId, Error> {
                if *self == *repr {
                    if let Some(id) = node {
                        return Ok(id);
                    }
                }
                *repr = self.clone();
                let text = $render(&*self);
                Ok(cx.set_scalar(node, &text, $tag))
            }
        }
    };
}

impl_scalar_high_value!(String, tag::STR, |value: &String| value.clone());
impl_scalar_high_value!(bool, tag::BOOL, |value: &bool| value.to_string());
impl_scalar_high_value!(i64, tag::INT, |value: &i64| value.to_string());
impl_scalar_high_value!(f64, tag::FLOAT, render_float);

/// Renders a float so its plain form still resolves to `!!float`.
fn render_float(value: &f64) -> String {
    if value.is_nan() {
        ".nan".to_owned()
    } else if value.is_infinite() {
        if *value < 0.0 { "-.inf" } else { ".inf" }.to_owned()
    } else if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        format!("{value}")
    }
}

// ===== Containers =====

impl<H: HighValue> HighValue for Option<H> {
    type Repr = Option<H::Repr>;

    fn from_repr(repr: &Self::Repr) -> Result<Self, Error> {
        repr.as_ref().map(H::from_repr).transpose()
    }

    fn eq_repr(&self, repr: &Self::Repr) -> bool {
        match (self, repr) {
            (Some(value), Some(repr)) => value.eq_repr(repr),
            (None, None) => true,
            _ => false,
        }
    }

    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn identity(&self) -> Option<NodeId> {
        self.as_ref().and_then(H::identity)
    }

    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Self::Repr,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        match self {
            Some(value) => {
                if repr.is_none() {
                    *repr = Some(H::Repr::default());
                }
                value.sync_repr(cx, repr.as_mut().expect("just ensured"), node)
            }
            None => {
                *repr = None;
                Ok(cx.null_node(node))
            }
        }
    }
}

impl<H: HighValue> HighValue for Vec<H> {
    type Repr = Vec<FieldNode<H::Repr>>;

    fn from_repr(repr: &Self::Repr) -> Result<Self, Error> {
        repr.iter().map(|field| H::from_repr(&field.value)).collect()
    }

    fn eq_repr(&self, repr: &Self::Repr) -> bool {
        self.len() == repr.len()
            && self
                .iter()
                .zip(repr)
                .all(|(value, field)| value.eq_repr(&field.value))
    }

    fn is_vacant(&self) -> bool {
        self.is_empty()
    }

    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Self::Repr,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        crate::sync::sync_sequence(cx, self, repr, node)
    }
}

impl<K, H> HighValue for OrderedMap<K, H>
where
    K: MapKey + Clone + fmt::Debug + 'static,
    H: HighValue,
{
    type Repr = OrderedMap<K, H::Repr>;

    fn from_repr(repr: &Self::Repr) -> Result<Self, Error> {
        let mut map = OrderedMap::default();
        for entry in repr.entries() {
            map.push_entry(
                entry.key.clone(),
                entry.key_node,
                H::from_repr(&entry.value)?,
                entry.value_node,
            );
        }
        Ok(map)
    }

    fn eq_repr(&self, repr: &Self::Repr) -> bool {
        self.len() == repr.len()
            && self
                .entries()
                .iter()
                .zip(repr.entries())
                .all(|(a, b)| {
                    a.key.to_scalar() == b.key.to_scalar() && a.value.eq_repr(&b.value)
                })
    }

    fn is_vacant(&self) -> bool {
        self.is_empty()
    }

    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Self::Repr,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        crate::sync::sync_ordered_map(cx, self, repr, node)
    }
}
