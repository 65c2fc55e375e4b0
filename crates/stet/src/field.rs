//! Field nodes: the binding between one core-model field and its source.

use crate::{
    core::CoreValue, error::Error, model::HighValue, node::NodeId, sync::SyncContext,
    unmarshal::UnmarshalContext,
};

/// Wraps a single core-model field: the wire key, the parsed value, the
/// source nodes of both, and a presence flag. `present == false` means the
/// key was absent in the source (or the value was null on a non-nullable
/// field); when `present`, both nodes are set.
#[derive(Debug, Clone, Default)]
pub struct FieldNode<T> {
    pub key: String,
    pub key_node: Option<NodeId>,
    pub value: T,
    pub value_node: Option<NodeId>,
    pub present: bool,
}

impl<T> FieldNode<T> {
    pub fn new(value: T) -> Self {
        Self {
            key: String::new(),
            key_node: None,
            value,
            value_node: None,
            present: false,
        }
    }

    pub fn is_present(&self) -> bool {
        self.present
    }
}

impl<T: CoreValue> FieldNode<T> {
    /// Interprets a `(key, value)` node pair against the declared field
    /// type. Aliases resolve for decoding, but the alias node itself is
    /// stored so it survives the round-trip. A null value on a non-nullable
    /// field records absence without an error.
    #[doc(hidden)]
    pub fn unmarshal(
        &mut self,
        cx: &mut UnmarshalContext<'_>,
        key_node: NodeId,
        value_node: NodeId,
    ) -> Result<(), Error> {
        cx.check_cancel()?;
        self.key = cx.arena()[key_node]
            .scalar_value()
            .unwrap_or_default()
            .to_owned();
        self.key_node = Some(key_node);
        self.value_node = Some(value_node);
        if !T::NULLABLE && cx.arena()[cx.resolved(value_node)].is_null() {
            self.value = T::default();
            self.present = false;
            return Ok(());
        }
        self.value = T::unmarshal(cx, value_node)?;
        self.present = true;
        Ok(())
    }

    /// Reconciles a high-side value into this field, then ensures the
    /// `(key, value)` pair appears in `mapping`. An unchanged value with a
    /// live node leaves everything untouched; an absent value removes the
    /// key.
    #[doc(hidden)]
    pub fn sync<H: HighValue<Repr = T>>(
        &mut self,
        cx: &mut SyncContext<'_>,
        value: &mut H,
        key: &'static str,
        mapping: NodeId,
    ) -> Result<(), Error> {
        cx.check_cancel()?;
        let wire_key = if self.key.is_empty() {
            key.to_owned()
        } else {
            self.key.clone()
        };

        // Unchanged value with a live node: nothing to do, even for `None`
        // (an explicit null in the source stays an explicit null).
        let unchanged = self.present && self.value_node.is_some() && value.eq_repr(&self.value);

        if !unchanged {
            if value.is_absent() {
                if self.present {
                    cx.delete_key(mapping, &wire_key);
                }
                self.value = T::default();
                self.value_node = None;
                self.present = false;
                return Ok(());
            }
            // A never-present field holding an empty container stays absent
            // rather than materializing an empty key.
            if !self.present && value.is_vacant() {
                return Ok(());
            }
        }

        let value_node = match (unchanged, self.value_node) {
            (true, Some(id)) => id,
            _ => value.sync_repr(cx, &mut self.value, self.value_node)?,
        };
        self.value_node = Some(value_node);
        self.present = true;
        if self.key.is_empty() {
            self.key = wire_key.clone();
        }

        let key_node = match self.key_node {
            Some(id) => id,
            None => {
                let id = cx.new_key_node(&wire_key);
                self.key_node = Some(id);
                id
            }
        };
        cx.upsert(mapping, &wire_key, key_node, value_node);
        Ok(())
    }
}
