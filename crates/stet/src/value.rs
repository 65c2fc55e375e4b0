//! Dynamic payloads for untyped targets.
//!
//! [`Value`] is the engine's "any" type: the natural decoding of arbitrary
//! document subtrees, plus a [`Value::Raw`] variant that carries a source
//! node verbatim. Extensions always use `Raw`, which is what makes their
//! round-trip byte-exact.

use crate::{
    core::CoreValue,
    error::Error,
    map::OrderedMap,
    model::HighValue,
    node::{tag, NodeId, NodeKind},
    sync::SyncContext,
    unmarshal::{parse_bool_text, parse_float_text, UnmarshalContext},
};
use crate::node::emit::parse_int_text;

/// A dynamic document value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Seq(Vec<Value>),
    Map(OrderedMap<String, Value>),
    /// An uninterpreted source node, emitted verbatim.
    Raw(NodeId),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Number(number) => number.as_i64(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(number) => number.as_f64(),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Self::Seq(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap<String, Value>> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }

    /// Converts a float, if it is representable as a JSON number.
    pub fn from_f64(value: f64) -> Option<Self> {
        serde_json::Number::from_f64(value).map(Self::Number)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<serde_json::Number> for Value {
    fn from(value: serde_json::Number) -> Self {
        Self::Number(value)
    }
}

impl CoreValue for Value {
    const NULLABLE: bool = true;

    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match &cx.arena()[resolved].kind {
            NodeKind::Scalar { value, tag: t, .. } => Ok(match t.as_str() {
                tag::NULL => Self::Null,
                tag::BOOL => parse_bool_text(value)
                    .map_or_else(|| Self::String(value.clone()), Self::Bool),
                tag::INT => parse_int_text(value)
                    .map_or_else(|| Self::String(value.clone()), |n| Self::Number(n.into())),
                tag::FLOAT => parse_float_text(value)
                    .and_then(Self::from_f64)
                    .unwrap_or_else(|| Self::String(value.clone())),
                _ => Self::String(value.clone()),
            }),
            NodeKind::Sequence { .. } => {
                let items = cx.arena().sequence_items(resolved);
                let mut seq = Vec::with_capacity(items.len());
                for item in items {
                    cx.check_cancel()?;
                    seq.push(Self::unmarshal(cx, item)?);
                }
                Ok(Self::Seq(seq))
            }
            NodeKind::Mapping { .. } => {
                let entries = cx.arena().mapping_entries(resolved);
                let mut map = OrderedMap::default();
                for (key_node, value_node) in entries {
                    cx.check_cancel()?;
                    let Some(key) = cx.arena()[key_node].scalar_value().map(str::to_owned)
                    else {
                        cx.push_mismatch("a scalar key", key_node);
                        continue;
                    };
                    let value = Self::unmarshal(cx, value_node)?;
                    map.push_entry(key, Some(key_node), value, Some(value_node));
                }
                Ok(Self::Map(map))
            }
            NodeKind::Alias { .. } | NodeKind::Document { .. } => Ok(Self::Null),
        }
    }
}

impl HighValue for Value {
    type Repr = Value;

    fn from_repr(repr: &Value) -> Result<Self, Error> {
        Ok(repr.clone())
    }

    fn eq_repr(&self, repr: &Value) -> bool {
        self == repr
    }

    fn is_vacant(&self) -> bool {
        self.is_null()
    }

    fn sync_repr(
        &mut self,
        cx: &mut SyncContext<'_>,
        repr: &mut Value,
        node: Option<NodeId>,
    ) -> Result<NodeId, Error> {
        if let Value::Raw(id) = self {
            let id = *id;
            *repr = self.clone();
            return Ok(id);
        }
        if *self == *repr {
            if let Some(id) = node {
                return Ok(id);
            }
        }
        *repr = self.clone();
        Ok(cx.build_value_node(self, node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions() {
        assert_eq!(Value::from(true), Value::Bool(true));
        assert_eq!(Value::from(3_i64).as_i64(), Some(3));
        assert_eq!(Value::from("x").as_str(), Some("x"));
        assert!(Value::from_f64(f64::NAN).is_none());
        assert!(Value::default().is_null());
    }
}
