//! Node tree → core model decoding.
//!
//! # How it works
//!
//! Unlike serde-style deserialization, decoding never stops at the first
//! problem: each field is decoded in isolation and validation errors are
//! accumulated on the [`UnmarshalContext`], so a single pass reports
//! everything that is wrong with a document. Only structural impossibilities
//! (cancellation, unresolvable anchors) abort.
//!
//! The context tracks the dot-path from the document root for error
//! messages and hands out reborrowed child contexts per field, map entry or
//! sequence element.

use crate::{
    cancel::CancelToken,
    config::DocumentConfig,
    core::{CoreModel, CoreValue},
    error::{Error, ValidationError, ValidationErrorKind, ValidationErrors},
    field::FieldNode,
    map::{MapKey, OrderedMap},
    node::{emit::parse_int_text, NodeArena, NodeId, NodeKind},
};

/// Context for decoding one document into a core model.
#[derive(Debug)]
pub struct UnmarshalContext<'a> {
    arena: &'a NodeArena,
    config: &'a DocumentConfig,
    path: String,
    errors: &'a mut ValidationErrors,
    cancel: &'a CancelToken,
}

impl<'a> UnmarshalContext<'a> {
    pub(crate) fn new(
        arena: &'a NodeArena,
        config: &'a DocumentConfig,
        errors: &'a mut ValidationErrors,
        cancel: &'a CancelToken,
    ) -> Self {
        Self {
            arena,
            config,
            path: String::new(),
            errors,
            cancel,
        }
    }

    /// Reborrows this context for a child value at `segment`.
    pub fn child(&mut self, segment: &str) -> UnmarshalContext<'_> {
        let path = if self.path.is_empty() {
            segment.to_owned()
        } else {
            format!("{}.{segment}", self.path)
        };
        UnmarshalContext {
            arena: self.arena,
            config: self.config,
            path,
            errors: &mut *self.errors,
            cancel: self.cancel,
        }
    }

    pub fn arena(&self) -> &NodeArena {
        self.arena
    }

    pub fn config(&self) -> &DocumentConfig {
        self.config
    }

    pub fn check_cancel(&self) -> Result<(), Error> {
        self.cancel.check()
    }

    /// Alias and document indirections removed.
    pub fn resolved(&self, id: NodeId) -> NodeId {
        let resolved = self.arena.resolve(id);
        match self.arena.content(resolved) {
            Some(content) => self.arena.resolve(content),
            None => resolved,
        }
    }

    /// Runs `f` against a scratch error list, returning the decoded value
    /// together with the findings it produced. Used to try either-variant
    /// sides without committing their errors.
    pub fn speculate<T>(
        &mut self,
        f: impl FnOnce(&mut UnmarshalContext<'_>) -> Result<T, Error>,
    ) -> Result<(T, ValidationErrors), Error> {
        let mut scratch = ValidationErrors::default();
        let mut cx = UnmarshalContext {
            arena: self.arena,
            config: self.config,
            path: self.path.clone(),
            errors: &mut scratch,
            cancel: self.cancel,
        };
        let value = f(&mut cx)?;
        Ok((value, scratch))
    }

    pub fn absorb(&mut self, errors: ValidationErrors) {
        self.errors.extend(errors);
    }

    pub fn push_mismatch(&mut self, expected: &'static str, node: NodeId) {
        let node = &self.arena[node];
        self.errors.push(ValidationError::new(
            ValidationErrorKind::TypeMismatch {
                expected,
                actual: node.kind_name().to_owned(),
            },
            self.path.clone(),
            node.line,
            node.column,
        ));
    }

    pub fn push_invalid(&mut self, expected: &'static str, actual: &str, node: NodeId) {
        let node = &self.arena[node];
        self.errors.push(ValidationError::new(
            ValidationErrorKind::InvalidValue {
                expected,
                actual: actual.to_owned(),
            },
            self.path.clone(),
            node.line,
            node.column,
        ));
    }

    pub fn push_unknown_key(&mut self, key: &str, node: NodeId) {
        let node = &self.arena[node];
        self.errors.push(ValidationError::new(
            ValidationErrorKind::UnknownKey(key.to_owned()),
            self.path.clone(),
            node.line,
            node.column,
        ));
    }

    pub fn push_required_missing(&mut self, key: &str) {
        self.errors.push(ValidationError::new(
            ValidationErrorKind::RequiredFieldMissing(key.to_owned()),
            self.path.clone(),
            0,
            0,
        ));
    }
}

// ===== Scalar decoding =====

pub(crate) fn parse_bool_text(text: &str) -> Option<bool> {
    match text {
        "true" | "True" | "TRUE" => Some(true),
        "false" | "False" | "FALSE" => Some(false),
        _ => None,
    }
}

pub(crate) fn parse_float_text(text: &str) -> Option<f64> {
    match text {
        ".inf" | "+.inf" | ".Inf" | "+.Inf" => Some(f64::INFINITY),
        "-.inf" | "-.Inf" => Some(f64::NEG_INFINITY),
        ".nan" | ".NaN" | ".NAN" => Some(f64::NAN),
        _ => text.parse().ok(),
    }
}

impl CoreValue for String {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match cx.arena()[resolved].scalar_value() {
            Some(value) => Ok(value.to_owned()),
            None => {
                cx.push_mismatch("a string", resolved);
                Ok(String::new())
            }
        }
    }
}

impl CoreValue for bool {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match cx.arena()[resolved].scalar_value() {
            Some(text) => match parse_bool_text(text) {
                Some(value) => Ok(value),
                None => {
                    let text = text.to_owned();
                    cx.push_invalid("a boolean", &text, resolved);
                    Ok(false)
                }
            },
            None => {
                cx.push_mismatch("a boolean", resolved);
                Ok(false)
            }
        }
    }
}

impl CoreValue for i64 {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match cx.arena()[resolved].scalar_value() {
            Some(text) => match parse_int_text(text) {
                Some(value) => Ok(value),
                None => {
                    let text = text.to_owned();
                    cx.push_invalid("an integer", &text, resolved);
                    Ok(0)
                }
            },
            None => {
                cx.push_mismatch("an integer", resolved);
                Ok(0)
            }
        }
    }
}

impl CoreValue for f64 {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match cx.arena()[resolved].scalar_value() {
            Some(text) => match parse_float_text(text) {
                Some(value) => Ok(value),
                None => {
                    let text = text.to_owned();
                    cx.push_invalid("a number", &text, resolved);
                    Ok(0.0)
                }
            },
            None => {
                cx.push_mismatch("a number", resolved);
                Ok(0.0)
            }
        }
    }
}

// ===== Containers =====

impl<T: CoreValue> CoreValue for Option<T> {
    const NULLABLE: bool = true;

    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        if cx.arena()[resolved].is_null() {
            Ok(None)
        } else {
            T::unmarshal(cx, node).map(Some)
        }
    }
}

impl<T: CoreValue> CoreValue for Vec<FieldNode<T>> {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match &cx.arena()[resolved].kind {
            NodeKind::Sequence { .. } => {
                let items = cx.arena().sequence_items(resolved);
                let mut elements = Vec::with_capacity(items.len());
                for (index, item) in items.into_iter().enumerate() {
                    cx.check_cancel()?;
                    let mut child = cx.child(&index.to_string());
                    let value = T::unmarshal(&mut child, item)?;
                    elements.push(FieldNode {
                        key: String::new(),
                        key_node: None,
                        value,
                        value_node: Some(item),
                        present: true,
                    });
                }
                Ok(elements)
            }
            _ => {
                cx.push_mismatch("a sequence", resolved);
                Ok(Vec::new())
            }
        }
    }
}

impl<K: MapKey + Clone + std::fmt::Debug + 'static, T: CoreValue> CoreValue for OrderedMap<K, T> {
    fn unmarshal(cx: &mut UnmarshalContext<'_>, node: NodeId) -> Result<Self, Error> {
        let resolved = cx.resolved(node);
        match &cx.arena()[resolved].kind {
            NodeKind::Mapping { .. } => {
                let entries = cx.arena().mapping_entries(resolved);
                let mut map = OrderedMap::default();
                for (key_node, value_node) in entries {
                    cx.check_cancel()?;
                    let Some(key_text) = cx.arena()[key_node].scalar_value().map(str::to_owned)
                    else {
                        cx.push_mismatch("a scalar key", key_node);
                        continue;
                    };
                    let Some(key) = K::from_scalar(&key_text) else {
                        cx.push_invalid(K::expecting(), &key_text, key_node);
                        continue;
                    };
                    let mut child = cx.child(&key_text);
                    let value = T::unmarshal(&mut child, value_node)?;
                    map.push_entry(key, Some(key_node), value, Some(value_node));
                }
                Ok(map)
            }
            _ => {
                cx.push_mismatch("a mapping", resolved);
                Ok(OrderedMap::default())
            }
        }
    }
}

// ===== Core models =====

/// Mapping walker behind every generated `CoreValue` impl for core structs:
/// decodes declared fields through the static field table, routes `x-*` keys
/// to the extensions sink, records unknown keys as validation errors, and
/// derives validity from required-field presence.
pub fn unmarshal_core<C: CoreModel>(
    cx: &mut UnmarshalContext<'_>,
    node: NodeId,
) -> Result<C, Error> {
    cx.check_cancel()?;
    let mut core = C::default();
    core.root_mut().config = cx.config().clone();

    let resolved = cx.resolved(node);
    match &cx.arena()[resolved].kind {
        NodeKind::Mapping { .. } => {
            for (key_node, value_node) in cx.arena().mapping_entries(resolved) {
                cx.check_cancel()?;
                let Some(key) = cx.arena()[key_node].scalar_value().map(str::to_owned) else {
                    cx.push_mismatch("a scalar key", key_node);
                    continue;
                };
                if let Some(field) = C::fields().iter().find(|field| field.key == key) {
                    let mut child = cx.child(&key);
                    (field.unmarshal)(&mut core, &mut child, key_node, value_node)?;
                } else if key.starts_with("x-") {
                    match core.extensions_mut() {
                        Some(extensions) => {
                            extensions.insert_loaded(key, key_node, value_node);
                        }
                        None => cx.push_unknown_key(&key, key_node),
                    }
                } else {
                    cx.push_unknown_key(&key, key_node);
                }
            }
        }
        _ => cx.push_mismatch("a mapping", resolved),
    }

    let mut valid = true;
    for field in C::fields() {
        if field.required && !(field.present)(&core) {
            valid = false;
            cx.push_required_missing(field.key);
        }
    }
    core.root_mut().valid = valid;
    core.root_mut().node = Some(resolved);
    Ok(core)
}
