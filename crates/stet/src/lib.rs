//! Format-preserving document engine for YAML/JSON.
//!
//! `stet` loads a document into a strongly-typed model, lets the application
//! mutate that model, and writes it back such that every lexical artifact
//! the user did not touch (comments, anchors and aliases, key order, flow
//! vs. block style, quoting, blank lines) comes out as it went in, while
//! changes are rendered minimally.
//!
//! # How it works
//!
//! Every model is two structs kept in sync: the *high* model (plain values,
//! what you mutate) and a generated *core* model whose fields are
//! [`FieldNode`]s remembering the source nodes they were parsed from.
//! Unmarshalling walks the node tree and the core's static field table in
//! parallel; marshalling diffs each high field against the core and mutates
//! the backing nodes in place. Reordered sequence elements are re-matched to
//! their original nodes by identity, so their comments travel with them.
//!
//! ```
//! use stet::{Document, Model};
//!
//! #[derive(Debug, Clone, Model)]
//! struct Service {
//!     #[stet(key = "name")]
//!     name: String,
//!     #[stet(key = "replicas")]
//!     replicas: Option<i64>,
//!     #[stet(core)]
//!     core: ServiceCore,
//! }
//!
//! let input = "# deployment\nname: api # prod\nreplicas: 2\n";
//! let (mut doc, errors) = Document::<Service>::unmarshal(input)?;
//! assert!(errors.is_empty());
//!
//! doc.model_mut().replicas = Some(4);
//! let output = doc.marshal_to_string()?;
//! assert_eq!(output, "# deployment\nname: api # prod\nreplicas: 4\n");
//! # Ok::<(), stet::Error>(())
//! ```

#[doc(hidden)] // used in the derive macro
pub use once_cell::sync::Lazy;
pub use stet_derive::Model;

pub use self::{
    cancel::CancelToken,
    config::{CollectionStyle, DocumentConfig, KeyQuoteStyle, OutputFormat},
    core::{CoreField, CoreModel, CoreRoot, CoreValue},
    document::Document,
    either::{Either, EitherRepr},
    error::{Error, ValidationError, ValidationErrorKind, ValidationErrors},
    extensions::Extensions,
    field::FieldNode,
    map::{MapKey, OrderedMap},
    model::{FieldDescriptor, HighValue, Model},
    node::{tag, Node, NodeArena, NodeId, NodeKind, Style},
    sync::{sync_model, SyncContext},
    unmarshal::{unmarshal_core, UnmarshalContext},
};
#[doc(hidden)]
pub use self::sync::sync_extensions;

mod cancel;
mod config;
mod core;
mod document;
mod either;
mod error;
mod extensions;
mod field;
mod map;
mod model;
mod node;
mod sync;
#[cfg(test)]
mod testonly;
mod unmarshal;
mod value;

pub use self::value::Value;
