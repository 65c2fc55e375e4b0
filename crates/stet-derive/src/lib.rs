#![recursion_limit = "128"]

//! Derive macros for the `stet` document engine.

extern crate proc_macro;

use proc_macro::TokenStream;

mod model;
mod utils;

/// Derives the dual-model plumbing for a high-model struct: the node-bound
/// core struct, the unmarshal field table, the sync descriptor table and the
/// populator.
///
/// Field attributes: `#[stet(key = "wireName")]`, `#[stet(required)]`,
/// `#[stet(extensions)]` (the `x-*` sink), `#[stet(core)]` (the embedded
/// core slot; its declared type names the generated struct). Container
/// attributes: `#[stet(crate = path)]`, `#[stet(sync_with = path)]`.
#[proc_macro_derive(Model, attributes(stet))]
pub fn model(input: TokenStream) -> TokenStream {
    model::impl_model(input)
}
