//! Shared syntactic helpers.

use syn::{GenericArgument, PathArguments, Type, TypePath};

/// Last path segment identifier of a type, if it is a plain path.
pub(crate) fn type_head(ty: &Type) -> Option<String> {
    let Type::Path(TypePath { path, .. }) = ty else {
        return None;
    };
    path.segments.last().map(|segment| segment.ident.to_string())
}

pub(crate) fn is_option(ty: &Type) -> bool {
    let Type::Path(TypePath { path, .. }) = ty else {
        return false;
    };
    let Some(segment) = path.segments.last() else {
        return false;
    };
    if segment.ident != "Option" {
        return false;
    }
    let PathArguments::AngleBracketed(angle_bracketed) = &segment.arguments else {
        return false;
    };
    angle_bracketed.args.len() == 1
        && matches!(angle_bracketed.args[0], GenericArgument::Type(_))
}

/// Whether absence of a field of this type is meaningful on its own, i.e.
/// the field should not be inferred as required.
pub(crate) fn is_container(ty: &Type) -> bool {
    matches!(
        type_head(ty).as_deref(),
        Some("Option" | "Vec" | "OrderedMap" | "Extensions" | "Value")
    )
}
