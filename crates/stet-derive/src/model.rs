//! `Model` derive macro implementation.

use proc_macro::TokenStream;
use proc_macro2::Ident;
use quote::{quote, quote_spanned};
use syn::{spanned::Spanned, Attribute, Data, DeriveInput, Field, LitStr, Path, Type, Visibility};

use crate::utils::{is_container, is_option, type_head};

struct ContainerAttrs {
    cr: Option<Path>,
    sync_with: Option<Path>,
}

impl ContainerAttrs {
    fn new(attrs: &[Attribute]) -> syn::Result<Self> {
        let stet_attrs = attrs.iter().filter(|attr| attr.path().is_ident("stet"));

        let mut cr = None;
        let mut sync_with = None;
        for attr in stet_attrs {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("crate") {
                    cr = Some(meta.value()?.parse()?);
                    Ok(())
                } else if meta.path.is_ident("sync_with") {
                    sync_with = Some(meta.value()?.parse()?);
                    Ok(())
                } else {
                    Err(meta.error("unsupported attribute; only `crate` and `sync_with` are supported here"))
                }
            })?;
        }
        Ok(Self { cr, sync_with })
    }
}

struct FieldAttrs {
    key: Option<String>,
    required: bool,
    core: bool,
    extensions: bool,
}

impl FieldAttrs {
    fn new(attrs: &[Attribute]) -> syn::Result<Self> {
        let stet_attrs = attrs.iter().filter(|attr| attr.path().is_ident("stet"));

        let mut key = None;
        let mut required = false;
        let mut core = false;
        let mut extensions = false;
        for attr in stet_attrs {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("key") {
                    let value: LitStr = meta.value()?.parse()?;
                    key = Some(value.value());
                    Ok(())
                } else if meta.path.is_ident("required") {
                    required = true;
                    Ok(())
                } else if meta.path.is_ident("core") {
                    core = true;
                    Ok(())
                } else if meta.path.is_ident("extensions") {
                    extensions = true;
                    Ok(())
                } else {
                    Err(meta.error(
                        "unsupported attribute; expected `key`, `required`, `core` or `extensions`",
                    ))
                }
            })?;
        }
        Ok(Self {
            key,
            required,
            core,
            extensions,
        })
    }
}

struct ModelField {
    name: Ident,
    ty: Type,
    key: String,
    required: bool,
}

impl ModelField {
    fn new(raw: &Field, attrs: &FieldAttrs) -> syn::Result<Self> {
        let name = raw.ident.clone().ok_or_else(|| {
            syn::Error::new_spanned(raw, "only named fields are supported")
        })?;
        if name == "root" {
            let message = "`root` collides with the generated core root slot; rename the field";
            return Err(syn::Error::new(name.span(), message));
        }
        let required = attrs.required || !is_container(&raw.ty) && !is_option(&raw.ty);
        Ok(Self {
            key: attrs.key.clone().unwrap_or_else(|| name.to_string()),
            name,
            ty: raw.ty.clone(),
            required,
        })
    }
}

struct ModelImpl {
    attrs: ContainerAttrs,
    vis: Visibility,
    name: Ident,
    core_name: Ident,
    core_field: Ident,
    extensions_field: Option<Ident>,
    fields: Vec<ModelField>,
}

impl ModelImpl {
    fn new(raw: &DeriveInput) -> syn::Result<Self> {
        let Data::Struct(data) = &raw.data else {
            let message = "#[derive(Model)] can only be placed on structs";
            return Err(syn::Error::new_spanned(raw, message));
        };
        if raw.generics.type_params().count() != 0
            || raw.generics.const_params().count() != 0
            || raw.generics.lifetimes().count() != 0
        {
            let message = "generics are not supported";
            return Err(syn::Error::new_spanned(&raw.generics, message));
        }

        let attrs = ContainerAttrs::new(&raw.attrs)?;
        let mut core: Option<(Ident, Ident)> = None;
        let mut extensions_field = None;
        let mut fields = Vec::new();

        for raw_field in &data.fields {
            let field_attrs = FieldAttrs::new(&raw_field.attrs)?;
            if field_attrs.core {
                let name = raw_field.ident.clone().ok_or_else(|| {
                    syn::Error::new_spanned(raw_field, "only named fields are supported")
                })?;
                let Some(core_name) = type_head(&raw_field.ty) else {
                    let message = "the `core` field must have a plain type path";
                    return Err(syn::Error::new_spanned(&raw_field.ty, message));
                };
                if core.is_some() {
                    let message = "only one `#[stet(core)]` field is allowed";
                    return Err(syn::Error::new_spanned(raw_field, message));
                }
                core = Some((name.clone(), Ident::new(&core_name, raw_field.ty.span())));
            } else if field_attrs.extensions {
                let name = raw_field.ident.clone().ok_or_else(|| {
                    syn::Error::new_spanned(raw_field, "only named fields are supported")
                })?;
                if extensions_field.is_some() {
                    let message = "only one `#[stet(extensions)]` field is allowed";
                    return Err(syn::Error::new_spanned(raw_field, message));
                }
                extensions_field = Some(name);
            } else {
                fields.push(ModelField::new(raw_field, &field_attrs)?);
            }
        }

        let Some((core_field, core_name)) = core else {
            let message = "a `#[stet(core)]` field is required";
            return Err(syn::Error::new_spanned(raw, message));
        };

        Ok(Self {
            attrs,
            vis: raw.vis.clone(),
            name: raw.ident.clone(),
            core_name,
            core_field,
            extensions_field,
            fields,
        })
    }

    fn cr(&self) -> proc_macro2::TokenStream {
        match &self.attrs.cr {
            Some(path) => quote!(#path),
            None => quote!(::stet),
        }
    }

    fn core_struct(&self) -> proc_macro2::TokenStream {
        let cr = self.cr();
        let vis = &self.vis;
        let core_name = &self.core_name;
        let fields = self.fields.iter().map(|field| {
            let name = &field.name;
            let ty = &field.ty;
            quote_spanned! {name.span()=>
                pub #name: #cr::FieldNode<<#ty as #cr::HighValue>::Repr>
            }
        });
        let extensions = self.extensions_field.iter().map(|name| {
            quote_spanned!(name.span()=> pub #name: #cr::Extensions)
        });

        quote! {
            #[derive(Debug, Clone, Default)]
            #vis struct #core_name {
                #(#fields,)*
                #(#extensions,)*
                pub root: #cr::CoreRoot,
            }
        }
    }

    fn core_model_impl(&self) -> proc_macro2::TokenStream {
        let cr = self.cr();
        let core_name = &self.core_name;
        let core_fields = self.fields.iter().map(|field| {
            let name = &field.name;
            let key = &field.key;
            let required = field.required;
            quote_spanned! {name.span()=>
                #cr::CoreField {
                    key: #key,
                    required: #required,
                    unmarshal: |core, cx, key_node, value_node| {
                        core.#name.unmarshal(cx, key_node, value_node)
                    },
                    present: |core| core.#name.present,
                }
            }
        });
        let extensions_accessors = self.extensions_field.as_ref().map(|name| {
            quote_spanned! {name.span()=>
                fn extensions(&self) -> ::core::option::Option<&#cr::Extensions> {
                    ::core::option::Option::Some(&self.#name)
                }

                fn extensions_mut(&mut self) -> ::core::option::Option<&mut #cr::Extensions> {
                    ::core::option::Option::Some(&mut self.#name)
                }
            }
        });
        let extensions_accessors = extensions_accessors.unwrap_or_default();

        quote! {
            impl #cr::CoreModel for #core_name {
                fn fields() -> &'static [#cr::CoreField<Self>] {
                    static FIELDS: #cr::Lazy<Vec<#cr::CoreField<#core_name>>> =
                        #cr::Lazy::new(|| vec![#(#core_fields,)*]);
                    &FIELDS
                }

                fn root(&self) -> &#cr::CoreRoot {
                    &self.root
                }

                fn root_mut(&mut self) -> &mut #cr::CoreRoot {
                    &mut self.root
                }

                #extensions_accessors
            }

            impl #cr::CoreValue for #core_name {
                fn unmarshal(
                    cx: &mut #cr::UnmarshalContext<'_>,
                    node: #cr::NodeId,
                ) -> ::core::result::Result<Self, #cr::Error> {
                    #cr::unmarshal_core(cx, node)
                }
            }
        }
    }

    fn model_impl(&self) -> proc_macro2::TokenStream {
        let cr = self.cr();
        let name = &self.name;
        let core_name = &self.core_name;
        let core_field = &self.core_field;

        let descriptors = self.fields.iter().map(|field| {
            let field_name = &field.name;
            let key = &field.key;
            let required = field.required;
            quote_spanned! {field_name.span()=>
                #cr::FieldDescriptor {
                    key: #key,
                    required: #required,
                    sync: |model, cx, mapping| {
                        model
                            .#core_field
                            .#field_name
                            .sync(cx, &mut model.#field_name, #key, mapping)
                    },
                    present: |core| core.#field_name.present,
                }
            }
        });
        let extensions_descriptor = self.extensions_field.as_ref().map(|ext| {
            quote_spanned! {ext.span()=>
                #cr::FieldDescriptor {
                    key: "",
                    required: false,
                    sync: |model, cx, mapping| {
                        #cr::sync_extensions(
                            cx,
                            &mut model.#ext,
                            &mut model.#core_field.#ext,
                            mapping,
                        )
                    },
                    present: |_core| true,
                }
            }
        });
        let extensions_descriptor = extensions_descriptor.unwrap_or_default();

        let populate_fields = self.fields.iter().map(|field| {
            let field_name = &field.name;
            quote_spanned! {field_name.span()=>
                #field_name: #cr::HighValue::from_repr(&core.#field_name.value)?
            }
        });
        let populate_extensions = self
            .extensions_field
            .as_ref()
            .map(|ext| quote_spanned!(ext.span()=> #ext: core.#ext.clone(),))
            .unwrap_or_default();

        let sync_override = self.attrs.sync_with.as_ref().map(|path| {
            quote! {
                fn sync_changes(
                    &mut self,
                    cx: &mut #cr::SyncContext<'_>,
                    node: ::core::option::Option<#cr::NodeId>,
                    skip_required: bool,
                ) -> ::core::result::Result<#cr::NodeId, #cr::Error> {
                    #path(self, cx, node, skip_required)
                }
            }
        });
        let sync_override = sync_override.unwrap_or_default();

        quote! {
            impl #cr::Model for #name {
                type Core = #core_name;

                fn core(&self) -> &#core_name {
                    &self.#core_field
                }

                fn core_mut(&mut self) -> &mut #core_name {
                    &mut self.#core_field
                }

                fn descriptors() -> &'static [#cr::FieldDescriptor<Self>] {
                    static DESCRIPTORS: #cr::Lazy<Vec<#cr::FieldDescriptor<#name>>> =
                        #cr::Lazy::new(|| vec![#(#descriptors,)* #extensions_descriptor]);
                    &DESCRIPTORS
                }

                fn from_core(core: &#core_name) -> ::core::result::Result<Self, #cr::Error> {
                    ::core::result::Result::Ok(Self {
                        #(#populate_fields,)*
                        #populate_extensions
                        #core_field: core.clone(),
                    })
                }

                #sync_override
            }

            impl #cr::HighValue for #name {
                type Repr = #core_name;

                fn from_repr(repr: &#core_name) -> ::core::result::Result<Self, #cr::Error> {
                    <Self as #cr::Model>::from_core(repr)
                }

                fn identity(&self) -> ::core::option::Option<#cr::NodeId> {
                    #cr::Model::root_node(self)
                }

                fn sync_repr(
                    &mut self,
                    cx: &mut #cr::SyncContext<'_>,
                    repr: &mut #core_name,
                    node: ::core::option::Option<#cr::NodeId>,
                ) -> ::core::result::Result<#cr::NodeId, #cr::Error> {
                    let node = #cr::Model::sync_changes(self, cx, node, true)?;
                    *repr = #cr::Model::core(self).clone();
                    ::core::result::Result::Ok(node)
                }
            }
        }
    }

    fn generate(&self) -> proc_macro2::TokenStream {
        let core_struct = self.core_struct();
        let core_model = self.core_model_impl();
        let model = self.model_impl();
        quote! {
            #core_struct
            #core_model
            #model
        }
    }
}

pub(crate) fn impl_model(input: TokenStream) -> TokenStream {
    let input: DeriveInput = syn::parse_macro_input!(input as DeriveInput);
    match ModelImpl::new(&input) {
        Ok(model) => model.generate().into(),
        Err(err) => err.into_compile_error().into(),
    }
}
