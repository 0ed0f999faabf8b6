//! AttributeKeys derive macro implementation

use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{GenericArgument, PathArguments, Type};

use crate::parse::{parse_attribute_keys, AttributeFieldArgs, AttributeKeysArgs};

/// Extract `T` from `AttributeKey<T>`
fn extract_key_type(ty: &Type) -> Option<&Type> {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "AttributeKey" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    if let Some(GenericArgument::Type(inner)) = args.args.first() {
                        return Some(inner);
                    }
                }
            }
        }
    }
    None
}

/// Turn `"CAMERA | LIGHT"` into `SceneObjectInterface::CAMERA | SceneObjectInterface::LIGHT`
fn interface_tokens(field: &AttributeFieldArgs) -> syn::Result<TokenStream> {
    let Some(spec) = &field.interface else {
        return Ok(quote! { ::rdl2_core::SceneObjectInterface::GENERIC });
    };

    let mut parts = Vec::new();
    for name in spec.split('|').map(str::trim).filter(|s| !s.is_empty()) {
        let ident = syn::parse_str::<syn::Ident>(name).map_err(|_| {
            syn::Error::new_spanned(&field.ty, format!("invalid interface name '{}'", name))
        })?;
        parts.push(quote! { ::rdl2_core::SceneObjectInterface::#ident });
    }

    if parts.is_empty() {
        return Err(syn::Error::new_spanned(&field.ty, "empty interface list"));
    }
    Ok(quote! { #(#parts)|* })
}

/// Generate the AttributeKeys implementation
pub fn derive_attribute_keys(input: syn::DeriveInput) -> TokenStream {
    match parse_attribute_keys(&input) {
        Ok(args) => generate_impl(args).unwrap_or_else(|e| e.to_compile_error()),
        Err(e) => e.write_errors(),
    }
}

fn generate_impl(args: AttributeKeysArgs) -> syn::Result<TokenStream> {
    let struct_name = &args.ident;

    let fields = match args.data {
        darling::ast::Data::Struct(fields) => fields.fields,
        _ => {
            return Err(syn::Error::new_spanned(
                &args.ident,
                "AttributeKeys can only be derived for structs",
            ))
        }
    };

    let mut declarations = Vec::with_capacity(fields.len());
    let mut lookups = Vec::with_capacity(fields.len());
    let mut idents = Vec::with_capacity(fields.len());

    for field in &fields {
        let ident = field
            .ident
            .as_ref()
            .ok_or_else(|| syn::Error::new_spanned(&field.ty, "expected a named field"))?;
        let value_ty = extract_key_type(&field.ty).ok_or_else(|| {
            syn::Error::new_spanned(&field.ty, "AttributeKeys fields must be AttributeKey<T>")
        })?;

        declarations.push(generate_declaration(field, ident, value_ty)?);

        let name = field.attribute_name();
        lookups.push(quote! {
            #ident: class.get_attribute_key::<#value_ty>(#name)?
        });
        idents.push(ident);
    }

    let doc_declare = format!("Declare every attribute of `{}` on a scene class", struct_name);
    let doc_lookup = format!("Look up the keys of `{}` on an already declared class", struct_name);

    Ok(quote! {
        impl #struct_name {
            #[doc = #doc_declare]
            pub fn declare(class: &mut ::rdl2_core::SceneClass) -> ::rdl2_core::RdlResult<Self> {
                #(#declarations)*
                Ok(Self { #(#idents),* })
            }

            #[doc = #doc_lookup]
            pub fn lookup(class: &::rdl2_core::SceneClass) -> ::rdl2_core::RdlResult<Self> {
                Ok(Self {
                    #(#lookups),*
                })
            }
        }
    })
}

fn generate_declaration(
    field: &AttributeFieldArgs,
    ident: &syn::Ident,
    value_ty: &Type,
) -> syn::Result<TokenStream> {
    let name = field.attribute_name();

    let default = match &field.default {
        Some(expr) => {
            let expr = syn::parse_str::<syn::Expr>(expr).map_err(|e| {
                syn::Error::new_spanned(&field.ty, format!("invalid default for '{}': {}", name, e))
            })?;
            match &expr {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(_),
                    ..
                }) => quote! { ::std::string::String::from(#expr) },
                _ => quote! { { let value: #value_ty = #expr; value } },
            }
        }
        None => quote! { <#value_ty as ::std::default::Default>::default() },
    };

    let mut flag_parts = Vec::new();
    let flag_names = [
        (field.bindable, "BINDABLE"),
        (field.blurrable, "BLURRABLE"),
        (field.enumerable, "ENUMERABLE"),
        (field.filename, "FILENAME"),
        (field.skip_geom_reload, "CAN_SKIP_GEOM_RELOAD"),
    ];
    for (enabled, flag) in flag_names {
        if enabled {
            let flag = format_ident!("{}", flag);
            flag_parts.push(quote! { ::rdl2_core::AttributeFlags::#flag });
        }
    }
    let flags = if flag_parts.is_empty() {
        quote! { ::rdl2_core::AttributeFlags::empty() }
    } else {
        quote! { #(#flag_parts)|* }
    };

    let interface = interface_tokens(field)?;
    let aliases = &field.alias;

    let comment = field.comment.iter().map(|comment| {
        quote! { class.set_metadata(#ident, "comment", #comment); }
    });
    let metadata = field.metadata.iter().map(|meta| {
        let (key, value) = (&meta.key, &meta.value);
        quote! { class.set_metadata(#ident, #key, #value); }
    });
    let enum_values = field.enum_value.iter().map(|ev| {
        let (value, description) = (ev.value, &ev.description);
        quote! { class.set_enum_value(#ident, #value, #description)?; }
    });
    let group = field.group.iter().map(|group| {
        quote! { class.set_group(#group, #ident); }
    });

    Ok(quote! {
        let #ident = class.declare_attribute_with::<#value_ty>(
            #name,
            #default,
            #flags,
            #interface,
            &[#(#aliases),*],
        )?;
        #(#comment)*
        #(#metadata)*
        #(#enum_values)*
        #(#group)*
    })
}
