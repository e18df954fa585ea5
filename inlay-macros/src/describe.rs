//! Descriptor generation for `#[derive(Entity)]` and `#[derive(Embeddable)]`

use crate::attributes::{ContainerAttrs, FieldAttrs};
use crate::common::{
    extract_inner_type_from_option, extract_inner_type_from_vec, is_option, scalar_variant,
    type_name,
};
use crate::errors::InlayMacroError;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::spanned::Spanned;
use syn::{Data, DataStruct, DeriveInput, Field, Fields};

pub fn derive_entity(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let container = ContainerAttrs::parse(&input.attrs)?;
    let entity_name = container.name.unwrap_or_else(|| ident.to_string());

    let mut properties = Vec::new();
    let mut has_primary_key = false;
    for field in named_fields(input, "Entity")? {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        has_primary_key |= attrs.primary_key;
        properties.push(property(field, &attrs)?);
    }
    if !has_primary_key {
        return Err(InlayMacroError::NoPrimaryKey {
            entity_name: entity_name.clone(),
        }
        .into_syn(ident.span()));
    }

    let table = container.table.map(|table| quote!(.table(#table)));
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::inlay::schema::DescribeEntity for #ident #ty_generics #where_clause {
            const NAME: &'static str = #entity_name;

            fn entity_descriptor() -> ::inlay::schema::EntityDescriptor {
                ::inlay::schema::EntityDescriptor::builder(#entity_name)
                    #table
                    #(.property(#properties))*
                    .build()
            }
        }
    })
}

pub fn derive_embeddable(input: &DeriveInput) -> syn::Result<TokenStream> {
    let ident = &input.ident;
    let container = ContainerAttrs::parse(&input.attrs)?;
    let shape_name = container.name.unwrap_or_else(|| ident.to_string());

    let mut properties = Vec::new();
    for field in named_fields(input, "Embeddable")? {
        let attrs = FieldAttrs::parse(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let forbidden = if attrs.primary_key {
            Some("primary_key")
        } else if attrs.auto_increment.is_some() {
            Some("auto_increment")
        } else {
            None
        };
        if let Some(attribute) = forbidden {
            return Err(InlayMacroError::NotAllowedInEmbeddable {
                shape_name,
                field_name: field_name(field),
                attribute,
            }
            .into_syn(field.span()));
        }
        properties.push(property(field, &attrs)?);
    }

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();
    Ok(quote! {
        impl #impl_generics ::inlay::schema::DescribeEmbeddable for #ident #ty_generics #where_clause {
            fn embeddable_descriptor() -> ::inlay::schema::EmbeddableDescriptor {
                ::inlay::schema::EmbeddableDescriptor::builder(#shape_name)
                    #(.property(#properties))*
                    .build()
            }
        }
    })
}

fn named_fields<'a>(
    input: &'a DeriveInput,
    derive: &'static str,
) -> syn::Result<impl Iterator<Item = &'a Field>> {
    match &input.data {
        Data::Struct(DataStruct {
            fields: Fields::Named(fields),
            ..
        }) => Ok(fields.named.iter()),
        _ => Err(InlayMacroError::NotANamedStruct { derive }.into_syn(input.ident.span())),
    }
}

fn field_name(field: &Field) -> String {
    field
        .ident
        .as_ref()
        .map(|ident| ident.to_string().trim_start_matches("r#").to_string())
        .unwrap_or_default()
}

// `PropertyDescriptor` constructor chain for one field
fn property(field: &Field, attrs: &FieldAttrs) -> syn::Result<TokenStream> {
    let name = attrs.rename.clone().unwrap_or_else(|| field_name(field));
    let nullable = is_option(&field.ty);
    let ty = extract_inner_type_from_option(&field.ty);
    let span = field.ty.span();

    let mut tokens = match (&attrs.relation, attrs.embedded) {
        (Some(_), true) => {
            return Err(InlayMacroError::ConflictingAttributes {
                field_name: name,
                first: "embedded",
                second: "relation",
            }
            .into_syn(span))
        }
        (None, true) => match extract_inner_type_from_vec(ty) {
            Some(element) => quote! {
                ::inlay::schema::PropertyDescriptor::embedded_array(
                    #name,
                    <#element as ::inlay::schema::DescribeEmbeddable>::embeddable_descriptor(),
                )
            },
            None => quote! {
                ::inlay::schema::PropertyDescriptor::embedded(
                    #name,
                    <#ty as ::inlay::schema::DescribeEmbeddable>::embeddable_descriptor(),
                )
            },
        },
        (Some(target), false) => {
            let target = target.clone().ok_or_else(|| {
                InlayMacroError::MissingRelationTarget {
                    field_name: name.clone(),
                }
                .into_syn(span)
            })?;
            let foreign_key = attrs
                .foreign_key
                .as_ref()
                .map(|column| quote!(.foreign_key(#column)));
            quote!(::inlay::schema::PropertyDescriptor::relation(#name, #target) #foreign_key)
        }
        (None, false) => {
            if attrs.foreign_key.is_some() {
                return Err(
                    InlayMacroError::MissingRelationTarget { field_name: name }.into_syn(span),
                );
            }
            let variant = scalar_variant(ty).ok_or_else(|| {
                InlayMacroError::UnsupportedFieldType {
                    field_name: name.clone(),
                    type_name: type_name(ty),
                }
                .into_syn(span)
            })?;
            let variant = format_ident!("{}", variant);
            quote! {
                ::inlay::schema::PropertyDescriptor::scalar(
                    #name,
                    ::inlay::schema::ScalarType::#variant,
                )
            }
        }
    };

    if attrs.primary_key {
        tokens.extend(quote!(.primary_key()));
    }
    if let Some(enabled) = attrs.auto_increment {
        tokens.extend(quote!(.auto_increment(#enabled)));
    }
    if nullable {
        tokens.extend(quote!(.nullable()));
    }
    if attrs.unique {
        tokens.extend(quote!(.unique()));
    }
    if attrs.lazy {
        tokens.extend(quote!(.lazy()));
    }
    Ok(tokens)
}
