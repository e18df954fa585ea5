#![crate_type = "proc-macro"]

extern crate proc_macro;
mod attributes;
mod common;
mod describe;
mod errors;

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

/// Implements `inlay::schema::DescribeEntity`.
///
/// Struct attributes: `#[inlay(table = "..", name = "..")]`. Field attributes:
/// `primary_key`, `auto_increment = false`, `unique`, `lazy`, `embedded`,
/// `relation = "Target"`, `foreign_key = ".."`, `rename = ".."` and `skip`.
/// `Option<T>` fields are nullable.
#[proc_macro_derive(Entity, attributes(inlay))]
pub fn entity_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    describe::derive_entity(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

/// Implements `inlay::schema::DescribeEmbeddable`; `Vec<T>` fields marked
/// `embedded` become embedded arrays.
#[proc_macro_derive(Embeddable, attributes(inlay))]
pub fn embeddable_derive(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    describe::derive_embeddable(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}
