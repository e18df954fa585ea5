//! `#[inlay(...)]` attribute parsing

use syn::{Attribute, LitBool, LitStr, Token};

/// Struct-level attributes
#[derive(Debug, Default)]
pub struct ContainerAttrs {
    pub table: Option<String>,
    pub name: Option<String>,
}

impl ContainerAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("inlay")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    parsed.table = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("name") {
                    parsed.name = Some(meta.value()?.parse::<LitStr>()?.value());
                } else {
                    return Err(meta.error("unknown #[inlay] struct attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}

/// Field-level attributes
#[derive(Debug, Default)]
pub struct FieldAttrs {
    pub primary_key: bool,
    pub auto_increment: Option<bool>,
    pub unique: bool,
    pub lazy: bool,
    pub embedded: bool,
    /// `Some(None)` for a bare `relation` without a target
    pub relation: Option<Option<String>>,
    pub foreign_key: Option<String>,
    pub rename: Option<String>,
    pub skip: bool,
}

impl FieldAttrs {
    pub fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut parsed = Self::default();
        for attr in attrs.iter().filter(|attr| attr.path().is_ident("inlay")) {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("primary_key") {
                    parsed.primary_key = true;
                } else if meta.path.is_ident("auto_increment") {
                    let enabled = if meta.input.peek(Token![=]) {
                        meta.value()?.parse::<LitBool>()?.value
                    } else {
                        true
                    };
                    parsed.auto_increment = Some(enabled);
                } else if meta.path.is_ident("unique") {
                    parsed.unique = true;
                } else if meta.path.is_ident("lazy") {
                    parsed.lazy = true;
                } else if meta.path.is_ident("embedded") {
                    parsed.embedded = true;
                } else if meta.path.is_ident("relation") {
                    let target = if meta.input.peek(Token![=]) {
                        Some(meta.value()?.parse::<LitStr>()?.value())
                    } else {
                        None
                    };
                    parsed.relation = Some(target);
                } else if meta.path.is_ident("foreign_key") {
                    parsed.foreign_key = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("rename") {
                    parsed.rename = Some(meta.value()?.parse::<LitStr>()?.value());
                } else if meta.path.is_ident("skip") {
                    parsed.skip = true;
                } else {
                    return Err(meta.error("unknown #[inlay] field attribute"));
                }
                Ok(())
            })?;
        }
        Ok(parsed)
    }
}
