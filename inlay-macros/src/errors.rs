//! Error types for derive failures

use proc_macro2::Span;
use syn::Error;

/// Derive errors, reported at the offending item
#[derive(Debug, thiserror::Error)]
pub enum InlayMacroError {
    #[error("#[derive({derive})] only supports structs with named fields")]
    NotANamedStruct { derive: &'static str },

    #[error("No primary key field found in entity '{entity_name}'.\n\nAdd #[inlay(primary_key)] to a field, e.g.\n    #[inlay(primary_key)]\n    id: i32,")]
    NoPrimaryKey { entity_name: String },

    #[error("Unsupported field type '{type_name}' for field '{field_name}'. Supported types: i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool, String, Decimal, Uuid, DateTime, serde_json::Value, Option<T>; mark embeddables with #[inlay(embedded)].")]
    UnsupportedFieldType {
        field_name: String,
        type_name: String,
    },

    #[error("Field '{field_name}' is a relation; name its target entity with #[inlay(relation = \"Target\")]")]
    MissingRelationTarget { field_name: String },

    #[error("Attribute '{attribute}' is not allowed on field '{field_name}' of embeddable '{shape_name}'")]
    NotAllowedInEmbeddable {
        shape_name: String,
        field_name: String,
        attribute: &'static str,
    },

    #[error("Attributes '{first}' and '{second}' cannot be combined on field '{field_name}'")]
    ConflictingAttributes {
        field_name: String,
        first: &'static str,
        second: &'static str,
    },
}

impl InlayMacroError {
    /// Convert to syn::Error for compilation
    pub fn into_syn(self, span: Span) -> Error {
        Error::new(span, self.to_string())
    }
}
