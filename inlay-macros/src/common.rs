// Common type inspection shared by both derives
pub fn is_option(ty: &syn::Type) -> bool {
    last_segment(ty).is_some_and(|segment| segment.ident == "Option")
}

/// Extract the inner type from Option<T>, or return the original type if not an Option
pub fn extract_inner_type_from_option(ty: &syn::Type) -> &syn::Type {
    generic_argument(ty, "Option").unwrap_or(ty)
}

/// The element type of Vec<T>
pub fn extract_inner_type_from_vec(ty: &syn::Type) -> Option<&syn::Type> {
    generic_argument(ty, "Vec")
}

fn last_segment(ty: &syn::Type) -> Option<&syn::PathSegment> {
    match ty {
        syn::Type::Path(type_path) => type_path.path.segments.last(),
        _ => None,
    }
}

fn generic_argument<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let segment = last_segment(ty)?;
    if segment.ident != wrapper {
        return None;
    }
    match &segment.arguments {
        syn::PathArguments::AngleBracketed(args) => match args.args.first() {
            Some(syn::GenericArgument::Type(inner)) => Some(inner),
            _ => None,
        },
        _ => None,
    }
}

/// `::inlay::schema::ScalarType` variant name for a Rust scalar type
pub fn scalar_variant(ty: &syn::Type) -> Option<&'static str> {
    let segment = last_segment(ty)?;
    let variant = match segment.ident.to_string().as_str() {
        "i8" | "i16" | "i32" | "u8" | "u16" => "Integer",
        "i64" | "u32" | "u64" => "BigInteger",
        "String" => "Text",
        "bool" => "Boolean",
        "f32" | "f64" => "Double",
        "Decimal" => "Decimal",
        "Uuid" => "Uuid",
        "DateTime" | "DateTimeWithTimeZone" => "DateTime",
        "Value" | "Json" => "Json",
        _ => return None,
    };
    Some(variant)
}

/// Rendered type for error messages
pub fn type_name(ty: &syn::Type) -> String {
    quote::quote!(#ty).to_string().replace(' ', "")
}
