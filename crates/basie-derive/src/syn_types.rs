//! Type helpers for syn type analysis.

/// The single type argument of `Wrapper<T>`, if `ty` is a path ending in `wrapper`.
///
/// Matches `Vec<T>` as well as `std::vec::Vec<T>`.
fn generic_arg<'a>(ty: &'a syn::Type, wrapper: &str) -> Option<&'a syn::Type> {
    let syn::Type::Path(type_path) = ty else {
        return None;
    };
    let seg = type_path.path.segments.last()?;
    if seg.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    match args.args.first() {
        Some(syn::GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

pub fn option_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_arg(ty, "Option")
}

pub fn vec_inner(ty: &syn::Type) -> Option<&syn::Type> {
    generic_arg(ty, "Vec")
}

/// Whether `ty` is `Option<i64>`, the only accepted id type.
pub fn is_optional_i64(ty: &syn::Type) -> bool {
    let Some(syn::Type::Path(inner)) = option_inner(ty) else {
        return false;
    };
    inner.qself.is_none() && inner.path.is_ident("i64")
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    #[test]
    fn detects_wrappers() {
        let ty: syn::Type = parse_quote!(std::vec::Vec<Post>);
        assert!(vec_inner(&ty).is_some());

        let ty: syn::Type = parse_quote!(Option<String>);
        assert!(option_inner(&ty).is_some());
        assert!(vec_inner(&ty).is_none());

        let ty: syn::Type = parse_quote!(String);
        assert!(option_inner(&ty).is_none());
    }

    #[test]
    fn id_must_be_optional_i64() {
        assert!(is_optional_i64(&parse_quote!(Option<i64>)));
        assert!(!is_optional_i64(&parse_quote!(i64)));
        assert!(!is_optional_i64(&parse_quote!(Option<i32>)));
    }
}
