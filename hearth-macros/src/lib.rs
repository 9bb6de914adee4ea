//! Procedural macros for Hearth.
//!
//! `#[derive(Injectable)]` generates constructor injection for structs
//! with named fields:
//!
//! | Field type          | Attribute                 | Generated code                    |
//! |---------------------|---------------------------|-----------------------------------|
//! | `Arc<T>`            |                           | `resolver.resolve::<T>()?`        |
//! | `Arc<T>`            | `#[inject(name = "db")]`  | `resolver.resolve_named::<T>("db")?` |
//! | `Option<Arc<T>>`    | optional `name`           | `resolver.try_resolve::<T>()?`    |
//! | any `Default` type  | `#[inject(default)]`      | `Default::default()`              |
//!
//! Only `Arc<T>` fields are declared as dependencies; optional and
//! defaulted fields never fail validation.

use darling::ast::Data;
use darling::util::Ignored;
use darling::{FromDeriveInput, FromField};
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{quote, quote_spanned};
use syn::spanned::Spanned;
use syn::{DeriveInput, GenericArgument, PathArguments, Type, parse_macro_input};

#[derive(FromDeriveInput)]
#[darling(attributes(inject), supports(struct_named, struct_unit))]
struct InjectableInput {
    ident: syn::Ident,
    generics: syn::Generics,
    data: Data<Ignored, InjectField>,
}

#[derive(FromField)]
#[darling(attributes(inject))]
struct InjectField {
    ident: Option<syn::Ident>,
    ty: Type,
    #[darling(default)]
    name: Option<String>,
    #[darling(default)]
    default: bool,
}

/// How one field gets its value.
enum Wiring<'a> {
    Required(&'a Type),
    Optional(&'a Type),
    Default,
}

/// Derives `hearth::Injectable` for a struct.
#[proc_macro_derive(Injectable, attributes(inject))]
pub fn derive_injectable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.write_errors().into(),
    }
}

fn expand(input: &DeriveInput) -> darling::Result<TokenStream2> {
    let parsed = InjectableInput::from_derive_input(input)?;
    let fields = parsed
        .data
        .take_struct()
        .ok_or_else(|| darling::Error::unsupported_shape("enum"))?;

    let mut errors = darling::Error::accumulator();
    let wired: Vec<(&InjectField, Wiring<'_>)> = fields
        .iter()
        .filter_map(|field| errors.handle(wiring(field)).map(|w| (field, w)))
        .collect();
    errors.finish()?;

    let mut keys = Vec::new();
    let mut inits = Vec::new();
    for (field, wiring) in &wired {
        let ident = &field.ident;
        let span = field.ty.span();
        let name = field.name.as_deref();

        let init = match (wiring, name) {
            (Wiring::Required(inner), None) => {
                keys.push(quote_spanned!(span=> ::hearth::ServiceKey::of::<#inner>()));
                quote_spanned!(span=> resolver.resolve::<#inner>()?)
            }
            (Wiring::Required(inner), Some(name)) => {
                keys.push(quote_spanned!(span=> ::hearth::ServiceKey::named::<#inner>(#name)));
                quote_spanned!(span=> resolver.resolve_named::<#inner>(#name)?)
            }
            (Wiring::Optional(inner), None) => quote_spanned!(span=> resolver.try_resolve::<#inner>()?),
            (Wiring::Optional(inner), Some(name)) => {
                quote_spanned!(span=> resolver.try_resolve_named::<#inner>(#name)?)
            }
            (Wiring::Default, _) => quote_spanned!(span=> ::std::default::Default::default()),
        };
        inits.push(quote!(#ident: #init));
    }

    let ident = &parsed.ident;
    let (impl_generics, ty_generics, where_clause) = parsed.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::hearth::Injectable for #ident #ty_generics #where_clause {
            fn dependencies() -> ::std::vec::Vec<::hearth::ServiceKey> {
                ::std::vec![#(#keys),*]
            }

            fn inject(resolver: &dyn ::hearth::Resolver) -> ::hearth::Result<Self> {
                use ::hearth::ResolverApi as _;
                ::std::result::Result::Ok(Self { #(#inits),* })
            }
        }
    })
}

fn wiring(field: &InjectField) -> darling::Result<Wiring<'_>> {
    if field.default {
        if field.name.is_some() {
            return Err(darling::Error::custom("`default` and `name` cannot be combined").with_span(&field.ty));
        }
        return Ok(Wiring::Default);
    }
    if let Some(inner) = wrapped(&field.ty, "Arc") {
        return Ok(Wiring::Required(inner));
    }
    if let Some(inner) = wrapped(&field.ty, "Option").and_then(|opt| wrapped(opt, "Arc")) {
        return Ok(Wiring::Optional(inner));
    }
    Err(darling::Error::custom(
        "injected fields must be `Arc<T>` or `Option<Arc<T>>`; mark other fields with #[inject(default)]",
    )
    .with_span(&field.ty))
}

/// `Some(T)` if `ty` is `<wrapper><T>`, matched on the last path segment.
fn wrapped<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use syn::parse_quote;

    fn expanded(input: DeriveInput) -> String {
        expand(&input).unwrap().to_string()
    }

    #[test]
    fn required_and_named_fields() {
        let out = expanded(parse_quote! {
            struct Handler {
                logger: Arc<Logger>,
                #[inject(name = "primary")]
                pool: std::sync::Arc<Pool>,
            }
        });

        assert!(out.contains("impl :: hearth :: Injectable for Handler"));
        assert!(out.contains("resolve :: < Logger >"));
        assert!(out.contains("resolve_named :: < Pool > (\"primary\")"));
        assert!(out.contains("ServiceKey :: named :: < Pool >"));
    }

    #[test]
    fn optional_fields_are_not_dependencies() {
        let out = expanded(parse_quote! {
            struct Handler {
                metrics: Option<Arc<Metrics>>,
            }
        });

        assert!(out.contains("try_resolve :: < Metrics >"));
        assert!(!out.contains("ServiceKey :: of"));
    }

    #[test]
    fn default_fields() {
        let out = expanded(parse_quote! {
            struct Handler {
                #[inject(default)]
                retries: u32,
            }
        });
        assert!(out.contains("Default :: default ()"));
    }

    #[test]
    fn unit_struct() {
        let out = expanded(parse_quote! {
            struct Clock;
        });
        assert!(out.contains("Injectable for Clock"));
    }

    #[test]
    fn rejects_plain_field() {
        let input: DeriveInput = parse_quote! {
            struct Handler {
                retries: u32,
            }
        };
        let err = expand(&input).err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("Option<Arc<T>>"));
    }

    #[test]
    fn rejects_enums() {
        let input: DeriveInput = parse_quote! {
            enum Handler { A, B }
        };
        assert!(expand(&input).is_err());
    }

    #[test]
    fn wrapped_matches_last_segment() {
        let ty: Type = parse_quote!(std::sync::Arc<dyn Sink>);
        assert!(wrapped(&ty, "Arc").is_some());
        assert!(wrapped(&ty, "Option").is_none());
    }
}
