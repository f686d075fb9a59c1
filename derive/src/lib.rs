// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derive macro for `cfgbind` records.
//!
//! `#[derive(Record)]` implements `cfgbind::domain::record::Record` for a struct
//! with named fields. Every field becomes one descriptor, except fields marked
//! `flatten` (expanded in place) and `skip` (ignored).
//!
//! # Attributes
//!
//! Fields are annotated with `#[config(...)]`:
//!
//! - `<provider> = "..."`: source annotation for the reader named `<provider>`,
//!   e.g. `env = "APP_PORT"` or `vault = "secret/app:port"`
//! - `default = "..."`: literal applied when no reader supplies a value
//! - `separator = "..."`: element and pair separator, `,` if omitted
//! - `layout = "..."`: strftime layout of a timestamp field
//! - `description = "..."`: free text; the field's doc comment if omitted
//! - `sensitive` (alias `not_logging`): redact the value in diagnostics
//! - `flatten`: expand a nested record in place
//! - `skip`: leave the field out
//!
//! # Example
//!
//! ```rust,ignore
//! use cfgbind::Record;
//!
//! #[derive(Record)]
//! struct Database {
//!     #[config(env = "DB_HOST", default = "localhost")]
//!     host: String,
//!     #[config(vault = "secret/db:password", sensitive)]
//!     password: String,
//! }
//!
//! #[derive(Record)]
//! struct Settings {
//!     #[config(flatten)]
//!     database: Database,
//!     #[config(env = "ALLOWED", separator = ";")]
//!     allowed: Vec<String>,
//! }
//! ```

mod attrs;

use attrs::FieldAttrs;
use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{ext::IdentExt, parse_macro_input, spanned::Spanned, Data, DeriveInput, Fields};

/// Implements `Record` for a struct with named fields.
#[proc_macro_derive(Record, attributes(config))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let fields = match &input.data {
        Data::Struct(data) => &data.fields,
        Data::Enum(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Record can only be derived for structs, not enums",
            ))
        }
        Data::Union(_) => {
            return Err(syn::Error::new(
                input.span(),
                "Record can only be derived for structs, not unions",
            ))
        }
    };

    let named = match fields {
        Fields::Named(named) => named.named.iter().collect::<Vec<_>>(),
        Fields::Unit => Vec::new(),
        Fields::Unnamed(_) => {
            return Err(syn::Error::new(
                fields.span(),
                "Record requires named fields",
            ))
        }
    };

    let mut bindings = Vec::new();
    let mut pushes = Vec::new();

    for field in named {
        let attrs = FieldAttrs::from_field(field)?;
        if attrs.skip {
            continue;
        }

        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let name = ident.unraw().to_string();
        bindings.push(ident.clone());

        if attrs.flatten {
            pushes.push(quote! {
                ::cfgbind::domain::record::Record::describe(
                    #ident,
                    &::cfgbind::domain::descriptor::join_path(__prefix, #name),
                    __fields,
                );
            });
            continue;
        }

        let sources = attrs.sources.iter().map(|(provider, annotation)| {
            quote! { (#provider, #annotation) }
        });
        let separator = attrs.separator.as_deref().unwrap_or(",");
        let layout = option_tokens(&attrs.layout);
        let default = option_tokens(&attrs.default);
        let description = option_tokens(&attrs.description);
        let sensitive = attrs.sensitive;

        pushes.push(quote! {
            {
                static __SPEC: ::cfgbind::domain::descriptor::FieldSpec =
                    ::cfgbind::domain::descriptor::FieldSpec {
                        name: #name,
                        sources: &[#(#sources),*],
                        separator: #separator,
                        layout: #layout,
                        default: #default,
                        description: #description,
                        sensitive: #sensitive,
                    };
                __fields.push(::cfgbind::domain::descriptor::FieldDescriptor::new(
                    &__SPEC, __prefix, #ident,
                ));
            }
        });
    }

    let destructure = if bindings.is_empty() {
        quote! { let _ = (__prefix, __fields); }
    } else {
        quote! { let Self { #(#bindings,)* .. } = self; }
    };

    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::cfgbind::domain::record::Record
            for #name #ty_generics #where_clause
        {
            fn describe<'__a>(
                &'__a mut self,
                __prefix: &str,
                __fields: &mut ::std::vec::Vec<
                    ::cfgbind::domain::descriptor::FieldDescriptor<'__a>,
                >,
            ) {
                #destructure
                #(#pushes)*
            }
        }
    })
}

fn option_tokens(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(v) => quote! { ::core::option::Option::Some(#v) },
        None => quote! { ::core::option::Option::None },
    }
}
