// SPDX-License-Identifier: MIT OR Apache-2.0

//! Parsing of `#[config(...)]` field attributes.

use syn::{
    punctuated::Punctuated, spanned::Spanned, Attribute, Expr, ExprLit, Field, Lit, Meta, Token,
};

/// Keys with a meaning of their own; every other key names a provider.
const RESERVED: &[&str] = &[
    "default",
    "description",
    "flatten",
    "layout",
    "not_logging",
    "sensitive",
    "separator",
    "skip",
];

/// Everything declared on one field.
#[derive(Debug, Default)]
pub struct FieldAttrs {
    /// `(provider, annotation)` pairs in declaration order
    pub sources: Vec<(String, String)>,
    pub separator: Option<String>,
    pub layout: Option<String>,
    pub default: Option<String>,
    pub description: Option<String>,
    pub sensitive: bool,
    pub flatten: bool,
    pub skip: bool,
}

impl FieldAttrs {
    /// Collects the `#[config]` attributes and doc comments of `field`.
    pub fn from_field(field: &Field) -> syn::Result<Self> {
        let mut attrs = FieldAttrs::default();
        let mut doc = Vec::new();

        for attr in &field.attrs {
            if attr.path().is_ident("doc") {
                if let Some(line) = doc_line(attr) {
                    doc.push(line);
                }
            } else if attr.path().is_ident("config") {
                attrs.parse_attr(attr)?;
            }
        }

        if attrs.description.is_none() && !doc.is_empty() {
            attrs.description = Some(doc.join(" "));
        }

        if attrs.flatten {
            let conflicting = !attrs.sources.is_empty()
                || attrs.separator.is_some()
                || attrs.layout.is_some()
                || attrs.default.is_some()
                || attrs.sensitive;
            if conflicting {
                return Err(syn::Error::new(
                    field.span(),
                    "`flatten` cannot be combined with source or value attributes",
                ));
            }
        }

        Ok(attrs)
    }

    fn parse_attr(&mut self, attr: &Attribute) -> syn::Result<()> {
        let metas = attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;

        for meta in metas {
            match meta {
                Meta::Path(path) => {
                    let ident = path
                        .get_ident()
                        .ok_or_else(|| syn::Error::new(path.span(), "expected identifier"))?
                        .to_string();
                    match ident.as_str() {
                        "sensitive" | "not_logging" => self.sensitive = true,
                        "flatten" => self.flatten = true,
                        "skip" => self.skip = true,
                        _ => {
                            return Err(syn::Error::new(
                                path.span(),
                                format!("unknown flag: {ident}"),
                            ))
                        }
                    }
                }
                Meta::NameValue(nv) => {
                    let ident = nv
                        .path
                        .get_ident()
                        .ok_or_else(|| syn::Error::new(nv.path.span(), "expected identifier"))?
                        .to_string();

                    let value = match &nv.value {
                        Expr::Lit(ExprLit {
                            lit: Lit::Str(s), ..
                        }) => s.value(),
                        _ => {
                            return Err(syn::Error::new(nv.value.span(), "expected string literal"))
                        }
                    };

                    let slot = match ident.as_str() {
                        "separator" => {
                            if value.is_empty() {
                                return Err(syn::Error::new(
                                    nv.value.span(),
                                    "separator must not be empty",
                                ));
                            }
                            &mut self.separator
                        }
                        "layout" => &mut self.layout,
                        "default" => &mut self.default,
                        "description" => &mut self.description,
                        name if RESERVED.contains(&name) => {
                            return Err(syn::Error::new(
                                nv.path.span(),
                                format!("`{name}` does not take a value"),
                            ))
                        }
                        provider => {
                            if self.sources.iter().any(|(p, _)| p == provider) {
                                return Err(syn::Error::new(
                                    nv.path.span(),
                                    format!("duplicate source: {provider}"),
                                ));
                            }
                            self.sources.push((provider.to_string(), value));
                            continue;
                        }
                    };

                    if slot.is_some() {
                        return Err(syn::Error::new(
                            nv.path.span(),
                            format!("duplicate attribute: {ident}"),
                        ));
                    }
                    *slot = Some(value);
                }
                Meta::List(list) => {
                    return Err(syn::Error::new(list.span(), "expected name = value or flag"))
                }
            }
        }

        Ok(())
    }
}

fn doc_line(attr: &Attribute) -> Option<String> {
    match &attr.meta {
        Meta::NameValue(nv) => match &nv.value {
            Expr::Lit(ExprLit {
                lit: Lit::Str(s), ..
            }) => {
                let line = s.value().trim().to_string();
                (!line.is_empty()).then_some(line)
            }
            _ => None,
        },
        _ => None,
    }
}
