//! Attribute parsing for the Entity derive macro.
//!
//! Handles struct-level and field-level `#[orm(...)]` attributes.

use syn::parse::{Parse, ParseStream};
use syn::{Attribute, Result};

/// Struct-level `#[orm(table = "...", name = "...")]`.
#[derive(Default)]
pub(crate) struct EntityAttr {
    pub table: Option<String>,
    pub name: Option<String>,
}

impl Parse for EntityAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = EntityAttr::default();
        while !input.is_empty() {
            let key: syn::Ident = input.parse()?;
            let _: syn::Token![=] = input.parse()?;
            let value: syn::LitStr = input.parse()?;

            if key == "table" {
                attr.table = Some(value.value());
            } else if key == "name" {
                attr.name = Some(value.value());
            } else {
                return Err(syn::Error::new(
                    key.span(),
                    "unknown entity attribute; expected `table` or `name`",
                ));
            }

            if !input.is_empty() {
                let _: syn::Token![,] = input.parse()?;
            }
        }
        Ok(attr)
    }
}

/// `has_many(Type, foreign_key = "...")`
pub(crate) struct HasMany {
    pub model: syn::Path,
    pub foreign_key: Option<String>,
}

/// Field-level `#[orm(...)]`.
#[derive(Default)]
pub(crate) struct FieldAttr {
    pub is_id: bool,
    pub skip: bool,
    pub column: Option<String>,
    pub has_many: Option<HasMany>,
}

impl FieldAttr {
    fn merge(&mut self, other: FieldAttr) {
        self.is_id |= other.is_id;
        self.skip |= other.skip;
        if other.column.is_some() {
            self.column = other.column;
        }
        if other.has_many.is_some() {
            self.has_many = other.has_many;
        }
    }
}

fn parse_has_many(input: ParseStream) -> Result<HasMany> {
    let content;
    syn::parenthesized!(content in input);

    let model: syn::Path = content.parse()?;
    let mut foreign_key = None;

    while content.peek(syn::Token![,]) {
        let _: syn::Token![,] = content.parse()?;
        if content.is_empty() {
            break;
        }
        let key: syn::Ident = content.parse()?;
        let _: syn::Token![=] = content.parse()?;
        let value: syn::LitStr = content.parse()?;
        if key == "foreign_key" {
            foreign_key = Some(value.value());
        } else {
            return Err(syn::Error::new(
                key.span(),
                "unknown has_many option; expected `foreign_key`",
            ));
        }
    }

    Ok(HasMany { model, foreign_key })
}

impl Parse for FieldAttr {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut attr = FieldAttr::default();
        while !input.is_empty() {
            let ident: syn::Ident = input.parse()?;
            match ident.to_string().as_str() {
                "id" => attr.is_id = true,
                "skip" => attr.skip = true,
                "has_many" => attr.has_many = Some(parse_has_many(input)?),
                "column" => {
                    let _: syn::Token![=] = input.parse()?;
                    let value: syn::LitStr = input.parse()?;
                    attr.column = Some(value.value());
                }
                _ => {
                    return Err(syn::Error::new(
                        ident.span(),
                        "unknown field attribute; expected `id`, `column`, `has_many` or `skip`",
                    ));
                }
            }

            if !input.is_empty() {
                let _: syn::Token![,] = input.parse()?;
            }
        }
        Ok(attr)
    }
}

fn orm_attrs(attrs: &[Attribute]) -> impl Iterator<Item = &Attribute> {
    attrs.iter().filter(|attr| attr.path().is_ident("orm"))
}

pub(crate) fn entity_attr(attrs: &[Attribute]) -> Result<EntityAttr> {
    let mut out = EntityAttr::default();
    for attr in orm_attrs(attrs) {
        let parsed: EntityAttr = attr.parse_args()?;
        if parsed.table.is_some() {
            out.table = parsed.table;
        }
        if parsed.name.is_some() {
            out.name = parsed.name;
        }
    }
    Ok(out)
}

pub(crate) fn field_attr(field: &syn::Field) -> Result<FieldAttr> {
    let mut out = FieldAttr::default();
    for attr in orm_attrs(&field.attrs) {
        out.merge(attr.parse_args()?);
    }
    Ok(out)
}
