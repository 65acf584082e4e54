//! Entity derive macro implementation

use crate::attrs::{FieldAttr, entity_attr, field_attr};
use crate::syn_types::{is_optional_i64, vec_inner};
use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Result};

enum Binding<'a> {
    Id { column: String },
    Column { column: String, ty: &'a syn::Type },
    HasMany { model: syn::Path, foreign_key: Option<String> },
    Skip,
}

struct FieldPlan<'a> {
    ident: &'a syn::Ident,
    binding: Binding<'a>,
}

fn plan_field<'a>(field: &'a syn::Field, ident: &'a syn::Ident) -> Result<FieldPlan<'a>> {
    let FieldAttr {
        is_id,
        skip,
        column,
        has_many,
    } = field_attr(field)?;

    let exclusive = [is_id, skip, has_many.is_some()]
        .iter()
        .filter(|set| **set)
        .count();
    if exclusive > 1 {
        return Err(syn::Error::new_spanned(
            field,
            "`id`, `skip` and `has_many` are mutually exclusive",
        ));
    }
    let column = column.unwrap_or_else(|| ident.to_string());

    let binding = if is_id {
        if !is_optional_i64(&field.ty) {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "#[orm(id)] field must be Option<i64>",
            ));
        }
        Binding::Id { column }
    } else if skip {
        Binding::Skip
    } else if let Some(rel) = has_many {
        if vec_inner(&field.ty).is_none() {
            return Err(syn::Error::new_spanned(
                &field.ty,
                "#[orm(has_many(..))] field must be a Vec",
            ));
        }
        Binding::HasMany {
            model: rel.model,
            foreign_key: rel.foreign_key,
        }
    } else {
        Binding::Column {
            column,
            ty: &field.ty,
        }
    };

    Ok(FieldPlan { ident, binding })
}

pub fn expand(input: DeriveInput) -> Result<TokenStream> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Entity cannot be derived for generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Entity can only be derived for structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Entity can only be derived for structs",
            ));
        }
    };

    let attr = entity_attr(&input.attrs)?;
    let entity_name = attr.name.unwrap_or_else(|| name.to_string());

    let mut plans = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        plans.push(plan_field(field, ident)?);
    }

    let ids: Vec<&FieldPlan> = plans
        .iter()
        .filter(|p| matches!(p.binding, Binding::Id { .. }))
        .collect();
    if ids.len() > 1 {
        return Err(syn::Error::new_spanned(
            ids[1].ident,
            "only one field may be marked #[orm(id)]",
        ));
    }

    let mut declare = Vec::new();
    if let Some(table) = &attr.table {
        declare.push(quote! { decl.table(#table); });
    }

    let mut reads = Vec::new();
    let mut writes = Vec::new();

    for plan in &plans {
        let ident = plan.ident;
        let field_name = ident.to_string();
        match &plan.binding {
            Binding::Id { column } => {
                declare.push(quote! { decl.primary_key(#column); });
                reads.push(quote! { #ident: instance.id()? });
            }
            Binding::Column { column, ty } => {
                declare.push(quote! {
                    decl.field(#column, #field_name, <#ty as basie::FromValue>::field_type());
                });
                reads.push(quote! { #ident: instance.get_as::<#ty>(#field_name)? });
                writes.push(quote! {
                    instance.set(#field_name, basie::ToValue::to_value(&self.#ident))?;
                });
            }
            Binding::HasMany { model, foreign_key } => {
                let fk = match foreign_key {
                    Some(fk) => quote! { Some(#fk) },
                    None => quote! { None },
                };
                declare.push(quote! {
                    decl.has_many(#field_name, basie::ForeignRef::of::<#model>(), #fk);
                });
                reads.push(quote! {
                    #ident: <#model as basie::FromInstance>::from_instances(
                        instance.children(#field_name)?,
                    )?
                });
            }
            Binding::Skip => {
                reads.push(quote! { #ident: ::core::default::Default::default() });
            }
        }
    }

    Ok(quote! {
        impl basie::Entity for #name {
            const NAME: &'static str = #entity_name;

            #[allow(unused_variables)]
            fn declare(decl: &mut basie::Declaration) {
                #(#declare)*
            }
        }

        impl basie::FromInstance for #name {
            fn from_instance(instance: &basie::Instance) -> basie::OrmResult<Self> {
                Ok(Self {
                    #(#reads),*
                })
            }
        }

        impl basie::IntoInstance for #name {
            #[allow(unused_variables)]
            fn write_to(&self, instance: &mut basie::Instance) -> basie::OrmResult<()> {
                #(#writes)*
                Ok(())
            }
        }

        basie::inventory::submit! {
            basie::EntityRegistration {
                name: #entity_name,
                register: <#name as basie::Entity>::metadata,
            }
        }
    })
}
