//! Derive macros for basie
//!
//! Provides `#[derive(Entity)]`.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod attrs;
mod entity;
mod syn_types;

/// Derive `Entity`, `FromInstance` and `IntoInstance` for a struct.
///
/// # Example
///
/// ```ignore
/// use basie::Entity;
///
/// #[derive(Entity)]
/// #[orm(table = "users")]
/// struct User {
///     #[orm(id)]
///     id: Option<i64>,
///     name: String,
///     #[orm(column = "age_years")]
///     age: i64,
///     #[orm(has_many(Post, foreign_key = "user_id"))]
///     posts: Vec<Post>,
/// }
/// ```
///
/// # Struct attributes
///
/// - `#[orm(table = "name")]` - Table name (defaults to the snake_case type name)
/// - `#[orm(name = "Name")]` - Registry name (defaults to the type name)
///
/// # Field attributes
///
/// - `#[orm(id)]` - The primary key; the field must be `Option<i64>`
/// - `#[orm(column = "name")]` - Map field to a different column name
/// - `#[orm(has_many(Type, foreign_key = "col"))]` - A `Vec<Type>` loaded from the rows of
///   `Type` whose `col` equals this id (`foreign_key` defaults to `<entity>_id`)
/// - `#[orm(skip)]` - Not persisted; filled with `Default::default()` on load
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
