//! # basie
//!
//! A small object-relational mapper for PostgreSQL.
//!
//! ## Features
//!
//! - **Declared entities**: `#[derive(Entity)]` (or explicit [`Registry`] calls) records which
//!   properties are columns and which are one-to-many relationships
//! - **Live instances**: every loaded row becomes an [`Instance`] with identity and a
//!   `transient → persisted → poisoned` lifecycle
//! - **Eager relationships**: child collections are loaded recursively, with cycle and depth
//!   guards
//! - **Parameterized queries**: equality maps and literal `?` predicates always bind values
//! - **Bring your own connection**: anything implementing [`Executor`] runs the SQL
//!   (`tokio-postgres` clients and transactions, pooled `deadpool-postgres` clients)
//!
//! ## Example
//!
//! ```ignore
//! use basie::prelude::*;
//!
//! #[derive(Debug, Entity)]
//! #[orm(table = "users")]
//! struct User {
//!     #[orm(id)]
//!     id: Option<i64>,
//!     name: String,
//!     age: i64,
//!     #[orm(has_many(Post, foreign_key = "user_id"))]
//!     posts: Vec<Post>,
//! }
//!
//! #[derive(Debug, Entity)]
//! #[orm(table = "posts")]
//! struct Post {
//!     #[orm(id)]
//!     id: Option<i64>,
//!     title: String,
//!     user_id: i64,
//! }
//!
//! let mut ann = User { id: None, name: "Ann".into(), age: 30, posts: vec![] }.to_instance()?;
//! ann.save(&client).await?;
//!
//! let found = User::find_by(&client, &criteria! { "name" => "Ann" }).await?;
//! let like = User::filter(&client, ("name LIKE ?", vec!["%nn%"])).await?;
//!
//! ann.destroy(&client).await?;
//! assert!(ann.is_poisoned());
//! ```

extern crate self as basie;

pub mod client;
pub mod config;
pub mod criteria;
pub mod entity;
pub mod error;
pub mod ident;
pub mod instance;
pub mod materialize;
pub mod meta;
pub mod model;
pub mod prelude;
pub mod row;
pub mod session;
pub mod statement;
pub mod value;

pub use client::Executor;
pub use config::{BasieConfig, SqlLogLevel};
pub use criteria::{Criteria, Filter};
pub use entity::{Entity, FromInstance, IntoInstance};
pub use error::{ExecutionError, OrmError, OrmResult};
pub use instance::{Instance, State};
pub use meta::{
    ChildMeta, Declaration, EntityMeta, EntityRegistration, FieldMeta, ForeignRef, Registry,
    register_all,
};
pub use model::Model;
pub use row::Row;
pub use session::Session;
pub use statement::Statement;
pub use value::{CustomType, FieldType, FromValue, ToValue, Value};

// Re-export inventory for use by derive macros
pub use inventory;

#[cfg(feature = "derive")]
pub use basie_derive::Entity;
