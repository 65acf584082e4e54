//! Convenient imports for typical `basie` usage.
//!
//! ```ignore
//! use basie::prelude::*;
//! ```

pub use crate::{
    BasieConfig, Criteria, Entity, Executor, FieldType, Filter, FromInstance, Instance,
    IntoInstance, Model, OrmError, OrmResult, Row, Session, State, Value, criteria,
};
