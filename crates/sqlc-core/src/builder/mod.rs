//! Statement builders.
//!
//! Every builder is configured through chained calls and turned into SQL text
//! plus parameters by [`Compile::compile`](crate::Compile::compile). Building
//! never fails; all validation happens when compiling.
//!
//! # Example
//!
//! ```rust
//! use sqlc_core::{Compile, Select, Where};
//!
//! let (sql, params) = Select::new("user")
//!     .fields(["id", "email"])
//!     .where_clause(Where::new().eq("email", "x"))
//!     .limit(0, 10)
//!     .compile()
//!     .unwrap()
//!     .into_parts();
//!
//! assert_eq!(sql, "SELECT id, email\nFROM .user\nWHERE email=?\nLIMIT 0,10");
//! assert_eq!(params.len(), 1);
//! ```

mod base;
mod delete;
mod insert;
mod inserts;
mod json;
mod select;
mod union;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use inserts::BulkInsert;
pub use json::{JsonSelect, JsonTable};
pub use select::Select;
pub use union::Union;
pub use update::Update;
