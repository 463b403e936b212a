//! # sqlc-core
//!
//! A composable MySQL statement compiler.
//!
//! Statements are described with builder values (table, fields, joins,
//! conditions, grouping, ordering, pagination, locking) and compiled into SQL
//! text plus an ordered parameter list. Nothing is executed here; the output
//! is meant for a driver's parameterized query call.
//!
//! This crate provides:
//! - SELECT, INSERT, bulk INSERT, UPDATE, DELETE and UNION builders
//! - Table alias assignment and pruning of unreferenced joins
//! - Validation of repeated conditions on the same field
//! - Correlated JSON sub-selects and `JSON_TABLE` sources
//!
//! ## Building a statement
//!
//! ```rust
//! use sqlc_core::{Compile, Select, Where};
//!
//! let compiled = Select::new("user")
//!     .fields(["id", "c.timeout"])
//!     .left_join("client", "c", "id", "client_id", None)
//!     .where_clause(Where::new().eq("email", "x"))
//!     .compile()
//!     .unwrap();
//!
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT u.id, c.timeout\nFROM .user u\nLEFT JOIN .client c ON c.id=u.client_id\nWHERE u.email=?"
//! );
//! ```
//!
//! ## Parameters
//!
//! Values never reach the SQL text. Each `?` has exactly one parameter, in
//! order:
//!
//! ```rust
//! use sqlc_core::{Compile, Select, SqlValue, Where};
//!
//! let user_input = "'; DROP TABLE users; --";
//! let (sql, params) = Select::new("user")
//!     .fields(["id"])
//!     .where_clause(Where::new().eq("name", user_input))
//!     .compile()
//!     .unwrap()
//!     .into_parts();
//!
//! assert_eq!(sql, "SELECT id\nFROM .user\nWHERE name=?");
//! assert_eq!(params, vec![SqlValue::Text(String::from(user_input))]);
//! ```

pub mod builder;
pub mod condition;
pub mod config;
pub mod context;
pub mod error;
pub mod field;
pub mod join;
pub mod value;

pub use builder::{BulkInsert, Delete, Insert, JsonSelect, JsonTable, Select, Union, Update};
pub use condition::{Condition, ConditionValue, Operator, Where};
pub use config::{CompilerConfig, ConfigError};
pub use error::{CompileError, Result};
pub use field::{FieldEntry, FieldOp, Fields, OrderField, SelectField};
pub use join::{Join, JoinMode, JoinOn, OnTarget};
pub use value::{SqlValue, ToSqlValue};

/// A compiled statement: SQL text and the values for its placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct Compiled {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// One value per placeholder, in order.
    pub params: Vec<SqlValue>,
}

impl Compiled {
    /// Splits into SQL text and parameters.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<SqlValue>) {
        (self.sql, self.params)
    }
}

/// Statements that compile to SQL.
pub trait Compile {
    /// Compiles the statement.
    ///
    /// Compiling does not modify the statement, and compiling the same
    /// statement again gives the same output.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] when the statement is inconsistent. No SQL
    /// is produced in that case.
    fn compile(&self) -> Result<Compiled>;
}

/// Renders a statement with its parameters substituted, for logs.
///
/// The output is not valid SQL: values are written raw, unquoted and
/// unescaped. If the statement does not compile, the error text is returned.
pub fn sql_debug<C: Compile + ?Sized>(statement: &C) -> String {
    match statement.compile() {
        Ok(compiled) => substitute(&compiled),
        Err(err) => err.to_string(),
    }
}

fn substitute(compiled: &Compiled) -> String {
    let mut params = compiled.params.iter().peekable();
    let mut out = String::with_capacity(compiled.sql.len());
    for c in compiled.sql.chars() {
        match params.next_if(|_| c == '?') {
            Some(value) => out.push_str(&value.to_string()),
            None => out.push(c),
        }
    }
    String::from(out.trim())
}
