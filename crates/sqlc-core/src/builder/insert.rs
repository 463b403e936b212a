//! Single-row INSERT with optional upsert.

use crate::context::{self, CompileContext};
use crate::error::{CompileError, Result};
use crate::field::{self, Fields};
use crate::value::ToSqlValue;
use crate::{Compile, Compiled};

/// Which fields an `ON DUPLICATE KEY UPDATE` clause rewrites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Upsert {
    All,
    Only(Vec<String>),
}

impl Upsert {
    pub(crate) fn only<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::Only(
            fields
                .into_iter()
                .map(|f| String::from(f.as_ref()))
                .collect(),
        )
    }

    pub(crate) fn includes(&self, field: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(fields) => fields.iter().any(|f| f == field),
        }
    }
}

/// An INSERT of one row, written in `SET` form.
///
/// Fields are written sorted by name. With an upsert, each selected field is
/// rewritten on a duplicate key: plain values are assigned again, values
/// added with [`Fields::add`] are added to the stored value.
///
/// ```rust
/// use sqlc_core::{Compile, Fields, Insert};
///
/// let compiled = Insert::new("user")
///     .fields(Fields::new().value("email", "a@b.c").add("logins", 1))
///     .update_duplicate_fields(["logins"])
///     .compile()
///     .unwrap();
///
/// assert_eq!(
///     compiled.sql,
///     "INSERT .user\nSET email=?, logins=?\nON DUPLICATE KEY UPDATE logins=logins+?"
/// );
/// assert_eq!(compiled.params.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Insert {
    table: String,
    fields: Fields,
    upsert: Option<Upsert>,
}

impl Insert {
    /// Creates an INSERT into `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            table: String::from(table),
            fields: Fields::new(),
            upsert: None,
        }
    }

    /// Sets the inserted fields, replacing any previous ones.
    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Adds one field.
    #[must_use]
    pub fn value<T: ToSqlValue>(mut self, field: &str, value: T) -> Self {
        self.fields = self.fields.value(field, value);
        self
    }

    /// Adds one field that increments on a duplicate key.
    #[must_use]
    pub fn add<T: ToSqlValue>(mut self, field: &str, value: T) -> Self {
        self.fields = self.fields.add(field, value);
        self
    }

    /// Rewrites every inserted field on a duplicate key.
    #[must_use]
    pub fn update_duplicate(mut self) -> Self {
        self.upsert = Some(Upsert::All);
        self
    }

    /// Rewrites only the given fields on a duplicate key. Each must be one of
    /// the inserted fields, and the list must not be empty.
    #[must_use]
    pub fn update_duplicate_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.upsert = Some(Upsert::only(fields));
        self
    }

    fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        let entries = self.fields.sorted()?;
        if entries.is_empty() {
            return Err(CompileError::EmptyFieldList(self.table.clone()));
        }
        if let Some(Upsert::Only(requested)) = &self.upsert {
            field::check_upsert_fields(
                &self.table,
                entries.iter().map(|e| e.field()),
                requested,
            )?;
        }

        ctx.push_str("INSERT ");
        ctx.write_table(&self.table);
        ctx.push_str("\nSET ");
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            entry.write_assign(ctx);
        }
        ctx.push('\n');

        if let Some(upsert) = &self.upsert {
            ctx.push_str("ON DUPLICATE KEY UPDATE ");
            let selected = entries.iter().filter(|e| upsert.includes(e.field()));
            for (i, entry) in selected.enumerate() {
                if i > 0 {
                    ctx.push_str(", ");
                }
                entry.write_update(ctx);
            }
            ctx.push('\n');
        }
        Ok(())
    }
}

impl Compile for Insert {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("insert", &self.table, |ctx| self.write(ctx))
    }
}
