//! Multi-row INSERT.

use super::insert::Upsert;
use crate::context::{self, CompileContext};
use crate::error::{CompileError, Result};
use crate::field::{self, Fields};
use crate::value::SqlValue;
use crate::{Compile, Compiled};

/// An INSERT of several rows, written in `VALUES` form.
///
/// The first row fixes the column set, sorted by name. Every later row must
/// carry exactly the same fields, in any order; a mismatch is reported with
/// the row's index when the statement is compiled.
///
/// ```rust
/// use sqlc_core::{BulkInsert, Compile, Fields};
///
/// let compiled = BulkInsert::new("account")
///     .row(Fields::new().value("name", "a").value("account_number", 1))
///     .row(Fields::new().value("account_number", 2).value("name", "b"))
///     .update_duplicate()
///     .compile()
///     .unwrap();
///
/// assert_eq!(
///     compiled.sql,
///     "INSERT .account (account_number, name)\nVALUES (?,?),(?,?)\nON DUPLICATE KEY UPDATE account_number=VALUES(account_number),name=VALUES(name)"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct BulkInsert {
    table: String,
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    upsert: Option<Upsert>,
    error: Option<CompileError>,
}

impl BulkInsert {
    /// Creates a bulk INSERT into `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            table: String::from(table),
            columns: vec![],
            rows: vec![],
            upsert: None,
            error: None,
        }
    }

    /// Adds a row. Only the values are kept; [`Fields::add`] entries are
    /// inserted like plain values.
    #[must_use]
    pub fn row(mut self, fields: Fields) -> Self {
        if self.error.is_some() {
            return self;
        }
        let index = self.rows.len();
        match self.accept(index, &fields) {
            Ok(values) => self.rows.push(values),
            Err(err) => {
                tracing::debug!(table = %self.table, row = index, error = %err, "rejected bulk insert row");
                self.error = Some(err);
            }
        }
        self
    }

    /// Rewrites every column on a duplicate key.
    #[must_use]
    pub fn update_duplicate(mut self) -> Self {
        self.upsert = Some(Upsert::All);
        self
    }

    /// Rewrites only the given columns on a duplicate key.
    #[must_use]
    pub fn update_duplicate_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.upsert = Some(Upsert::only(fields));
        self
    }

    /// Number of accepted rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no row was accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn accept(&mut self, index: usize, fields: &Fields) -> Result<Vec<SqlValue>> {
        let entries = fields.sorted()?;
        if index == 0 {
            if entries.is_empty() {
                return Err(CompileError::EmptyFieldList(self.table.clone()));
            }
            self.columns = entries.iter().map(|e| String::from(e.field())).collect();
        } else if entries.len() != self.columns.len()
            || entries
                .iter()
                .zip(&self.columns)
                .any(|(entry, column)| entry.field() != column)
        {
            return Err(CompileError::RowInconsistency { row: index });
        }
        Ok(entries.iter().map(|e| e.value().clone()).collect())
    }

    fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        if let Some(err) = &self.error {
            return Err(err.clone());
        }
        if self.rows.is_empty() {
            return Err(CompileError::NoRows(self.table.clone()));
        }
        if let Some(Upsert::Only(requested)) = &self.upsert {
            field::check_upsert_fields(
                &self.table,
                self.columns.iter().map(String::as_str),
                requested,
            )?;
        }

        ctx.push_str("INSERT ");
        ctx.write_table(&self.table);
        ctx.push_str(" (");
        ctx.push_str(&self.columns.join(", "));
        ctx.push_str(")\nVALUES ");
        for (i, row) in self.rows.iter().enumerate() {
            if i > 0 {
                ctx.push(',');
            }
            ctx.push('(');
            ctx.placeholders(row.len());
            ctx.push(')');
            ctx.extend_params(row.iter().cloned());
        }
        ctx.push('\n');

        if let Some(upsert) = &self.upsert {
            ctx.push_str("ON DUPLICATE KEY UPDATE ");
            let selected = self.columns.iter().filter(|c| upsert.includes(c));
            for (i, column) in selected.enumerate() {
                if i > 0 {
                    ctx.push(',');
                }
                ctx.push_fmt(format_args!("{column}=VALUES({column})"));
            }
            ctx.push('\n');
        }
        Ok(())
    }
}

impl Compile for BulkInsert {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("bulk_insert", &self.table, |ctx| self.write(ctx))
    }
}
