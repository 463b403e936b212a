//! UPDATE statement builder.

use super::base::QueryBase;
use crate::condition::Where;
use crate::context::{self, CompileContext};
use crate::error::{CompileError, Result};
use crate::field::Fields;
use crate::join::{AliasSet, JoinMode, JoinOn};
use crate::value::ToSqlValue;
use crate::{Compile, Compiled};

#[derive(Debug, Clone, PartialEq, Eq)]
struct JsonRemove {
    field: String,
    path: String,
}

/// An UPDATE statement.
///
/// ```rust
/// use sqlc_core::{Compile, Update, Where};
///
/// let compiled = Update::by_id("user", 7)
///     .value("email", "new@example.com")
///     .add("logins", 1)
///     .where_clause(Where::new().null("deleted"))
///     .compile()
///     .unwrap();
///
/// assert_eq!(
///     compiled.sql,
///     "UPDATE .user\nSET email=?, logins=logins+?\nWHERE id=7 AND deleted IS NULL"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Update {
    base: QueryBase,
    fields: Fields,
    json_remove: Option<JsonRemove>,
}

impl Update {
    /// Creates an UPDATE of `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            base: QueryBase::new(table),
            fields: Fields::new(),
            json_remove: None,
        }
    }

    /// Creates an UPDATE of the row of `table` with the given id.
    #[must_use]
    pub fn by_id(table: &str, id: u64) -> Self {
        Self::new(table).id(id)
    }

    /// Restricts the statement to the row with this id.
    #[must_use]
    pub const fn id(mut self, id: u64) -> Self {
        self.base.id = Some(id);
        self
    }

    /// Requests an alias for the base table.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.base.alias = Some(String::from(alias));
        self
    }

    /// Sets the assigned fields, replacing any previous ones.
    #[must_use]
    pub fn fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    /// Adds `field=?`.
    #[must_use]
    pub fn value<T: ToSqlValue>(mut self, field: &str, value: T) -> Self {
        self.fields = self.fields.value(field, value);
        self
    }

    /// Adds `field=field+?`.
    #[must_use]
    pub fn add<T: ToSqlValue>(mut self, field: &str, value: T) -> Self {
        self.fields = self.fields.add(field, value);
        self
    }

    /// Removes `path` from the JSON document in `field`.
    #[must_use]
    pub fn json_remove(mut self, field: &str, path: &str) -> Self {
        self.json_remove = Some(JsonRemove {
            field: String::from(field),
            path: String::from(path),
        });
        self
    }

    /// Adds `LEFT JOIN .table alias ON alias.field=<foreign>`.
    #[must_use]
    pub fn left_join(
        mut self,
        table: &str,
        alias: &str,
        field: &str,
        foreign: &str,
        on: Option<JoinOn>,
    ) -> Self {
        self.base.join(JoinMode::Left, table, alias, field, foreign, on);
        self
    }

    /// Adds `INNER JOIN .table alias ON alias.field=<foreign>`.
    #[must_use]
    pub fn inner_join(
        mut self,
        table: &str,
        alias: &str,
        field: &str,
        foreign: &str,
        on: Option<JoinOn>,
    ) -> Self {
        self.base.join(JoinMode::Inner, table, alias, field, foreign, on);
        self
    }

    /// Emits only the joins the statement references.
    #[must_use]
    pub const fn optimize_joins(mut self) -> Self {
        self.base.optimize = true;
        self
    }

    /// Sets the WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, clause: Where) -> Self {
        self.base.filter = clause;
        self
    }

    fn collect_aliases(&self, set: &mut AliasSet) {
        self.fields.collect_aliases(set);
        if let Some(remove) = &self.json_remove {
            set.apply(&remove.field);
        }
    }

    fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        let entries = self.fields.sorted()?;
        if entries.is_empty() && self.json_remove.is_none() {
            return Err(CompileError::EmptyFieldList(self.base.table.clone()));
        }
        let joins = self
            .base
            .prepare(ctx, false, &[], |set| self.collect_aliases(set))?;

        ctx.push_str("UPDATE ");
        ctx.write_table(&self.base.table);
        ctx.write_base_alias();
        ctx.push('\n');
        QueryBase::write_joins(ctx, &joins)?;

        ctx.push_str("SET ");
        for (i, entry) in entries.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            entry.write_update(ctx);
        }
        if let Some(remove) = &self.json_remove {
            if !entries.is_empty() {
                ctx.push_str(", ");
            }
            ctx.write_field(&remove.field);
            ctx.push_str("=JSON_REMOVE(");
            ctx.write_field(&remove.field);
            ctx.push_fmt(format_args!(", '{}')", remove.path));
        }
        ctx.push('\n');

        self.base.write_where(ctx, None)
    }
}

impl Compile for Update {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("update", &self.base.table, |ctx| self.write(ctx))
    }
}
