//! DELETE statement builder.

use super::base::QueryBase;
use crate::condition::Where;
use crate::context::{self, CompileContext};
use crate::error::Result;
use crate::join::{JoinMode, JoinOn};
use crate::{Compile, Compiled};

/// A DELETE statement.
///
/// With joins the base table is aliased and named before `FROM`, so only
/// its rows are deleted:
///
/// ```rust
/// use sqlc_core::{Compile, Delete, Where};
///
/// let compiled = Delete::new("session")
///     .left_join("user", "u", "id", "user_id", None)
///     .where_clause(Where::new().null("u.id"))
///     .compile()
///     .unwrap();
///
/// assert_eq!(
///     compiled.sql,
///     "DELETE s FROM .session s\nLEFT JOIN .user u ON u.id=s.user_id\nWHERE u.id IS NULL"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Delete {
    base: QueryBase,
}

impl Delete {
    /// Creates a DELETE from `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            base: QueryBase::new(table),
        }
    }

    /// Creates a DELETE of the row of `table` with the given id.
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

    fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        let joins = self.base.prepare(ctx, false, &[], |_| {})?;

        ctx.push_str("DELETE ");
        if ctx.use_alias() {
            let alias = String::from(ctx.base_alias());
            ctx.push_str(&alias);
            ctx.push(' ');
        }
        ctx.push_str("FROM ");
        ctx.write_table(&self.base.table);
        ctx.write_base_alias();
        ctx.push('\n');
        QueryBase::write_joins(ctx, &joins)?;
        self.base.write_where(ctx, None)
    }
}

impl Compile for Delete {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("delete", &self.base.table, |ctx| self.write(ctx))
    }
}
