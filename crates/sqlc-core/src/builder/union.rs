//! UNION statement builder.

use super::base::QueryBase;
use super::select::Select;
use crate::condition::Where;
use crate::context::{self, CompileContext};
use crate::error::{CompileError, Result};
use crate::field::{OrderField, SelectField};
use crate::join::JoinOn;
use crate::{Compile, Compiled};

/// Name the unioned rowset is known by in the outer statement.
const UNION_TABLE: &str = "t";

/// Two or more SELECTs combined into one rowset, queried by an outer SELECT.
///
/// ```rust
/// use sqlc_core::{Compile, Select, Union, Where};
///
/// let compiled = Union::all()
///     .union(Select::new("invoice").fields(["id", "total"]))
///     .union(Select::new("credit_note").fields(["id", "total"]))
///     .fields(["id", "total"])
///     .where_clause(Where::new().gt("total", 100))
///     .compile()
///     .unwrap();
///
/// assert_eq!(
///     compiled.sql,
///     "SELECT id, total\nFROM (\nSELECT id, total\nFROM .invoice\nUNION ALL\nSELECT id, total\nFROM .credit_note\n) t\nWHERE total>?"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct Union {
    outer: Select,
    members: Vec<Select>,
    all: bool,
}

impl Union {
    /// Creates a `UNION` (duplicates removed).
    #[must_use]
    pub fn new() -> Self {
        Self {
            outer: Select::new(UNION_TABLE),
            members: Vec::with_capacity(2),
            all: false,
        }
    }

    /// Creates a `UNION ALL`.
    #[must_use]
    pub fn all() -> Self {
        Self {
            all: true,
            ..Self::new()
        }
    }

    /// Adds a member query.
    #[must_use]
    pub fn union(mut self, query: Select) -> Self {
        self.members.push(query);
        self
    }

    /// Sets the outer select list.
    #[must_use]
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<SelectField>,
    {
        self.outer = self.outer.fields(fields);
        self
    }

    /// Writes `SELECT DISTINCT` in the outer statement.
    #[must_use]
    pub fn distinct(mut self) -> Self {
        self.outer = self.outer.distinct();
        self
    }

    /// Left joins `table` onto the unioned rowset.
    #[must_use]
    pub fn left_join(
        mut self,
        table: &str,
        alias: &str,
        field: &str,
        foreign: &str,
        on: Option<JoinOn>,
    ) -> Self {
        self.outer = self.outer.left_join(table, alias, field, foreign, on);
        self
    }

    /// Sets the outer WHERE clause.
    #[must_use]
    pub fn where_clause(mut self, clause: Where) -> Self {
        self.outer = self.outer.where_clause(clause);
        self
    }

    /// Sets the outer GROUP BY fields.
    #[must_use]
    pub fn group<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.outer = self.outer.group(fields);
        self
    }

    /// Sets the outer ORDER BY fields.
    #[must_use]
    pub fn order<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<OrderField>,
    {
        self.outer = self.outer.order(fields);
        self
    }

    /// Sets the outer LIMIT.
    #[must_use]
    pub fn limit(mut self, offset: u64, count: u64) -> Self {
        self.outer = self.outer.limit(offset, count);
        self
    }

    fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        if self.members.len() < 2 {
            return Err(CompileError::UnionMemberCount(self.members.len()));
        }

        let joins = self.outer.prepare(ctx, &[], false)?;
        self.outer.write_select_list(ctx)?;

        let separator = if self.all { "UNION ALL\n" } else { "UNION\n" };
        ctx.push_str("FROM (\n");
        for (i, member) in self.members.iter().enumerate() {
            if i > 0 {
                ctx.push_str(separator);
            }
            let nested = member.compile()?;
            ctx.splice(nested);
            ctx.push('\n');
        }
        ctx.push_str(") ");
        if ctx.use_alias() {
            let alias = String::from(ctx.base_alias());
            ctx.push_str(&alias);
        } else {
            ctx.push_str(UNION_TABLE);
        }
        ctx.push('\n');

        QueryBase::write_joins(ctx, &joins)?;
        self.outer.base.write_where(ctx, None)?;
        self.outer.write_tail(ctx);
        Ok(())
    }
}

impl Default for Union {
    fn default() -> Self {
        Self::new()
    }
}

impl Compile for Union {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("union", UNION_TABLE, |ctx| self.write(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::SqlValue;

    #[test]
    fn test_member_count() {
        let err = Union::new()
            .union(Select::new("a").fields(["id"]))
            .compile()
            .unwrap_err();
        assert_eq!(err, CompileError::UnionMemberCount(1));
    }

    #[test]
    fn test_params_in_member_order_then_outer() {
        let compiled = Union::new()
            .union(
                Select::new("a")
                    .fields(["id"])
                    .where_clause(Where::new().eq("x", 1)),
            )
            .union(
                Select::new("b")
                    .fields(["id"])
                    .where_clause(Where::new().eq("y", 2)),
            )
            .fields(["id"])
            .where_clause(Where::new().not_eq("id", 3))
            .order(["id DESC"])
            .limit(0, 5)
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT id\nFROM (\nSELECT id\nFROM .a\nWHERE x=?\nUNION\nSELECT id\nFROM .b\nWHERE y=?\n) t\nWHERE id!=?\nORDER BY id DESC\nLIMIT 0,5"
        );
        assert_eq!(
            compiled.params,
            vec![SqlValue::Int(1), SqlValue::Int(2), SqlValue::Int(3)]
        );
    }

    #[test]
    fn test_outer_join_qualifies_with_union_alias() {
        let compiled = Union::all()
            .union(Select::new("a").fields(["id", "client_id"]))
            .union(Select::new("b").fields(["id", "client_id"]))
            .fields(["id", "c.name"])
            .left_join("client", "c", "id", "client_id", None)
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT t.id, c.name\nFROM (\nSELECT id, client_id\nFROM .a\nUNION ALL\nSELECT id, client_id\nFROM .b\n) t\nLEFT JOIN .client c ON c.id=t.client_id"
        );
    }

    #[test]
    fn test_member_error_propagates() {
        let err = Union::new()
            .union(Select::new("a").where_clause(Where::new().in_list::<i64>("id", vec![])))
            .union(Select::new("b"))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::EmptyInList { .. }));
    }
}
