//! SELECT statement builder.
//!
//! Clauses are written one per line in fixed order: select list, FROM (with
//! any `JSON_TABLE` sources), joins, WHERE, GROUP BY, ORDER BY, LIMIT and
//! `FOR UPDATE`. Clauses with nothing to write are left out.

use super::base::{Correlation, QueryBase};
use super::json::{JsonSelect, JsonTable};
use crate::condition::Where;
use crate::context::{self, CompileContext};
use crate::error::Result;
use crate::field::{OrderField, SelectField};
use crate::join::{AliasSet, Join, JoinMode, JoinOn, ResolvedJoin};
use crate::{Compile, Compiled};

/// A SELECT statement.
///
/// ```rust
/// use sqlc_core::{Compile, Select, Where};
///
/// let (sql, params) = Select::new("user")
///     .fields(["id", "c.timeout"])
///     .left_join("client", "c", "id", "client_id", None)
///     .where_clause(Where::new().eq("email", "x"))
///     .compile()
///     .unwrap()
///     .into_parts();
///
/// assert_eq!(
///     sql,
///     "SELECT u.id, c.timeout\nFROM .user u\nLEFT JOIN .client c ON c.id=u.client_id\nWHERE u.email=?"
/// );
/// assert_eq!(params.len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct Select {
    pub(crate) base: QueryBase,
    fields: Vec<SelectField>,
    distinct: bool,
    group: Vec<String>,
    order: Vec<OrderField>,
    offset: u64,
    limit: u64,
    read_lock: bool,
    json: Vec<JsonSelect>,
    json_tables: Vec<JsonTable>,
}

impl Select {
    /// Creates a SELECT on `table`.
    #[must_use]
    pub fn new(table: &str) -> Self {
        Self {
            base: QueryBase::new(table),
            fields: vec![],
            distinct: false,
            group: vec![],
            order: vec![],
            offset: 0,
            limit: 0,
            read_lock: false,
            json: vec![],
            json_tables: vec![],
        }
    }

    /// Creates a SELECT on the row of `table` with the given id.
    #[must_use]
    pub fn by_id(table: &str, id: u64) -> Self {
        Self::new(table).id(id)
    }

    /// Restricts the statement to the row with this id (`id=<id>`, written
    /// inline as the first WHERE term).
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

    /// Sets the select list, replacing any previous one.
    #[must_use]
    pub fn fields<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<SelectField>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Appends one entry to the select list.
    #[must_use]
    pub fn field(mut self, field: impl Into<SelectField>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Writes `SELECT DISTINCT`.
    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Adds a declared join.
    #[must_use]
    pub fn join(mut self, join: Join) -> Self {
        self.base.joins.push(join);
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

    /// Sets the GROUP BY fields.
    #[must_use]
    pub fn group<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group = fields
            .into_iter()
            .map(|f| String::from(f.as_ref()))
            .collect();
        self
    }

    /// Sets the ORDER BY fields (`field` or `field DESC`).
    #[must_use]
    pub fn order<I, F>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<OrderField>,
    {
        self.order = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Writes `LIMIT offset,count`. A count of 0 disables the clause.
    #[must_use]
    pub const fn limit(mut self, offset: u64, count: u64) -> Self {
        self.offset = offset;
        self.limit = count;
        self
    }

    /// Appends `FOR UPDATE`.
    #[must_use]
    pub const fn read_lock(mut self) -> Self {
        self.read_lock = true;
        self
    }

    /// Adds a correlated JSON sub-select named `name`: the rows of `query`
    /// where `query.inner` equals this statement's `outer`, aggregated into
    /// a JSON array.
    #[must_use]
    pub fn json_select(mut self, name: &str, query: Self, inner: &str, outer: &str) -> Self {
        self.json.push(JsonSelect::new(name, query, inner, outer));
        self
    }

    /// Adds a `JSON_TABLE` source to the FROM clause.
    #[must_use]
    pub fn json_table(mut self, table: JsonTable) -> Self {
        self.json_tables.push(table);
        self
    }

    /// Target table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.base.table
    }

    /// Number of entries a JSON aggregate of this select would carry.
    pub(crate) fn json_field_count(&self) -> usize {
        self.fields.len() + self.json.len()
    }

    /// Compiles this select as the body of a correlated JSON sub-select.
    pub(crate) fn compile_correlated(&self, correlation: &Correlation<'_>) -> Result<Compiled> {
        context::compile_with("json_select", &self.base.table, |ctx| {
            self.write(ctx, Some(correlation))
        })
    }

    fn write(&self, ctx: &mut CompileContext, correlation: Option<&Correlation<'_>>) -> Result<()> {
        let outer_aliases = correlation.map_or(&[][..], |c| c.outer_aliases);
        let joins = self.prepare(ctx, outer_aliases, correlation.is_some())?;
        if correlation.is_some() {
            self.write_json_object(ctx)?;
        } else {
            self.write_select_list(ctx)?;
        }
        self.write_from(ctx)?;
        QueryBase::write_joins(ctx, &joins)?;
        self.base.write_where(ctx, correlation)?;
        self.write_tail(ctx);
        Ok(())
    }

    /// Assigns aliases and picks the joins to emit. `outer_aliases` are the
    /// aliases of an enclosing statement this one is correlated with.
    pub(crate) fn prepare<'a>(
        &'a self,
        ctx: &mut CompileContext,
        outer_aliases: &[String],
        correlated: bool,
    ) -> Result<Vec<ResolvedJoin<'a>>> {
        let mut reserved: Vec<&str> = self.json_tables.iter().map(JsonTable::alias).collect();
        reserved.extend(outer_aliases.iter().map(String::as_str));
        let force = correlated || !self.json.is_empty() || !self.json_tables.is_empty();
        self.base.prepare(ctx, force, &reserved, |set| {
            self.collect_aliases(set);
        })
    }

    fn collect_aliases(&self, set: &mut AliasSet) {
        for field in &self.fields {
            set.apply(field.field());
        }
        for json in &self.json {
            json.collect_aliases(set);
        }
        for table in &self.json_tables {
            table.collect_aliases(set);
        }
        for field in &self.group {
            set.apply(field);
        }
        for field in &self.order {
            set.apply(field.field());
        }
    }

    pub(crate) fn write_select_list(&self, ctx: &mut CompileContext) -> Result<()> {
        ctx.push_str("SELECT ");
        if self.distinct {
            ctx.push_str("DISTINCT ");
        }
        if self.fields.is_empty() && self.json.is_empty() {
            ctx.push('*');
        }
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            field.write(ctx);
        }
        for (i, json) in self.json.iter().enumerate() {
            if i > 0 || !self.fields.is_empty() {
                ctx.push_str(", ");
            }
            json.write(ctx)?;
            ctx.push(' ');
            ctx.push_str(json.name());
        }
        ctx.push('\n');
        Ok(())
    }

    fn write_json_object(&self, ctx: &mut CompileContext) -> Result<()> {
        ctx.push_str("SELECT JSON_ARRAYAGG(JSON_OBJECT(");
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            ctx.push_fmt(format_args!("'{}', ", field.output_name()));
            field.write_expr(ctx);
        }
        for (i, json) in self.json.iter().enumerate() {
            if i > 0 || !self.fields.is_empty() {
                ctx.push_str(", ");
            }
            ctx.push_fmt(format_args!("'{}', ", json.name()));
            json.write(ctx)?;
        }
        ctx.push_str("))\n");
        Ok(())
    }

    fn write_from(&self, ctx: &mut CompileContext) -> Result<()> {
        ctx.push_str("FROM ");
        ctx.write_table(&self.base.table);
        ctx.write_base_alias();
        for table in &self.json_tables {
            table.write(ctx)?;
        }
        ctx.push('\n');
        Ok(())
    }

    /// Writes GROUP BY, ORDER BY, LIMIT and FOR UPDATE.
    pub(crate) fn write_tail(&self, ctx: &mut CompileContext) {
        if !self.group.is_empty() {
            ctx.push_str("GROUP BY ");
            for (i, field) in self.group.iter().enumerate() {
                if i > 0 {
                    ctx.push_str(", ");
                }
                ctx.write_field(field);
            }
            ctx.push('\n');
        }
        if !self.order.is_empty() {
            ctx.push_str("ORDER BY ");
            for (i, field) in self.order.iter().enumerate() {
                if i > 0 {
                    ctx.push_str(", ");
                }
                field.write(ctx);
            }
            ctx.push('\n');
        }
        if self.limit > 0 {
            ctx.push_fmt(format_args!("LIMIT {},{}\n", self.offset, self.limit));
        }
        if self.read_lock {
            ctx.push_str("FOR UPDATE\n");
        }
    }
}

impl Compile for Select {
    fn compile(&self) -> Result<Compiled> {
        context::compile_with("select", &self.base.table, |ctx| self.write(ctx, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CompileError;
    use crate::value::SqlValue;

    #[test]
    fn test_simple_select() {
        let compiled = Select::new("user")
            .fields(["id", "email"])
            .where_clause(Where::new().eq("email", "x"))
            .limit(0, 10)
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT id, email\nFROM .user\nWHERE email=?\nLIMIT 0,10"
        );
        assert_eq!(compiled.params, vec![SqlValue::Text(String::from("x"))]);
    }

    #[test]
    fn test_all_clauses() {
        let compiled = Select::by_id("user", 5)
            .distinct()
            .fields(["count|id n", "role"])
            .group(["role"])
            .order(["n DESC", "role"])
            .limit(20, 10)
            .read_lock()
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT DISTINCT COUNT(id) n, role\nFROM .user\nWHERE id=5\nGROUP BY role\nORDER BY n DESC, role\nLIMIT 20,10\nFOR UPDATE"
        );
        assert!(compiled.params.is_empty());
    }

    #[test]
    fn test_zero_limit_omitted() {
        let compiled = Select::new("user").fields(["id"]).limit(30, 0).compile().unwrap();
        assert_eq!(compiled.sql, "SELECT id\nFROM .user");
    }

    #[test]
    fn test_no_fields_selects_star() {
        let compiled = Select::new("user").compile().unwrap();
        assert_eq!(compiled.sql, "SELECT *\nFROM .user");
    }

    #[test]
    fn test_requested_alias() {
        let compiled = Select::new("user")
            .alias("x")
            .fields(["id"])
            .left_join("client", "c", "id", "client_id", None)
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT x.id\nFROM .user x\nLEFT JOIN .client c ON c.id=x.client_id"
        );
    }

    #[test]
    fn test_base_alias_avoids_join_alias() {
        let compiled = Select::new("user")
            .fields(["id"])
            .left_join("unit", "u", "id", "unit_id", None)
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT a.id\nFROM .user a\nLEFT JOIN .unit u ON u.id=a.unit_id"
        );
    }

    #[test]
    fn test_in_subquery_splices_params() {
        let compiled = Select::new("user")
            .fields(["id"])
            .where_clause(
                Where::new()
                    .eq("active", true)
                    .in_subquery(
                        "client_id",
                        Select::new("client")
                            .fields(["id"])
                            .where_clause(Where::new().eq("country", "DK")),
                    )
                    .lt("age", 30),
            )
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT id\nFROM .user\nWHERE active=? AND client_id IN (SELECT id\nFROM .client\nWHERE country=?) AND age<?"
        );
        assert_eq!(
            compiled.params,
            vec![
                SqlValue::Bool(true),
                SqlValue::Text(String::from("DK")),
                SqlValue::Int(30)
            ]
        );
    }

    #[test]
    fn test_subquery_error_propagates() {
        let err = Select::new("user")
            .where_clause(Where::new().in_subquery(
                "client_id",
                Select::new("client").where_clause(Where::new().eq("a", 1).eq("a", 2)),
            ))
            .compile()
            .unwrap_err();
        assert!(matches!(err, CompileError::IncompatibleOperator { .. }));
    }

    #[test]
    fn test_json_select() {
        let items = Select::new("item")
            .fields(["name", "price"])
            .where_clause(Where::new().gt("price", 0));
        let compiled = Select::new("invoice")
            .fields(["id"])
            .json_select("items", items, "invoice_id", "id")
            .where_clause(Where::new().eq("paid", false))
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT i.id, (SELECT JSON_ARRAYAGG(JSON_OBJECT('name', a.name, 'price', a.price))\nFROM .item a\nWHERE a.invoice_id=i.id AND a.price>?) items\nFROM .invoice i\nWHERE i.paid=?"
        );
        assert_eq!(
            compiled.params,
            vec![SqlValue::Int(0), SqlValue::Bool(false)]
        );
    }

    #[test]
    fn test_nested_json_select() {
        let tags = Select::new("tag").fields(["name", "color"]);
        let items = Select::new("item")
            .fields(["name"])
            .json_select("tags", tags, "item_id", "id");
        let compiled = Select::new("order")
            .fields(["id"])
            .json_select("items", items, "order_id", "id")
            .compile()
            .unwrap();
        assert_eq!(
            compiled.sql,
            "SELECT o.id, (SELECT JSON_ARRAYAGG(JSON_OBJECT('name', i.name, 'tags', (SELECT JSON_ARRAYAGG(JSON_OBJECT('name', t.name, 'color', t.color))\nFROM .tag t\nWHERE t.item_id=i.id)))\nFROM .item i\nWHERE i.order_id=o.id) items\nFROM .order o"
        );
    }

    #[test]
    fn test_compile_twice_identical() {
        let query = Select::new("user")
            .fields(["id", "c.name"])
            .left_join("client", "c", "id", "client_id", None)
            .where_clause(Where::new().in_list("id", vec![1, 2, 3]));
        let first = query.compile().unwrap();
        let second = query.compile().unwrap();
        assert_eq!(first, second);
    }
}
