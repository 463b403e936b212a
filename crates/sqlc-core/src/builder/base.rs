//! State shared by the statements that target a base table.

use crate::condition::{Condition, ConditionValue, OperatorScope, Where};
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::join::{self, AliasSet, Join, JoinMode, JoinOn, ResolvedJoin};
use crate::Compile;

/// Equality tying a nested statement to the row of its enclosing one.
#[derive(Debug)]
pub(crate) struct Correlation<'a> {
    /// Aliases in use by the enclosing statement.
    pub(crate) outer_aliases: &'a [String],
    /// Field of the nested statement.
    pub(crate) inner: &'a str,
    /// Fully qualified field of the enclosing statement.
    pub(crate) outer: &'a str,
}

/// Base table, joins, id shortcut and WHERE tree of a statement.
#[derive(Debug, Clone)]
pub(crate) struct QueryBase {
    pub(crate) table: String,
    pub(crate) alias: Option<String>,
    pub(crate) joins: Vec<Join>,
    pub(crate) optimize: bool,
    pub(crate) id: Option<u64>,
    pub(crate) filter: Where,
}

impl QueryBase {
    pub(crate) fn new(table: &str) -> Self {
        Self {
            table: String::from(table),
            alias: None,
            joins: vec![],
            optimize: false,
            id: None,
            filter: Where::default(),
        }
    }

    pub(crate) fn join(
        &mut self,
        mode: JoinMode,
        table: &str,
        alias: &str,
        field: &str,
        foreign: &str,
        on: Option<JoinOn>,
    ) {
        self.joins.push(Join::new(mode, table, alias, field, foreign, on));
    }

    /// Assigns aliases and picks the joins to emit.
    ///
    /// `referenced` records the aliases the statement uses outside its WHERE
    /// tree; it is only consulted when join optimization is on.
    pub(crate) fn prepare(
        &self,
        ctx: &mut CompileContext,
        force_alias: bool,
        reserved: &[&str],
        referenced: impl FnOnce(&mut AliasSet),
    ) -> Result<Vec<ResolvedJoin<'_>>> {
        ctx.assign_aliases(
            &self.table,
            self.alias.as_deref(),
            &self.joins,
            force_alias,
            reserved,
        )?;
        if !self.optimize || self.joins.is_empty() {
            return Ok(join::declared(&self.joins));
        }
        let mut set = AliasSet::default();
        referenced(&mut set);
        self.filter.collect_aliases(&mut set);
        join::resolve(&self.joins, ctx.base_alias(), &set)
    }

    pub(crate) fn write_joins(
        ctx: &mut CompileContext,
        joins: &[ResolvedJoin<'_>],
    ) -> Result<()> {
        for resolved in joins {
            resolved.join.write(ctx)?;
        }
        Ok(())
    }

    /// Writes the WHERE line: the correlation equality, the id shortcut, then
    /// the condition tree. Nothing is written when all three are absent.
    pub(crate) fn write_where(
        &self,
        ctx: &mut CompileContext,
        correlation: Option<&Correlation<'_>>,
    ) -> Result<()> {
        if correlation.is_none() && self.id.is_none() && self.filter.is_empty() {
            return Ok(());
        }

        ctx.push_str("WHERE ");
        let mut first = true;
        if let Some(correlation) = correlation {
            ctx.write_field(correlation.inner);
            ctx.push('=');
            ctx.push_str(correlation.outer);
            first = false;
        }
        if let Some(id) = self.id {
            if !first {
                ctx.push_str(" AND ");
            }
            ctx.write_field("id");
            ctx.push_fmt(format_args!("={id}"));
            first = false;
        }
        write_clause(ctx, &self.filter, &mut first)?;
        ctx.push('\n');
        Ok(())
    }
}

fn separate(ctx: &mut CompileContext, first: &mut bool, conjunction: &str) {
    if *first {
        *first = false;
    } else {
        ctx.push_str(conjunction);
    }
}

/// Writes one AND-level clause. Each level checks operator compatibility in
/// its own scope.
fn write_clause(ctx: &mut CompileContext, clause: &Where, first: &mut bool) -> Result<()> {
    if let Some(wrapped) = clause.wrapped() {
        write_clause(ctx, wrapped, first)?;
    }

    let mut scope = OperatorScope::default();
    for condition in clause.conditions() {
        scope.check(condition)?;
        separate(ctx, first, " AND ");
        write_condition(ctx, condition)?;
    }

    for group in clause.or_groups() {
        if group.is_empty() {
            continue;
        }
        separate(ctx, first, " AND ");
        ctx.push('(');
        write_or_group(ctx, group, &mut true)?;
        ctx.push(')');
    }
    Ok(())
}

/// Writes every condition of an OR-group joined by OR. Conditions inside a
/// disjunction are not compatibility-checked.
fn write_or_group(ctx: &mut CompileContext, group: &Where, first: &mut bool) -> Result<()> {
    if let Some(wrapped) = group.wrapped() {
        write_or_group(ctx, wrapped, first)?;
    }
    for condition in group.conditions() {
        separate(ctx, first, " OR ");
        write_condition(ctx, condition)?;
    }
    for nested in group.or_groups() {
        if nested.is_empty() {
            continue;
        }
        separate(ctx, first, " OR ");
        ctx.push('(');
        write_or_group(ctx, nested, &mut true)?;
        ctx.push(')');
    }
    Ok(())
}

fn write_condition(ctx: &mut CompileContext, condition: &Condition) -> Result<()> {
    ctx.write_field(condition.field());
    ctx.push_str(condition.operator().fragment());
    match condition.value() {
        ConditionValue::None => {}
        ConditionValue::One(value) => ctx.bind(value.clone()),
        ConditionValue::Pair(low, high) => {
            ctx.push(' ');
            ctx.bind(low.clone());
            ctx.push_str(" AND ");
            ctx.bind(high.clone());
        }
        ConditionValue::List(values) => {
            if values.is_empty() {
                return Err(CompileError::EmptyInList {
                    field: String::from(condition.field()),
                    operator: condition.operator(),
                });
            }
            ctx.push_str(" (");
            ctx.placeholders(values.len());
            ctx.extend_params(values.iter().cloned());
            ctx.push(')');
        }
        ConditionValue::Subquery(query) => {
            let nested = query.compile()?;
            ctx.push_str(" (");
            ctx.splice(nested);
            ctx.push(')');
        }
    }
    Ok(())
}
