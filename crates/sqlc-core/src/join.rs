//! Join descriptors and join dependency resolution.
//!
//! A join names its table, the alias it is known by, and how it attaches:
//! `field` is a column of the joined table, `foreign` a column of the base
//! table (unqualified) or of another join (`alias.column`). Extra on-terms can
//! compare against further columns or fixed values.
//!
//! When join optimization is enabled only joins that are referenced by the
//! statement, directly or through another surviving join, are emitted.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::condition::Operator;
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::value::{SqlValue, ToSqlValue};

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JoinMode {
    /// `INNER JOIN`
    Inner,
    /// `LEFT JOIN`
    Left,
}

impl fmt::Display for JoinMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inner => f.write_str("INNER JOIN"),
            Self::Left => f.write_str("LEFT JOIN"),
        }
    }
}

/// Right-hand side of an extra on-term.
#[derive(Debug, Clone, PartialEq)]
pub enum OnTarget {
    /// Another column, qualified like any other field.
    Field(String),
    /// A trusted fixed value, written inline.
    Value(SqlValue),
}

/// One extra term of a join's ON clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OnCondition {
    field: String,
    operator: Operator,
    target: OnTarget,
}

/// Extra ON terms for a join, AND-ed after the primary key equality.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinOn {
    conditions: Vec<OnCondition>,
}

impl JoinOn {
    /// Creates an empty set of on-terms.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `alias.field=<value>` with the value written inline.
    #[must_use]
    pub fn value<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.compare(field, Operator::Eq, value)
    }

    /// Adds `alias.field<op><value>` with the value written inline.
    ///
    /// Only the binary comparisons and `Null`/`NotNull` are valid here; other
    /// operators fail at compile time.
    #[must_use]
    pub fn compare<T: ToSqlValue>(mut self, field: &str, operator: Operator, value: T) -> Self {
        self.conditions.push(OnCondition {
            field: String::from(field),
            operator,
            target: OnTarget::Value(value.to_sql_value()),
        });
        self
    }

    /// Adds `alias.field=<foreign>` where `foreign` is another column.
    #[must_use]
    pub fn field(mut self, field: &str, foreign: &str) -> Self {
        self.conditions.push(OnCondition {
            field: String::from(field),
            operator: Operator::Eq,
            target: OnTarget::Field(String::from(foreign)),
        });
        self
    }
}

/// A declared join.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    mode: JoinMode,
    table: String,
    alias: String,
    field: String,
    foreign: String,
    on: Vec<OnCondition>,
}

impl Join {
    /// Creates a join of `table` known as `alias`, attached by
    /// `alias.field=<foreign>`.
    #[must_use]
    pub fn new(
        mode: JoinMode,
        table: &str,
        alias: &str,
        field: &str,
        foreign: &str,
        on: Option<JoinOn>,
    ) -> Self {
        Self {
            mode,
            table: String::from(table),
            alias: String::from(alias),
            field: String::from(field),
            foreign: String::from(foreign),
            on: on.map(|on| on.conditions).unwrap_or_default(),
        }
    }

    /// Join flavour.
    #[must_use]
    pub const fn mode(&self) -> JoinMode {
        self.mode
    }

    /// Joined table.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Alias of the joined table.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Aliases this join's ON clause refers to, other than its own.
    fn referenced_aliases(&self) -> impl Iterator<Item = &str> {
        let foreign = std::iter::once(self.foreign.as_str());
        let fields = self.on.iter().filter_map(|c| match &c.target {
            OnTarget::Field(f) => Some(f.as_str()),
            OnTarget::Value(_) => None,
        });
        foreign
            .chain(fields)
            .filter_map(alias_of)
            .filter(move |alias| *alias != self.alias)
    }

    /// Writes the join clause line.
    pub(crate) fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        ctx.push_fmt(format_args!("{} ", self.mode));
        ctx.write_table(&self.table);
        ctx.push(' ');
        ctx.push_str(&self.alias);
        ctx.push_str(" ON ");
        self.write_own(ctx, &self.field);
        ctx.push('=');
        ctx.write_field(&self.foreign);

        for condition in &self.on {
            ctx.push_str(" AND ");
            self.write_own(ctx, &condition.field);
            match (&condition.target, condition.operator) {
                (_, op @ (Operator::Null | Operator::NotNull)) => ctx.push_str(op.fragment()),
                (OnTarget::Field(foreign), op) if op.is_comparison() => {
                    ctx.push_str(op.fragment());
                    ctx.write_field(foreign);
                }
                (OnTarget::Value(value), op) if op.is_comparison() => {
                    ctx.push_str(op.fragment());
                    ctx.push_str(&value.literal());
                }
                (_, op) => {
                    return Err(CompileError::UnsupportedJoinOperator {
                        alias: self.alias.clone(),
                        operator: op,
                    })
                }
            }
        }
        ctx.push('\n');
        Ok(())
    }

    fn write_own(&self, ctx: &mut CompileContext, field: &str) {
        ctx.push_str(&self.alias);
        ctx.push('.');
        ctx.push_str(field);
    }
}

/// Returns the alias part of a qualified `alias.field`.
pub(crate) fn alias_of(field: &str) -> Option<&str> {
    field.split_once('.').map(|(alias, _)| alias)
}

/// Set of table aliases referenced by a statement.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct AliasSet(BTreeSet<String>);

impl AliasSet {
    /// Records the alias of `field` if it is qualified.
    pub(crate) fn apply(&mut self, field: &str) {
        if let Some(alias) = alias_of(field) {
            if !self.0.contains(alias) {
                self.0.insert(String::from(alias));
            }
        }
    }

    pub(crate) fn contains(&self, alias: &str) -> bool {
        self.0.contains(alias)
    }

    #[cfg(test)]
    pub(crate) fn sorted(&self) -> Vec<&str> {
        self.0.iter().map(String::as_str).collect()
    }
}

/// A join that survived resolution, with its computed placement.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedJoin<'a> {
    pub(crate) join: &'a Join,
    pub(crate) depth: usize,
}

/// Returns all joins in declaration order.
pub(crate) fn declared(joins: &[Join]) -> Vec<ResolvedJoin<'_>> {
    joins
        .iter()
        .map(|join| ResolvedJoin { join, depth: 0 })
        .collect()
}

/// Computes the minimal join set for the referenced aliases.
///
/// Joins pulled in transitively through ON clauses survive too. The result is
/// ordered by depth, then inner before left, then alias, so every join comes
/// after the joins it depends on.
pub(crate) fn resolve<'a>(
    joins: &'a [Join],
    base_alias: &str,
    referenced: &AliasSet,
) -> Result<Vec<ResolvedJoin<'a>>> {
    let index: BTreeMap<&str, &Join> = joins.iter().map(|j| (j.alias(), j)).collect();
    let dependencies: BTreeMap<&str, BTreeSet<&str>> = joins
        .iter()
        .map(|j| {
            let deps = j
                .referenced_aliases()
                .filter(|alias| *alias != base_alias && index.contains_key(alias))
                .collect();
            (j.alias(), deps)
        })
        .collect();

    let mut keep: BTreeSet<&str> = index
        .keys()
        .copied()
        .filter(|alias| referenced.contains(alias))
        .collect();
    let mut pending: Vec<&str> = keep.iter().copied().collect();
    while let Some(alias) = pending.pop() {
        for &dep in &dependencies[alias] {
            if keep.insert(dep) {
                pending.push(dep);
            }
        }
    }

    let mut depth: BTreeMap<&str, usize> = keep.iter().map(|alias| (*alias, 0)).collect();
    let mut unstable = Vec::new();
    for _ in 0..=joins.len() {
        unstable.clear();
        for alias in &keep {
            let next = dependencies[alias]
                .iter()
                .map(|dep| depth[dep] + 1)
                .max()
                .unwrap_or(0);
            if depth[alias] != next {
                depth.insert(*alias, next);
                unstable.push(*alias);
            }
        }
        if unstable.is_empty() {
            break;
        }
    }
    if !unstable.is_empty() {
        return Err(CompileError::CircularJoinDependency(
            unstable.into_iter().map(String::from).collect(),
        ));
    }

    let mut resolved: Vec<ResolvedJoin<'a>> = keep
        .iter()
        .map(|alias| ResolvedJoin {
            join: index[alias],
            depth: depth[alias],
        })
        .collect();
    resolved.sort_by(|a, b| {
        a.depth
            .cmp(&b.depth)
            .then(a.join.mode.cmp(&b.join.mode))
            .then_with(|| a.join.alias.cmp(&b.join.alias))
    });
    tracing::trace!(
        declared = joins.len(),
        kept = resolved.len(),
        "resolved join dependencies"
    );
    Ok(resolved)
}
