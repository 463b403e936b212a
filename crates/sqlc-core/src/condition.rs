//! Condition trees for WHERE clauses.
//!
//! A [`Where`] accumulates conditions fluently. Its own conditions are AND-ed,
//! an optional wrapped clause is emitted in front of them, and each OR-group
//! becomes one parenthesized OR combination AND-ed after the rest.
//!
//! ```rust
//! use sqlc_core::{Compile, Select, Where};
//!
//! let query = Select::new("user")
//!     .fields(["id", "email"])
//!     .where_clause(
//!         Where::new()
//!             .gt("created", 100)
//!             .lt("created", 200)
//!             .or_group(Where::new().eq("role", "admin").null("banned")),
//!     );
//!
//! let compiled = query.compile().unwrap();
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT id, email\nFROM .user\nWHERE created>? AND created<? AND (role=? OR banned IS NULL)"
//! );
//! ```

use std::collections::HashMap;
use std::fmt;

use crate::builder::Select;
use crate::error::{CompileError, Result};
use crate::join::AliasSet;
use crate::value::{SqlValue, ToSqlValue};

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `field=?`
    Eq,
    /// `field!=?`
    NotEq,
    /// `field>?`
    Gt,
    /// `field>=?`
    GtEq,
    /// `field<?`
    Lt,
    /// `field<=?`
    LtEq,
    /// `field IS NULL`
    Null,
    /// `field IS NOT NULL`
    NotNull,
    /// `field BETWEEN ? AND ?`
    Between,
    /// `field NOT BETWEEN ? AND ?`
    NotBetween,
    /// `field IN (?,…)`
    In,
    /// `field NOT IN (?,…)`
    NotIn,
    /// `field IN (<subquery>)`
    InSubquery,
}

impl Operator {
    /// SQL text written right after the field name.
    #[must_use]
    pub const fn fragment(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "!=",
            Self::Gt => ">",
            Self::GtEq => ">=",
            Self::Lt => "<",
            Self::LtEq => "<=",
            Self::Null => " IS NULL",
            Self::NotNull => " IS NOT NULL",
            Self::Between => " BETWEEN",
            Self::NotBetween => " NOT BETWEEN",
            Self::In | Self::InSubquery => " IN",
            Self::NotIn => " NOT IN",
        }
    }

    /// Returns true for the six binary comparison operators.
    #[must_use]
    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            Self::Eq | Self::NotEq | Self::Gt | Self::GtEq | Self::Lt | Self::LtEq
        )
    }

    /// Checks whether `new` may follow `self` on the same field.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::IncompatibleOperator`] naming the field and
    /// both operators.
    pub fn check_followed_by(self, new: Self, field: &str) -> Result<()> {
        let compatible = match self {
            _ if self == new => false,
            Self::Null => new != Self::NotNull,
            Self::NotNull => new != Self::Null,
            Self::Eq | Self::NotEq | Self::Between | Self::NotBetween | Self::In | Self::NotIn => {
                false
            }
            Self::Gt | Self::GtEq => matches!(new, Self::Lt | Self::LtEq),
            Self::Lt | Self::LtEq => matches!(new, Self::Gt | Self::GtEq),
            Self::InSubquery => true,
        };
        if compatible {
            Ok(())
        } else {
            Err(CompileError::IncompatibleOperator {
                field: String::from(field),
                current: self,
                new,
            })
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InSubquery => f.write_str("IN SUBQUERY"),
            op => f.write_str(op.fragment().trim_start()),
        }
    }
}

/// Value bound by a condition. Its shape follows the operator.
#[derive(Debug, Clone)]
pub enum ConditionValue {
    /// `IS NULL` / `IS NOT NULL` take no value.
    None,
    /// Single placeholder.
    One(SqlValue),
    /// Lower and upper bound of a BETWEEN.
    Pair(SqlValue, SqlValue),
    /// Values of an IN list.
    List(Vec<SqlValue>),
    /// Nested statement for `IN (<subquery>)`.
    Subquery(Box<Select>),
}

/// A single field/operator/value filter term.
#[derive(Debug, Clone)]
pub struct Condition {
    pub(crate) field: String,
    pub(crate) operator: Operator,
    pub(crate) value: ConditionValue,
}

impl Condition {
    /// Field the condition filters on.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator of the condition.
    #[must_use]
    pub const fn operator(&self) -> Operator {
        self.operator
    }

    /// Value bound by the condition.
    #[must_use]
    pub const fn value(&self) -> &ConditionValue {
        &self.value
    }
}

/// Composable WHERE clause.
#[derive(Debug, Clone, Default)]
pub struct Where {
    wrapped: Option<Box<Where>>,
    conditions: Vec<Condition>,
    or_groups: Vec<Where>,
}

impl Where {
    /// Creates an empty clause.
    #[must_use]
    pub fn new() -> Self {
        Self {
            wrapped: None,
            // Most clauses carry one or two conditions
            conditions: Vec::with_capacity(2),
            or_groups: vec![],
        }
    }

    /// Wraps another clause; its conditions are emitted before this one's.
    #[must_use]
    pub fn wrap(mut self, inner: Self) -> Self {
        self.wrapped = Some(Box::new(inner));
        self
    }

    /// Adds an OR-group: the group's conditions are OR-ed together and the
    /// group as a whole is AND-ed with the rest of this clause.
    #[must_use]
    pub fn or_group(mut self, group: Self) -> Self {
        self.or_groups.push(group);
        self
    }

    /// Adds `field=?`.
    #[must_use]
    pub fn eq<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::Eq, value)
    }

    /// Adds `field!=?`.
    #[must_use]
    pub fn not_eq<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::NotEq, value)
    }

    /// Adds one `field=?` per entry, sorted by field name.
    #[must_use]
    pub fn eqs<K, T, I>(mut self, fields: I) -> Self
    where
        K: Into<String>,
        T: ToSqlValue,
        I: IntoIterator<Item = (K, T)>,
    {
        let mut entries: Vec<(String, SqlValue)> = fields
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_sql_value()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (field, value) in entries {
            self = self.push(field, Operator::Eq, ConditionValue::One(value));
        }
        self
    }

    /// Adds `field>?`.
    #[must_use]
    pub fn gt<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::Gt, value)
    }

    /// Adds `field>=?`.
    #[must_use]
    pub fn gt_eq<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::GtEq, value)
    }

    /// Adds `field<?`.
    #[must_use]
    pub fn lt<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::Lt, value)
    }

    /// Adds `field<=?`.
    #[must_use]
    pub fn lt_eq<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.one(field, Operator::LtEq, value)
    }

    /// Adds `field IS NULL`.
    #[must_use]
    pub fn null(self, field: &str) -> Self {
        self.push(String::from(field), Operator::Null, ConditionValue::None)
    }

    /// Adds `field IS NOT NULL`.
    #[must_use]
    pub fn not_null(self, field: &str) -> Self {
        self.push(String::from(field), Operator::NotNull, ConditionValue::None)
    }

    /// Adds `field BETWEEN ? AND ?`.
    #[must_use]
    pub fn between<T: ToSqlValue, U: ToSqlValue>(self, field: &str, low: T, high: U) -> Self {
        let value = ConditionValue::Pair(low.to_sql_value(), high.to_sql_value());
        self.push(String::from(field), Operator::Between, value)
    }

    /// Adds `field NOT BETWEEN ? AND ?`.
    #[must_use]
    pub fn not_between<T: ToSqlValue, U: ToSqlValue>(self, field: &str, low: T, high: U) -> Self {
        let value = ConditionValue::Pair(low.to_sql_value(), high.to_sql_value());
        self.push(String::from(field), Operator::NotBetween, value)
    }

    /// Adds `field IN (?,…)`. An empty list fails at compile time.
    #[must_use]
    pub fn in_list<T: ToSqlValue>(self, field: &str, values: Vec<T>) -> Self {
        self.list(field, Operator::In, values)
    }

    /// Adds `field NOT IN (?,…)`. An empty list fails at compile time.
    #[must_use]
    pub fn not_in_list<T: ToSqlValue>(self, field: &str, values: Vec<T>) -> Self {
        self.list(field, Operator::NotIn, values)
    }

    /// Adds `field IN (<subquery>)`; the subquery's parameters are bound at
    /// this position.
    #[must_use]
    pub fn in_subquery(self, field: &str, query: Select) -> Self {
        self.push(
            String::from(field),
            Operator::InSubquery,
            ConditionValue::Subquery(Box::new(query)),
        )
    }

    /// Returns true if neither this clause nor any nested clause holds a
    /// condition.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
            && self.wrapped.as_ref().is_none_or(|w| w.is_empty())
            && self.or_groups.iter().all(Self::is_empty)
    }

    /// Conditions of this clause, without wrapped clause or OR-groups.
    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    /// The wrapped clause, if any.
    #[must_use]
    pub fn wrapped(&self) -> Option<&Self> {
        self.wrapped.as_deref()
    }

    /// OR-groups of this clause.
    #[must_use]
    pub fn or_groups(&self) -> &[Self] {
        &self.or_groups
    }

    /// Records the alias of every qualified field in the tree.
    pub(crate) fn collect_aliases(&self, set: &mut AliasSet) {
        if let Some(wrapped) = &self.wrapped {
            wrapped.collect_aliases(set);
        }
        for group in &self.or_groups {
            group.collect_aliases(set);
        }
        for condition in &self.conditions {
            set.apply(&condition.field);
        }
    }

    fn one<T: ToSqlValue>(self, field: &str, operator: Operator, value: T) -> Self {
        self.push(
            String::from(field),
            operator,
            ConditionValue::One(value.to_sql_value()),
        )
    }

    fn list<T: ToSqlValue>(self, field: &str, operator: Operator, values: Vec<T>) -> Self {
        let values = values.into_iter().map(ToSqlValue::to_sql_value).collect();
        self.push(String::from(field), operator, ConditionValue::List(values))
    }

    fn push(mut self, field: String, operator: Operator, value: ConditionValue) -> Self {
        self.conditions.push(Condition {
            field,
            operator,
            value,
        });
        self
    }
}

/// Last operator seen per field within one AND-level clause.
#[derive(Debug, Default)]
pub(crate) struct OperatorScope<'a> {
    seen: HashMap<&'a str, Operator>,
}

impl<'a> OperatorScope<'a> {
    pub(crate) fn check(&mut self, condition: &'a Condition) -> Result<()> {
        if let Some(current) = self.seen.get(condition.field.as_str()) {
            current.check_followed_by(condition.operator, &condition.field)?;
        }
        self.seen.insert(&condition.field, condition.operator);
        Ok(())
    }
}
