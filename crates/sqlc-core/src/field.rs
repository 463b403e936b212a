//! Selected fields, ordering fields and assignment lists.
//!
//! Fields are plain strings. An unqualified field belongs to the statement's
//! base table and is qualified with its alias when the statement uses aliases;
//! a qualified field (`c.name`) is written as given.

use std::collections::HashSet;

use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::join::AliasSet;
use crate::value::{SqlValue, ToSqlValue};

/// Function name that renders `IFNULL(SUM(field), 0)`.
const SUM_ZERO: &str = "sum_zero";

/// One entry of a SELECT list.
///
/// The string form is `[func|]field[ alias]`:
///
/// ```rust
/// use sqlc_core::SelectField;
///
/// let field = SelectField::from("count|id total");
/// assert_eq!(field.field(), "id");
/// assert_eq!(field.function(), Some("count"));
/// assert_eq!(field.alias(), Some("total"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectField {
    field: String,
    function: Option<String>,
    alias: Option<String>,
}

impl SelectField {
    /// Selects `field` as is.
    #[must_use]
    pub fn new(field: &str) -> Self {
        Self {
            field: String::from(field),
            function: None,
            alias: None,
        }
    }

    /// Wraps the field in `FUNCTION(field)`.
    #[must_use]
    pub fn with_function(mut self, function: &str) -> Self {
        self.function = Some(String::from(function));
        self
    }

    /// Sets the output alias.
    #[must_use]
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(String::from(alias));
        self
    }

    /// Selected field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Function applied to the field.
    #[must_use]
    pub fn function(&self) -> Option<&str> {
        self.function.as_deref()
    }

    /// Output alias.
    #[must_use]
    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    /// Name of the column in the result: the alias, or the field without
    /// its table qualifier.
    #[must_use]
    pub fn output_name(&self) -> &str {
        self.alias.as_deref().unwrap_or_else(|| {
            self.field
                .rsplit_once('.')
                .map_or(self.field.as_str(), |(_, name)| name)
        })
    }

    /// Writes the field expression followed by its alias.
    pub(crate) fn write(&self, ctx: &mut CompileContext) {
        self.write_expr(ctx);
        if let Some(alias) = &self.alias {
            ctx.push(' ');
            ctx.push_str(alias);
        }
    }

    /// Writes the field expression only.
    pub(crate) fn write_expr(&self, ctx: &mut CompileContext) {
        match self.function.as_deref() {
            None => self.write_target(ctx),
            Some(SUM_ZERO) => {
                ctx.push_str("IFNULL(SUM(");
                self.write_target(ctx);
                ctx.push_str("), 0)");
            }
            Some(function) => {
                ctx.push_str(&function.to_uppercase());
                ctx.push('(');
                self.write_target(ctx);
                ctx.push(')');
            }
        }
    }

    fn write_target(&self, ctx: &mut CompileContext) {
        if self.field == "*" {
            ctx.push('*');
        } else {
            ctx.write_field(&self.field);
        }
    }
}

impl From<&str> for SelectField {
    fn from(s: &str) -> Self {
        let (function, rest) = match s.split_once('|') {
            Some((function, rest)) if !function.is_empty() => (Some(function), rest),
            Some((_, rest)) => (None, rest),
            None => (None, s),
        };
        let (field, alias) = match rest.trim().split_once(' ') {
            Some((field, alias)) => (field, Some(alias.trim())),
            None => (rest.trim(), None),
        };
        Self {
            field: String::from(field),
            function: function.map(String::from),
            alias: alias.filter(|a| !a.is_empty()).map(String::from),
        }
    }
}

impl From<String> for SelectField {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// One entry of an ORDER BY list. String form: `field[ DESC|ASC]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderField {
    field: String,
    desc: bool,
}

impl OrderField {
    /// Ascending order on `field`.
    #[must_use]
    pub fn asc(field: &str) -> Self {
        Self {
            field: String::from(field),
            desc: false,
        }
    }

    /// Descending order on `field`.
    #[must_use]
    pub fn desc(field: &str) -> Self {
        Self {
            field: String::from(field),
            desc: true,
        }
    }

    /// Ordered field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns true for descending order.
    #[must_use]
    pub const fn is_desc(&self) -> bool {
        self.desc
    }

    pub(crate) fn write(&self, ctx: &mut CompileContext) {
        ctx.write_field(&self.field);
        if self.desc {
            ctx.push_str(" DESC");
        }
    }
}

impl From<&str> for OrderField {
    fn from(s: &str) -> Self {
        let s = s.trim();
        match s.rsplit_once(' ') {
            Some((field, dir)) if dir.eq_ignore_ascii_case("desc") => Self::desc(field.trim()),
            Some((field, dir)) if dir.eq_ignore_ascii_case("asc") => Self::asc(field.trim()),
            _ => Self::asc(s),
        }
    }
}

impl From<String> for OrderField {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

/// How an assignment applies its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOp {
    /// `field=?`
    Assign,
    /// `field=field+?`
    Increment,
}

/// A field with the value written to it.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldEntry {
    field: String,
    op: FieldOp,
    value: SqlValue,
}

impl FieldEntry {
    /// Target field.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Assignment operator.
    #[must_use]
    pub const fn op(&self) -> FieldOp {
        self.op
    }

    /// Bound value.
    #[must_use]
    pub const fn value(&self) -> &SqlValue {
        &self.value
    }

    /// Writes `field=?` regardless of the operator and binds the value.
    pub(crate) fn write_assign(&self, ctx: &mut CompileContext) {
        ctx.write_field(&self.field);
        ctx.push('=');
        ctx.bind(self.value.clone());
    }

    /// Writes the assignment for this entry's operator and binds the value.
    pub(crate) fn write_update(&self, ctx: &mut CompileContext) {
        ctx.write_field(&self.field);
        ctx.push('=');
        if self.op == FieldOp::Increment {
            ctx.write_field(&self.field);
            ctx.push('+');
        }
        ctx.bind(self.value.clone());
    }
}

/// Ordered field=value list for inserts and updates.
///
/// ```rust
/// use sqlc_core::Fields;
///
/// let fields = Fields::new().value("name", "Ada").add("logins", 1);
/// assert_eq!(fields.len(), 2);
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    entries: Vec<FieldEntry>,
}

impl Fields {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::with_capacity(4),
        }
    }

    /// Adds `field=?`.
    #[must_use]
    pub fn value<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.push(field, FieldOp::Assign, value.to_sql_value())
    }

    /// Adds `field=field+?` for updates and upserts. Plain inserts write it
    /// as `field=?`.
    #[must_use]
    pub fn add<T: ToSqlValue>(self, field: &str, value: T) -> Self {
        self.push(field, FieldOp::Increment, value.to_sql_value())
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in insertion order.
    #[must_use]
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    /// Entries sorted by field name.
    ///
    /// # Errors
    ///
    /// Returns [`CompileError::DuplicateField`] if a field appears twice.
    pub fn sorted(&self) -> Result<Vec<&FieldEntry>> {
        let mut sorted: Vec<&FieldEntry> = self.entries.iter().collect();
        sorted.sort_by(|a, b| a.field.cmp(&b.field));
        if let Some(pair) = sorted.windows(2).find(|w| w[0].field == w[1].field) {
            return Err(CompileError::DuplicateField(pair[0].field.clone()));
        }
        Ok(sorted)
    }

    pub(crate) fn collect_aliases(&self, set: &mut AliasSet) {
        for entry in &self.entries {
            set.apply(&entry.field);
        }
    }

    fn push(mut self, field: &str, op: FieldOp, value: SqlValue) -> Self {
        self.entries.push(FieldEntry {
            field: String::from(field),
            op,
            value,
        });
        self
    }
}

impl<K: AsRef<str>, V: ToSqlValue> FromIterator<(K, V)> for Fields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |fields, (k, v)| fields.value(k.as_ref(), v))
    }
}

/// Checks an explicit upsert field list against the written fields. An empty
/// list would leave `ON DUPLICATE KEY UPDATE` without assignments.
pub(crate) fn check_upsert_fields<'a>(
    table: &str,
    written: impl IntoIterator<Item = &'a str>,
    requested: &[String],
) -> Result<()> {
    if requested.is_empty() {
        return Err(CompileError::EmptyFieldList(String::from(table)));
    }
    let written: HashSet<&str> = written.into_iter().collect();
    match requested.iter().find(|f| !written.contains(f.as_str())) {
        Some(unknown) => Err(CompileError::InvalidUpsertField(unknown.clone())),
        None => Ok(()),
    }
}
