//! JSON-producing sources: correlated JSON sub-selects and `JSON_TABLE`.

use super::base::Correlation;
use super::select::Select;
use crate::context::CompileContext;
use crate::error::{CompileError, Result};
use crate::join::AliasSet;

/// A nested select aggregated into one JSON array per outer row.
///
/// The nested select's fields become the keys of a `JSON_OBJECT`, named by
/// their output alias or field name. Rows are tied to the outer row by
/// `inner=outer`, written as the first WHERE term of the nested select.
#[derive(Debug, Clone)]
pub struct JsonSelect {
    name: String,
    query: Select,
    inner: String,
    outer: String,
}

impl JsonSelect {
    /// Creates a sub-select named `name` where `query.inner` equals the
    /// outer statement's `outer` field.
    #[must_use]
    pub fn new(name: &str, query: Select, inner: &str, outer: &str) -> Self {
        Self {
            name: String::from(name),
            query,
            inner: String::from(inner),
            outer: String::from(outer),
        }
    }

    /// Output name of the aggregated column.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn collect_aliases(&self, set: &mut AliasSet) {
        set.apply(&self.outer);
    }

    /// Writes `(<subquery>)` into the enclosing statement.
    pub(crate) fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        let count = self.query.json_field_count();
        if count < 2 {
            return Err(CompileError::InsufficientJsonFields {
                name: self.name.clone(),
                count,
            });
        }

        let outer = if self.outer.contains('.') {
            self.outer.clone()
        } else {
            format!("{}.{}", ctx.base_alias(), self.outer)
        };
        let outer_aliases: Vec<String> = ctx.aliases().map(String::from).collect();
        let correlation = Correlation {
            outer_aliases: &outer_aliases,
            inner: &self.inner,
            outer: &outer,
        };
        let nested = self.query.compile_correlated(&correlation)?;
        ctx.push('(');
        ctx.splice(nested);
        ctx.push(')');
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum JsonSource {
    Document(String),
    KeyValue(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct JsonColumn {
    property: String,
    data_type: String,
    path: String,
}

/// A `JSON_TABLE` row source listed after the base table.
///
/// ```rust
/// use sqlc_core::{Compile, JsonTable, Select};
///
/// let query = Select::new("user")
///     .fields(["id", "tag.name"])
///     .json_table(
///         JsonTable::new("tag")
///             .source("tags", "$[*]")
///             .column("name", "VARCHAR(64)", "$.name"),
///     );
///
/// assert_eq!(
///     query.compile().unwrap().sql,
///     "SELECT u.id, tag.name\nFROM .user u, JSON_TABLE(u.tags, '$[*]' COLUMNS (name VARCHAR(64) PATH '$.name')) tag"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonTable {
    alias: String,
    source: Option<JsonSource>,
    path: String,
    columns: Vec<JsonColumn>,
}

impl JsonTable {
    /// Creates a JSON table known as `alias`.
    #[must_use]
    pub fn new(alias: &str) -> Self {
        Self {
            alias: String::from(alias),
            source: None,
            path: String::from("$"),
            columns: vec![],
        }
    }

    /// Reads rows from the JSON document in `field` at `path`.
    #[must_use]
    pub fn source(mut self, field: &str, path: &str) -> Self {
        self.source = Some(JsonSource::Document(String::from(field)));
        self.path = String::from(path);
        self
    }

    /// Reads rows from the key/value pairs of the object in `field`.
    #[must_use]
    pub fn source_key_value(mut self, field: &str, path: &str) -> Self {
        self.source = Some(JsonSource::KeyValue(String::from(field)));
        self.path = String::from(path);
        self
    }

    /// Adds an output column `property` of `data_type` read from `path`.
    #[must_use]
    pub fn column(mut self, property: &str, data_type: &str, path: &str) -> Self {
        self.columns.push(JsonColumn {
            property: String::from(property),
            data_type: String::from(data_type),
            path: String::from(path),
        });
        self
    }

    /// Alias of the JSON table.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub(crate) fn collect_aliases(&self, set: &mut AliasSet) {
        if let Some(JsonSource::Document(field) | JsonSource::KeyValue(field)) = &self.source {
            set.apply(field);
        }
    }

    /// Writes `, JSON_TABLE(...) alias`. Fails without a source field or
    /// without columns.
    pub(crate) fn write(&self, ctx: &mut CompileContext) -> Result<()> {
        let source = match &self.source {
            Some(source) if !self.columns.is_empty() => source,
            _ => return Err(CompileError::IncompleteJsonTable(self.alias.clone())),
        };
        ctx.push_str(", JSON_TABLE(");
        match source {
            JsonSource::Document(field) => ctx.write_field(field),
            JsonSource::KeyValue(field) => {
                ctx.push_str("JSON_KEY_VALUE(");
                ctx.write_field(field);
                ctx.push_str(", '$')");
            }
        }
        ctx.push_fmt(format_args!(", '{}' COLUMNS (", self.path));
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                ctx.push_str(", ");
            }
            ctx.push_fmt(format_args!(
                "{} {} PATH '{}'",
                column.property, column.data_type, column.path
            ));
        }
        ctx.push_str(")) ");
        ctx.push_str(&self.alias);
        Ok(())
    }
}
