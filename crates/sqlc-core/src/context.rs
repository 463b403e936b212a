//! Compilation contexts and their reuse pool.
//!
//! A [`CompileContext`] holds the transient state of one compile: the SQL text
//! buffer, the table alias map and the flattened parameter list. Contexts are
//! checked out of a [`ContextPool`] as a [`PooledContext`] guard, which resets
//! the context and hands it back when dropped, whichever way the compile
//! ended.

use std::collections::BTreeMap;
use std::fmt::{self, Write as _};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, OnceLock, PoisonError};

use crate::config::{self, CompilerConfig};
use crate::error::{CompileError, Result};
use crate::join::Join;
use crate::value::SqlValue;
use crate::Compiled;

const ALPHABET: &str = "abcdefghijklmnopqrstuvwxyz";

/// Working state of a single compilation.
#[derive(Debug, Default)]
pub struct CompileContext {
    sql: String,
    params: Vec<SqlValue>,
    tables: BTreeMap<String, String>,
    base_alias: String,
    use_alias: bool,
    schema: String,
}

impl CompileContext {
    /// Creates an empty context using `config`'s schema prefix.
    #[must_use]
    pub fn new(config: &CompilerConfig) -> Self {
        Self {
            schema: config.schema.clone(),
            ..Self::default()
        }
    }

    /// Clears everything written so far. Allocations are kept.
    pub fn reset(&mut self) {
        self.sql.clear();
        self.params.clear();
        self.tables.clear();
        self.base_alias.clear();
        self.use_alias = false;
    }

    /// SQL written so far.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Parameters bound so far.
    #[must_use]
    pub fn params(&self) -> &[SqlValue] {
        &self.params
    }

    /// Alias assigned to the base table, empty when aliases are off.
    #[must_use]
    pub fn base_alias(&self) -> &str {
        &self.base_alias
    }

    /// Whether fields are written alias-qualified.
    #[must_use]
    pub const fn use_alias(&self) -> bool {
        self.use_alias
    }

    /// Every alias taken in this statement, reserved ones included.
    pub(crate) fn aliases(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Table registered under `alias`.
    #[must_use]
    pub fn table_of(&self, alias: &str) -> Option<&str> {
        self.tables.get(alias).map(String::as_str)
    }

    /// Assigns aliases for a statement on `table` with `joins`.
    ///
    /// Join aliases are taken as declared. The base table gets `requested`
    /// (default: the first character of its name) or, if that is taken, the
    /// first free letter of `a..=z`. Without joins and without `force` no
    /// aliases are used at all. `reserved` aliases (the enclosing statement's
    /// for correlated sub-selects, JSON table aliases) are never handed out.
    pub(crate) fn assign_aliases(
        &mut self,
        table: &str,
        requested: Option<&str>,
        joins: &[Join],
        force: bool,
        reserved: &[&str],
    ) -> Result<()> {
        self.tables.clear();
        self.base_alias.clear();
        self.use_alias = force || !joins.is_empty();
        if !self.use_alias {
            return Ok(());
        }

        for alias in reserved {
            self.tables.insert(String::from(*alias), String::new());
        }
        for join in joins {
            if self.tables.contains_key(join.alias()) {
                return Err(CompileError::JoinAliasCollision {
                    alias: String::from(join.alias()),
                    table: String::from(join.table()),
                });
            }
            self.tables
                .insert(String::from(join.alias()), String::from(join.table()));
        }

        let mut alias = match requested {
            Some(alias) => String::from(alias),
            None => table.chars().next().map(String::from).unwrap_or_default(),
        };
        if alias.is_empty() || self.tables.contains_key(&alias) {
            alias = ALPHABET
                .chars()
                .map(String::from)
                .find(|c| !self.tables.contains_key(c))
                .ok_or_else(|| CompileError::AliasExhausted(String::from(table)))?;
        }
        self.tables.insert(alias.clone(), String::from(table));
        self.base_alias = alias;
        Ok(())
    }

    /// Writes a field, qualified with the base alias when aliases are in use
    /// and the field is not already qualified.
    pub fn write_field(&mut self, field: &str) {
        if self.use_alias && !field.contains('.') {
            self.sql.push_str(&self.base_alias);
            self.sql.push('.');
        }
        self.sql.push_str(field);
    }

    /// Writes a schema-qualified table reference.
    pub fn write_table(&mut self, table: &str) {
        self.sql.push_str(&self.schema);
        self.sql.push('.');
        self.sql.push_str(table);
    }

    /// Writes the base table alias, if aliases are in use, preceded by a
    /// space.
    pub(crate) fn write_base_alias(&mut self) {
        if self.use_alias {
            self.sql.push(' ');
            self.sql.push_str(&self.base_alias);
        }
    }

    /// Writes a placeholder and binds `value` to it.
    pub fn bind(&mut self, value: SqlValue) {
        self.sql.push('?');
        self.params.push(value);
    }

    /// Writes `count` comma-separated placeholders.
    pub(crate) fn placeholders(&mut self, count: usize) {
        for i in 0..count {
            if i > 0 {
                self.sql.push(',');
            }
            self.sql.push('?');
        }
    }

    /// Binds values without writing placeholders.
    pub(crate) fn extend_params<I: IntoIterator<Item = SqlValue>>(&mut self, values: I) {
        self.params.extend(values);
    }

    /// Splices a nested statement's SQL and parameters at the current
    /// position.
    pub(crate) fn splice(&mut self, nested: Compiled) {
        self.sql.push_str(&nested.sql);
        self.params.extend(nested.params);
    }

    pub(crate) fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    pub(crate) fn push_str(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub(crate) fn push_fmt(&mut self, args: fmt::Arguments<'_>) {
        // Writing to a String cannot fail
        let _ = self.sql.write_fmt(args);
    }

    /// Copies the finished statement out. Trailing line breaks are dropped.
    pub(crate) fn finish(&self) -> Compiled {
        Compiled {
            sql: String::from(self.sql.trim_end_matches('\n')),
            params: self.params.clone(),
        }
    }

    fn shrink_to(&mut self, max_bytes: usize) {
        if self.sql.capacity() > max_bytes {
            self.sql.shrink_to(max_bytes);
        }
        if self.params.capacity() > max_bytes / 8 {
            self.params.shrink_to(max_bytes / 8);
        }
    }
}

/// Pool of idle compilation contexts.
#[derive(Debug)]
pub struct ContextPool {
    idle: Mutex<Vec<CompileContext>>,
    config: CompilerConfig,
}

impl ContextPool {
    /// Creates an empty pool for `config`.
    #[must_use]
    pub fn new(config: CompilerConfig) -> Self {
        Self {
            idle: Mutex::new(Vec::with_capacity(config.pool_capacity)),
            config,
        }
    }

    /// Takes an idle context, or creates one when none is left.
    pub fn checkout(&self) -> PooledContext<'_> {
        let reused = self.lock().pop();
        tracing::trace!(reused = reused.is_some(), "checked out compile context");
        let ctx = reused.unwrap_or_else(|| CompileContext::new(&self.config));
        PooledContext {
            ctx,
            pool: self,
        }
    }

    /// Number of idle contexts.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.lock().len()
    }

    fn release(&self, mut ctx: CompileContext) {
        ctx.reset();
        ctx.shrink_to(self.config.max_retained_bytes);
        let mut idle = self.lock();
        if idle.len() < self.config.pool_capacity {
            idle.push(ctx);
            tracing::trace!(idle = idle.len(), "returned compile context");
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<CompileContext>> {
        // The idle list stays consistent even if a holder panicked
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive handle on a pooled context. Returns it to the pool on drop.
#[derive(Debug)]
pub struct PooledContext<'a> {
    ctx: CompileContext,
    pool: &'a ContextPool,
}

impl Deref for PooledContext<'_> {
    type Target = CompileContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.ctx
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.ctx));
    }
}

/// The process-wide pool, sized from [`config::current`].
pub fn global() -> &'static ContextPool {
    static POOL: OnceLock<ContextPool> = OnceLock::new();
    POOL.get_or_init(|| ContextPool::new(config::current().clone()))
}

/// Runs `write` on a pooled context and returns the finished statement.
pub(crate) fn compile_with(
    kind: &'static str,
    table: &str,
    write: impl FnOnce(&mut CompileContext) -> Result<()>,
) -> Result<Compiled> {
    let mut ctx = global().checkout();
    match write(&mut ctx) {
        Ok(()) => {
            let compiled = ctx.finish();
            tracing::debug!(
                kind,
                table,
                sql = %compiled.sql,
                params = compiled.params.len(),
                "compiled statement"
            );
            Ok(compiled)
        }
        Err(err) => {
            tracing::warn!(kind, table, error = %err, "statement failed to compile");
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::join::JoinMode;

    fn join(alias: &str) -> Join {
        Join::new(JoinMode::Left, "other", alias, "id", "other_id", None)
    }

    #[test]
    fn test_no_joins_no_alias() {
        let mut ctx = CompileContext::default();
        ctx.assign_aliases("user", None, &[], false, &[]).unwrap();
        assert!(!ctx.use_alias());
        ctx.write_field("email");
        assert_eq!(ctx.sql(), "email");
    }

    #[test]
    fn test_base_alias_defaults_to_first_letter() {
        let mut ctx = CompileContext::default();
        ctx.assign_aliases("user", None, &[join("c")], false, &[])
            .unwrap();
        assert_eq!(ctx.base_alias(), "u");
        assert_eq!(ctx.table_of("c"), Some("other"));
        ctx.write_field("email");
        ctx.push(' ');
        ctx.write_field("c.timeout");
        assert_eq!(ctx.sql(), "u.email c.timeout");
    }

    #[test]
    fn test_base_alias_collision_scans_alphabet() {
        let mut ctx = CompileContext::default();
        ctx.assign_aliases("user", None, &[join("u"), join("a")], false, &[])
            .unwrap();
        assert_eq!(ctx.base_alias(), "b");
    }

    #[test]
    fn test_requested_and_reserved_alias() {
        let mut ctx = CompileContext::default();
        ctx.assign_aliases("user", Some("x"), &[], true, &[]).unwrap();
        assert_eq!(ctx.base_alias(), "x");

        ctx.assign_aliases("user", None, &[], true, &["u"]).unwrap();
        assert_eq!(ctx.base_alias(), "a");
    }

    #[test]
    fn test_join_alias_collision() {
        let mut ctx = CompileContext::default();
        let err = ctx
            .assign_aliases("user", None, &[join("c"), join("c")], false, &[])
            .unwrap_err();
        assert_eq!(
            err,
            CompileError::JoinAliasCollision {
                alias: String::from("c"),
                table: String::from("other"),
            }
        );
    }

    #[test]
    fn test_alias_exhausted() {
        let joins: Vec<Join> = ALPHABET.chars().map(|c| join(&c.to_string())).collect();
        let mut ctx = CompileContext::default();
        let err = ctx
            .assign_aliases("user", None, &joins, false, &[])
            .unwrap_err();
        assert_eq!(err, CompileError::AliasExhausted(String::from("user")));
    }

    #[test]
    fn test_pool_reuses_and_resets() {
        let pool = ContextPool::new(CompilerConfig::new().pool_capacity(1));
        {
            let mut ctx = pool.checkout();
            ctx.push_str("SELECT 1");
            ctx.bind(SqlValue::Int(1));
        }
        assert_eq!(pool.idle(), 1);
        let ctx = pool.checkout();
        assert_eq!(pool.idle(), 0);
        assert!(ctx.sql().is_empty());
        assert!(ctx.params().is_empty());
    }

    #[test]
    fn test_pool_capacity_bound() {
        let pool = ContextPool::new(CompilerConfig::new().pool_capacity(1));
        let first = pool.checkout();
        let second = pool.checkout();
        drop(first);
        drop(second);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_pool_release_on_error_path() {
        fn failing(pool: &ContextPool) -> Result<()> {
            let mut ctx = pool.checkout();
            ctx.push_str("partial");
            Err(CompileError::NoRows(String::from("user")))
        }
        let pool = ContextPool::new(CompilerConfig::new());
        assert!(failing(&pool).is_err());
        assert_eq!(pool.idle(), 1);
        assert!(pool.checkout().sql().is_empty());
    }

    #[test]
    fn test_schema_prefix() {
        let mut ctx = CompileContext::new(&CompilerConfig::new().schema("app"));
        ctx.write_table("user");
        assert_eq!(ctx.sql(), "app.user");
    }
}
