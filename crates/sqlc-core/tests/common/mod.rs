#![allow(dead_code)]

use std::sync::Once;

use sqlc_core::{Compile, CompileError, Compiled, SqlValue};

/// Installs a test subscriber once per test binary so `RUST_LOG` shows the
/// compiler's debug output.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_test_writer()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

pub fn compile(statement: &impl Compile) -> Compiled {
    init_tracing();
    let compiled = statement
        .compile()
        .unwrap_or_else(|e| panic!("Failed to compile: {e}"));
    assert_placeholders_match(&compiled);
    compiled
}

pub fn compile_err(statement: &impl Compile) -> CompileError {
    init_tracing();
    match statement.compile() {
        Ok(compiled) => panic!("Expected compile error, got:\n{}", compiled.sql),
        Err(err) => err,
    }
}

/// Every placeholder must have exactly one parameter.
pub fn assert_placeholders_match(compiled: &Compiled) {
    let placeholders = compiled.sql.matches('?').count();
    assert_eq!(
        placeholders,
        compiled.params.len(),
        "placeholder/parameter mismatch in:\n{}",
        compiled.sql
    );
}

/// Compiles twice and checks both runs agree.
pub fn assert_deterministic(statement: &impl Compile) {
    let first = compile(statement);
    let second = compile(statement);
    assert_eq!(first, second);
}

pub fn text(s: &str) -> SqlValue {
    SqlValue::Text(String::from(s))
}
