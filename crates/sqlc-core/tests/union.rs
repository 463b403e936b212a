//! UNION output and parameter ordering.

mod common;
use common::*;

use sqlc_core::{CompileError, Select, SqlValue, Union, Where};

fn documents(table: &str, min: i64) -> Select {
    Select::new(table)
        .fields(["id", "number", "total"])
        .where_clause(Where::new().gt_eq("total", min))
}

#[test]
fn union_all_with_outer_clauses() {
    let compiled = compile(
        &Union::all()
            .union(documents("invoice", 10))
            .union(documents("credit_note", 20))
            .fields(["number", "sum|total"])
            .where_clause(Where::new().not_null("number"))
            .group(["number"])
            .order(["number"])
            .limit(10, 20),
    );
    assert_eq!(
        compiled.sql,
        "SELECT number, SUM(total)\nFROM (\nSELECT id, number, total\nFROM .invoice\nWHERE total>=?\nUNION ALL\nSELECT id, number, total\nFROM .credit_note\nWHERE total>=?\n) t\nWHERE number IS NOT NULL\nGROUP BY number\nORDER BY number\nLIMIT 10,20"
    );
    assert_eq!(compiled.params, vec![SqlValue::Int(10), SqlValue::Int(20)]);
}

#[test]
fn union_removes_duplicates_by_default() {
    let compiled = compile(
        &Union::new()
            .union(Select::new("a").fields(["id"]))
            .union(Select::new("b").fields(["id"]))
            .union(Select::new("c").fields(["id"]))
            .distinct(),
    );
    assert_eq!(
        compiled.sql,
        "SELECT DISTINCT *\nFROM (\nSELECT id\nFROM .a\nUNION\nSELECT id\nFROM .b\nUNION\nSELECT id\nFROM .c\n) t"
    );
}

#[test]
fn union_member_with_joins_keeps_its_aliases() {
    let compiled = compile(
        &Union::all()
            .union(
                Select::new("invoice")
                    .fields(["id", "c.name"])
                    .left_join("client", "c", "id", "client_id", None),
            )
            .union(Select::new("quote").fields(["id", "name"])),
    );
    assert_eq!(
        compiled.sql,
        "SELECT *\nFROM (\nSELECT i.id, c.name\nFROM .invoice i\nLEFT JOIN .client c ON c.id=i.client_id\nUNION ALL\nSELECT id, name\nFROM .quote\n) t"
    );
}

#[test]
fn union_needs_two_members() {
    assert_eq!(
        compile_err(&Union::new()),
        CompileError::UnionMemberCount(0)
    );
    assert_eq!(
        compile_err(&Union::all().union(Select::new("a"))),
        CompileError::UnionMemberCount(1)
    );
}
