//! Tests for SELECT statements: select lists and functions, WHERE trees,
//! grouping, ordering, pagination, locking, subqueries and JSON sources.

mod common;
use common::*;

use sqlc_core::{CompileError, JsonTable, Operator, Select, SelectField, SqlValue, Where};

#[test]
fn select_with_limit() {
    let compiled = compile(
        &Select::new("user")
            .fields(["id", "email"])
            .where_clause(Where::new().eq("email", "x"))
            .limit(0, 10),
    );
    assert_eq!(
        compiled.sql,
        "SELECT id, email\nFROM .user\nWHERE email=?\nLIMIT 0,10"
    );
    assert_eq!(compiled.params, vec![text("x")]);
}

#[test]
fn select_functions_and_aliases() {
    let compiled = compile(
        &Select::new("invoice")
            .fields(["client_id", "count|id invoices", "sum_zero|total revenue"])
            .field(SelectField::new("total").with_function("max").with_alias("largest"))
            .group(["client_id"])
            .order(["revenue DESC"]),
    );
    assert_eq!(
        compiled.sql,
        "SELECT client_id, COUNT(id) invoices, IFNULL(SUM(total), 0) revenue, MAX(total) largest\nFROM .invoice\nGROUP BY client_id\nORDER BY revenue DESC"
    );
}

#[test]
fn select_distinct_for_update() {
    let compiled = compile(
        &Select::new("stock")
            .distinct()
            .fields(["sku"])
            .where_clause(Where::new().gt("quantity", 0))
            .read_lock(),
    );
    assert_eq!(
        compiled.sql,
        "SELECT DISTINCT sku\nFROM .stock\nWHERE quantity>?\nFOR UPDATE"
    );
}

#[test]
fn select_by_id_with_filter() {
    let compiled = compile(
        &Select::by_id("user", 12)
            .fields(["email"])
            .where_clause(Where::new().not_null("verified")),
    );
    assert_eq!(
        compiled.sql,
        "SELECT email\nFROM .user\nWHERE id=12 AND verified IS NOT NULL"
    );
    assert!(compiled.params.is_empty());
}

#[test]
fn where_tree_emission_order() {
    let compiled = compile(
        &Select::new("user").fields(["id"]).where_clause(
            Where::new()
                .wrap(Where::new().eq("tenant_id", 1))
                .between("created", 10, 20)
                .in_list("role", vec!["admin", "owner"])
                .or_group(Where::new().null("banned").lt("banned", 5))
                .or_group(Where::new().eq("x", 1).eq("y", 2)),
        ),
    );
    assert_eq!(
        compiled.sql,
        "SELECT id\nFROM .user\nWHERE tenant_id=? AND created BETWEEN ? AND ? AND role IN (?,?) AND (banned IS NULL OR banned<?) AND (x=? OR y=?)"
    );
    assert_eq!(
        compiled.params,
        vec![
            SqlValue::Int(1),
            SqlValue::Int(10),
            SqlValue::Int(20),
            text("admin"),
            text("owner"),
            SqlValue::Int(5),
            SqlValue::Int(1),
            SqlValue::Int(2),
        ]
    );
}

#[test]
fn eqs_sorted_by_field() {
    let compiled = compile(
        &Select::new("user")
            .fields(["id"])
            .where_clause(Where::new().eqs([("status", "active"), ("country", "DK")])),
    );
    assert_eq!(
        compiled.sql,
        "SELECT id\nFROM .user\nWHERE country=? AND status=?"
    );
    assert_eq!(compiled.params, vec![text("DK"), text("active")]);
}

#[test]
fn incompatible_operators() {
    let err = compile_err(
        &Select::new("user").where_clause(Where::new().eq("x", 1).gt("x", 2)),
    );
    assert_eq!(
        err,
        CompileError::IncompatibleOperator {
            field: String::from("x"),
            current: Operator::Eq,
            new: Operator::Gt,
        }
    );

    compile(&Select::new("user").where_clause(Where::new().gt("x", 1).lt("x", 2)));

    let err = compile_err(
        &Select::new("user").where_clause(Where::new().gt("x", 1).gt("x", 2)),
    );
    assert!(matches!(err, CompileError::IncompatibleOperator { .. }));
}

#[test]
fn null_then_not_null_rejected() {
    let err = compile_err(
        &Select::new("user").where_clause(Where::new().null("deleted").not_null("deleted")),
    );
    assert_eq!(
        err.to_string(),
        "where clause operator incompatible on same field (deleted): IS NULL IS NOT NULL"
    );
}

#[test]
fn empty_in_list_rejected() {
    let err = compile_err(
        &Select::new("user").where_clause(Where::new().not_in_list::<u64>("id", vec![])),
    );
    assert_eq!(
        err,
        CompileError::EmptyInList {
            field: String::from("id"),
            operator: Operator::NotIn,
        }
    );
}

#[test]
fn in_subquery_params_at_position() {
    let banned = Select::new("ban")
        .fields(["user_id"])
        .where_clause(Where::new().gt("until", 500));
    let compiled = compile(
        &Select::new("user")
            .fields(["id"])
            .where_clause(
                Where::new()
                    .eq("active", true)
                    .in_subquery("id", banned)
                    .lt("age", 65),
            )
            .limit(0, 20),
    );
    assert_eq!(
        compiled.sql,
        "SELECT id\nFROM .user\nWHERE active=? AND id IN (SELECT user_id\nFROM .ban\nWHERE until>?) AND age<?\nLIMIT 0,20"
    );
    assert_eq!(
        compiled.params,
        vec![SqlValue::Bool(true), SqlValue::Int(500), SqlValue::Int(65)]
    );
}

#[test]
fn correlated_json_select() {
    let lines = Select::new("invoice_line")
        .fields(["description", "amount total"])
        .order(["position"]);
    let compiled = compile(
        &Select::new("invoice")
            .fields(["id", "number"])
            .json_select("lines", lines, "invoice_id", "id")
            .where_clause(Where::new().eq("client_id", 4)),
    );
    assert_eq!(
        compiled.sql,
        "SELECT i.id, i.number, (SELECT JSON_ARRAYAGG(JSON_OBJECT('description', a.description, 'total', a.amount))\nFROM .invoice_line a\nWHERE a.invoice_id=i.id\nORDER BY a.position) lines\nFROM .invoice i\nWHERE i.client_id=?"
    );
    assert_eq!(compiled.params, vec![SqlValue::Int(4)]);
}

#[test]
fn correlated_json_select_on_joined_field() {
    let contacts = Select::new("contact").fields(["name", "phone"]);
    let compiled = compile(
        &Select::new("user")
            .fields(["id"])
            .left_join("client", "c", "id", "client_id", None)
            .json_select("contacts", contacts, "client_id", "c.id"),
    );
    assert_eq!(
        compiled.sql,
        "SELECT u.id, (SELECT JSON_ARRAYAGG(JSON_OBJECT('name', a.name, 'phone', a.phone))\nFROM .contact a\nWHERE a.client_id=c.id) contacts\nFROM .user u\nLEFT JOIN .client c ON c.id=u.client_id"
    );
}

#[test]
fn json_select_needs_two_fields() {
    let err = compile_err(&Select::new("invoice").fields(["id"]).json_select(
        "lines",
        Select::new("invoice_line").fields(["amount"]),
        "invoice_id",
        "id",
    ));
    assert_eq!(
        err,
        CompileError::InsufficientJsonFields {
            name: String::from("lines"),
            count: 1,
        }
    );
}

#[test]
fn json_table_source() {
    let compiled = compile(
        &Select::new("product")
            .fields(["id", "attr.k", "attr.v"])
            .json_table(
                JsonTable::new("attr")
                    .source_key_value("attributes", "$[*]")
                    .column("k", "VARCHAR(64)", "$.key")
                    .column("v", "VARCHAR(255)", "$.value"),
            )
            .where_clause(Where::new().eq("attr.k", "color")),
    );
    assert_eq!(
        compiled.sql,
        "SELECT p.id, attr.k, attr.v\nFROM .product p, JSON_TABLE(JSON_KEY_VALUE(p.attributes, '$'), '$[*]' COLUMNS (k VARCHAR(64) PATH '$.key', v VARCHAR(255) PATH '$.value')) attr\nWHERE attr.k=?"
    );
}

#[test]
fn json_table_without_source_or_columns_rejected() {
    let err = compile_err(&Select::new("user").fields(["id"]).json_table(JsonTable::new("j")));
    assert_eq!(err, CompileError::IncompleteJsonTable(String::from("j")));

    let err = compile_err(
        &Select::new("user")
            .fields(["id"])
            .json_table(JsonTable::new("j").source("tags", "$[*]")),
    );
    assert_eq!(err, CompileError::IncompleteJsonTable(String::from("j")));
}
