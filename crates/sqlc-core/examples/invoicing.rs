//! Invoicing queries
//!
//! Compiles the statements a small invoicing backend issues:
//! - Listing invoices with their client and lines as JSON
//! - Upserting a ledger of accounts
//! - Marking overdue invoices
//! - Purging orphaned drafts
//!
//! Run with: `RUST_LOG=sqlc_core=debug cargo run --example invoicing`

use sqlc_core::{
    sql_debug, BulkInsert, Compile, Delete, Fields, JoinOn, Select, Union, Update, Where,
};

fn invoice_listing(company_id: u64) -> Select {
    let lines = Select::new("invoice_line")
        .fields(["description", "quantity", "unit_price"])
        .order(["position"]);

    Select::new("invoice")
        .fields(["id", "number", "total", "c.name client"])
        .left_join(
            "client",
            "c",
            "id",
            "client_id",
            Some(JoinOn::new().field("company_id", "company_id")),
        )
        .left_join("currency", "cur", "code", "currency", None)
        .optimize_joins()
        .json_select("lines", lines, "invoice_id", "id")
        .where_clause(
            Where::new()
                .eq("company_id", company_id)
                .in_list("status", vec!["sent", "overdue"])
                .or_group(Where::new().null("c.deleted").gt("c.deleted", 1_700_000_000)),
        )
        .order(["number DESC"])
        .limit(0, 50)
}

fn open_documents() -> Union {
    let member = |table: &str| {
        Select::new(table)
            .fields(["id", "number", "total"])
            .where_clause(Where::new().null("paid"))
    };
    Union::all()
        .union(member("invoice"))
        .union(member("credit_note"))
        .fields(["number", "sum|total"])
        .group(["number"])
}

fn ledger() -> BulkInsert {
    [(1000, "Cash"), (1100, "Bank"), (4000, "Revenue")]
        .into_iter()
        .fold(BulkInsert::new("account"), |insert, (number, name)| {
            insert.row(
                Fields::new()
                    .value("account_number", number)
                    .value("name", name),
            )
        })
        .update_duplicate_fields(["name"])
}

fn mark_overdue(today: i64) -> Update {
    Update::new("invoice")
        .value("status", "overdue")
        .add("reminders", 1)
        .where_clause(Where::new().eq("status", "sent").lt("due", today))
}

fn purge_drafts() -> Delete {
    Delete::new("invoice")
        .left_join("client", "c", "id", "client_id", None)
        .where_clause(Where::new().eq("status", "draft").null("c.id"))
}

fn show(title: &str, statement: &dyn Compile) {
    println!("-- {title}");
    match statement.compile() {
        Ok(compiled) => {
            println!("{}", compiled.sql);
            println!("-- {} parameter(s)", compiled.params.len());
            println!("-- debug: {}", sql_debug(statement).replace('\n', " "));
        }
        Err(err) => println!("-- error: {err}"),
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    show("invoice listing", &invoice_listing(7));
    show("open documents", &open_documents());
    show("ledger", &ledger());
    show("mark overdue", &mark_overdue(1_760_000_000));
    show("purge drafts", &purge_drafts());
}
