//! Compile-only tests for core API patterns.
//!
//! These verify that key API surfaces compile correctly. They do NOT
//! execute against a database; they only check types and signatures.

#![allow(dead_code)]

use quarry::{
    plain_sql, window, window_fn, Condition, Connection, Delete, Dialect, Field, Insert,
    QueryResult, RenderSettings, Select, Table, Update, ValueKind, With,
};

fn schema() -> QueryResult<(Table, Table)> {
    let authors = Table::new("authors")?
        .identity("id", ValueKind::Int8)?
        .column("name", ValueKind::Text)?;
    let books = Table::new("books")?
        .identity("id", ValueKind::Int8)?
        .column("title", ValueKind::Text)?
        .column("author_id", ValueKind::Int8)?;
    Ok((authors, books))
}

// ── Statement construction compiles for every statement kind ──────────────

fn build_statements() -> QueryResult<()> {
    let (authors, books) = schema()?;

    let _select = Select::new()
        .field(books.field("title").unwrap())
        .window(
            window_fn("count")
                .arg(books.field("id").unwrap())
                .over(
                    window()
                        .partition_by(books.field("author_id").unwrap())
                        .order_by(books.field("id").unwrap().asc())
                        .rows_between_unbounded_preceding()
                        .and_current_row(),
                )
                .alias("running"),
        )
        .from(&books)
        .filter(books.field("author_id").unwrap().eq(1i64))
        .order_by(books.field("id").unwrap().desc())
        .limit(10);

    let _insert = Insert::into(&books)
        .set("title", "Dune")?
        .set("author_id", 1i64)?
        .returning_identity();

    let _update = Update::table(&books)
        .set("title", "Dune Messiah")?
        .filter(books.field("id").unwrap().eq(1i64))
        .returning_all();

    let _delete = Delete::from(&books)
        .filter(books.field("id").unwrap().in_values(vec![1i64, 2]))
        .returning([books.field("title").unwrap()]);

    let _with = Select::new()
        .with(With::new("recent", Select::new().from(&books).limit(5))?)
        .from_name("recent")?;

    let _division = Select::new().from_division(
        books
            .divide_by(&authors)
            .on(Field::qualified("books", "author_id")?
                .eq_field(&Field::qualified("authors", "id")?))
            .and(plain_sql("authors.name <> ''"))
            .returning([books.field("title").unwrap()])?,
    );

    Ok(())
}

// ── Condition combinators keep the step type chainable ────────────────────

fn build_condition_chain() -> Condition {
    let f = Field::new("a").unwrap();
    f.eq(1i64)
        .and(Field::new("b").unwrap().is_not_null())
        .and_not(false)
        .or(plain_sql("c = ?").bind(3i64))
        .or_not_exists(Select::new())
}

// ── Generic execution functions accept any connection ─────────────────────

async fn run_generic<C: Connection>(conn: &C, table: &Table) -> QueryResult<u64> {
    let mut insert = Insert::into(table).set("title", "x")?.returning_identity();
    let affected = insert.execute(conn).await?;
    let _records = insert.returned_records();
    Ok(affected)
}

// ── Rendering is available without a connection ───────────────────────────

#[test]
fn statements_render_offline() {
    let (_, books) = schema().unwrap();
    let insert = Insert::into(&books)
        .set("title", "Dune")
        .unwrap()
        .returning_identity();
    for dialect in [Dialect::Postgres, Dialect::Mysql, Dialect::Sqlite] {
        assert!(!insert.to_sql(dialect).unwrap().is_empty());
    }
    let _ = RenderSettings::default();
    let _ = build_condition_chain();
}
