//! INSERT statement.

use crate::connection::Connection;
use crate::cte::With;
use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Field, PlainSql};
use crate::ident::Ident;
use crate::render::{render, QueryPart, RenderContext, RenderSettings};
use crate::row::{RecordSet, Row};
use crate::table::Table;
use crate::value::{IntoValue, Value};

use super::returning::{execute_dml, DmlPlan};
use super::render_returning;

/// A column value in an INSERT or UPDATE.
#[derive(Debug, Clone)]
pub(crate) enum DmlValue {
    /// Bound value.
    Value(Value),
    /// Raw SQL expression (e.g. `now()`), caller-guaranteed.
    Plain(PlainSql),
}

impl QueryPart for DmlValue {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        match self {
            DmlValue::Value(v) => {
                ctx.bind(v.clone());
                Ok(())
            }
            DmlValue::Plain(p) => ctx.visit(p),
        }
    }
}

/// An INSERT statement with optional multi-row values, conflict-ignore, and
/// returning fields.
///
/// ```ignore
/// let mut insert = Insert::into(&books)
///     .set("title", "Dune")?
///     .returning([books.field("id").unwrap()]);
/// let affected = insert.execute(&conn).await?;
/// let id: i64 = insert.returned_record().unwrap().get("id")?;
/// ```
#[derive(Debug, Clone)]
pub struct Insert {
    table: Table,
    with: Option<With>,
    columns: Vec<Ident>,
    rows: Vec<Vec<DmlValue>>,
    ignore_conflicts: bool,
    returning: Vec<Field>,
    returned: Option<RecordSet>,
    settings: RenderSettings,
}

impl Insert {
    /// Start an INSERT into the given table.
    pub fn into(table: &Table) -> Self {
        Self {
            table: table.clone(),
            with: None,
            columns: Vec::new(),
            rows: Vec::new(),
            ignore_conflicts: false,
            returning: Vec::new(),
            returned: None,
            settings: RenderSettings::default(),
        }
    }

    /// Prepend a WITH clause.
    pub fn with(mut self, with: With) -> Self {
        self.with = Some(with);
        self
    }

    /// Set a column value on the (single) values row.
    pub fn set(self, column: &str, value: impl IntoValue) -> QueryResult<Self> {
        self.set_dml(column, DmlValue::Value(value.into_value()))
    }

    /// Set a column to a raw SQL expression on the (single) values row.
    pub fn set_raw(self, column: &str, expr: PlainSql) -> QueryResult<Self> {
        self.set_dml(column, DmlValue::Plain(expr))
    }

    fn set_dml(mut self, column: &str, value: DmlValue) -> QueryResult<Self> {
        if self.rows.len() > 1 {
            return Err(QueryError::validation(
                "Insert: cannot mix set() with multi-row values()",
            ));
        }
        self.columns.push(Ident::parse(column)?);
        if self.rows.is_empty() {
            self.rows.push(Vec::new());
        }
        self.rows[0].push(value);
        Ok(self)
    }

    /// Declare the column list for multi-row inserts.
    pub fn columns(
        mut self,
        columns: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> QueryResult<Self> {
        if !self.columns.is_empty() {
            return Err(QueryError::validation(
                "Insert: columns() cannot follow set() or a prior columns()",
            ));
        }
        for c in columns {
            self.columns.push(Ident::parse(c.as_ref())?);
        }
        Ok(self)
    }

    /// Append one values row (lengths are checked at execute time).
    pub fn values<V: IntoValue>(mut self, row: impl IntoIterator<Item = V>) -> Self {
        self.rows.push(
            row.into_iter()
                .map(|v| DmlValue::Value(v.into_value()))
                .collect(),
        );
        self
    }

    /// Skip rows that collide with an existing key instead of failing.
    pub fn ignore_conflicts(mut self) -> Self {
        self.ignore_conflicts = true;
        self
    }

    /// Request returning fields, replacing any previous request. Ordering is
    /// preserved and determines result-row column order.
    pub fn returning(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.returning = fields.into_iter().collect();
        self
    }

    /// Request just the table's identity column. A table without an identity
    /// column leaves the request empty.
    pub fn returning_identity(mut self) -> Self {
        self.returning = self
            .table
            .identity_column()
            .map(|c| vec![Field::new(c.ident().clone()).expect("column idents are valid")])
            .unwrap_or_default();
        self
    }

    /// Request all declared columns.
    pub fn returning_all(mut self) -> Self {
        self.returning = self.table.fields();
        self
    }

    /// Override the default formatting settings.
    pub fn render_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    fn validate(&self) -> QueryResult<()> {
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(QueryError::validation(format!(
                    "Insert: row {} has {} values for {} columns",
                    i,
                    row.len(),
                    self.columns.len()
                )));
            }
        }
        Ok(())
    }

    /// Render for a dialect (debugging helper).
    pub fn to_sql(&self, dialect: Dialect) -> QueryResult<String> {
        self.validate()?;
        Ok(render(dialect, self.settings, self)?.0)
    }

    /// Execute against a connection; returns the affected-row count.
    ///
    /// When returning fields were requested, the resolved rows become
    /// available through [`Insert::returned_records`] afterwards. Any
    /// backend failure propagates unchanged.
    pub async fn execute(&mut self, conn: &impl Connection) -> QueryResult<u64> {
        self.validate()?;
        let (sql, params) = render(conn.dialect(), self.settings, &*self)?;
        let (affected, returned) = execute_dml(
            conn,
            sql,
            params,
            DmlPlan {
                table: &self.table,
                returning: &self.returning,
                settings: self.settings,
            },
        )
        .await?;
        if let Some(set) = returned {
            self.returned = Some(set);
        }
        Ok(affected)
    }

    /// The resolved returning rows. Empty until a successful execution with
    /// a non-empty returning request.
    pub fn returned_records(&mut self) -> &RecordSet {
        let returning = &self.returning;
        self.returned.get_or_insert_with(|| {
            RecordSet::empty(
                returning
                    .iter()
                    .map(|f| f.name().to_string())
                    .collect::<Vec<_>>()
                    .into(),
            )
        })
    }

    /// The first resolved returning row, if any.
    pub fn returned_record(&mut self) -> Option<Row> {
        self.returned_records().first().cloned()
    }
}

impl QueryPart for Insert {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        if let Some(with) = &self.with {
            ctx.visit(with)?;
            ctx.separator();
        }

        let dialect = ctx.dialect();
        if self.ignore_conflicts
            && matches!(dialect, Dialect::Mysql | Dialect::Mariadb)
        {
            ctx.keyword("insert ignore into").separator();
        } else {
            if self.ignore_conflicts && !dialect.supports_insert_ignore() {
                return Err(ctx.unsupported("conflict-ignore insert"));
            }
            ctx.keyword("insert into").separator();
        }
        ctx.ident(self.table.name());

        if self.columns.is_empty() {
            // No assignments at all: insert one all-defaults row.
            match dialect {
                Dialect::Mysql | Dialect::Mariadb => {
                    ctx.sql(" () ").keyword("values").sql(" ()");
                }
                _ => {
                    ctx.separator().keyword("default values");
                }
            }
        } else {
            ctx.sql(" (");
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    ctx.sql(", ");
                }
                ctx.ident(column);
            }
            ctx.sql(") ").keyword("values").separator();
            for (i, row) in self.rows.iter().enumerate() {
                if i > 0 {
                    ctx.sql(", ");
                }
                ctx.sql("(");
                ctx.visit_list(row, ", ")?;
                ctx.sql(")");
            }
        }

        if self.ignore_conflicts
            && matches!(dialect, Dialect::Postgres | Dialect::Sqlite)
        {
            ctx.separator().keyword("on conflict do nothing");
        }

        render_returning(ctx, &self.returning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;

    fn books() -> Table {
        Table::new("books")
            .unwrap()
            .identity("id", ValueKind::Int8)
            .unwrap()
            .column("title", ValueKind::Text)
            .unwrap()
            .column("author_id", ValueKind::Int8)
            .unwrap()
    }

    #[test]
    fn simple_insert() {
        let t = books();
        let insert = Insert::into(&t)
            .set("title", "Dune")
            .unwrap()
            .set("author_id", 3i64)
            .unwrap();
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO books (title, author_id) VALUES ($1, $2)"
        );
        assert_eq!(
            insert.to_sql(Dialect::Mysql).unwrap(),
            "INSERT INTO books (title, author_id) VALUES (?, ?)"
        );
    }

    #[test]
    fn returning_clause_only_on_native_backends() {
        let t = books();
        let insert = Insert::into(&t)
            .set("title", "Dune")
            .unwrap()
            .returning_identity();
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO books (title) VALUES ($1) RETURNING id"
        );
        // Generated-keys and requery backends resolve out of band.
        assert_eq!(
            insert.to_sql(Dialect::Mysql).unwrap(),
            "INSERT INTO books (title) VALUES (?)"
        );
        assert_eq!(
            insert.to_sql(Dialect::Sqlite).unwrap(),
            "INSERT INTO books (title) VALUES (?)"
        );
    }

    #[test]
    fn empty_returning_set_renders_no_clause() {
        let t = books();
        let insert = Insert::into(&t).set("title", "Dune").unwrap();
        let sql = insert.to_sql(Dialect::Postgres).unwrap();
        assert!(!sql.contains("RETURNING"));
    }

    #[test]
    fn multi_row_insert() {
        let t = books();
        let insert = Insert::into(&t)
            .columns(["title", "author_id"])
            .unwrap()
            .values(["Dune".into_value(), 1i64.into_value()])
            .values(["Hyperion".into_value(), 2i64.into_value()]);
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO books (title, author_id) VALUES ($1, $2), ($3, $4)"
        );
    }

    #[test]
    fn row_length_mismatch_is_rejected() {
        let t = books();
        let insert = Insert::into(&t)
            .columns(["title", "author_id"])
            .unwrap()
            .values(["Dune".into_value()]);
        assert!(insert.to_sql(Dialect::Postgres).is_err());
    }

    #[test]
    fn default_values_per_dialect() {
        let t = books();
        let insert = Insert::into(&t);
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO books DEFAULT VALUES"
        );
        assert_eq!(
            insert.to_sql(Dialect::Mysql).unwrap(),
            "INSERT INTO books () VALUES ()"
        );
    }

    #[test]
    fn conflict_ignore_per_dialect() {
        let t = books();
        let insert = Insert::into(&t)
            .set("title", "Dune")
            .unwrap()
            .ignore_conflicts();
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO books (title) VALUES ($1) ON CONFLICT DO NOTHING"
        );
        assert_eq!(
            insert.to_sql(Dialect::Mysql).unwrap(),
            "INSERT IGNORE INTO books (title) VALUES (?)"
        );
        let err = insert.to_sql(Dialect::Derby).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported { .. }));
    }

    #[test]
    fn raw_value_expression() {
        let t = Table::new("events")
            .unwrap()
            .column("name", ValueKind::Text)
            .unwrap()
            .column("at", ValueKind::TimestampTz)
            .unwrap();
        let insert = Insert::into(&t)
            .set("name", "deploy")
            .unwrap()
            .set_raw("at", crate::expr::plain_sql("now()"))
            .unwrap();
        assert_eq!(
            insert.to_sql(Dialect::Postgres).unwrap(),
            "INSERT INTO events (name, at) VALUES ($1, now())"
        );
    }

    #[test]
    fn returning_identity_without_identity_is_empty() {
        let t = Table::new("plain")
            .unwrap()
            .column("x", ValueKind::Int4)
            .unwrap();
        let insert = Insert::into(&t)
            .set("x", 1i32)
            .unwrap()
            .returning_identity();
        let sql = insert.to_sql(Dialect::Postgres).unwrap();
        assert!(!sql.contains("RETURNING"));
    }
}
