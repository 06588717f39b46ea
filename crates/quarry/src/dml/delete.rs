//! DELETE statement.

use crate::connection::Connection;
use crate::cte::With;
use crate::dialect::Dialect;
use crate::error::QueryResult;
use crate::expr::{Condition, Field, IntoCondition};
use crate::render::{render, QueryPart, RenderContext, RenderSettings};
use crate::row::{RecordSet, Row};
use crate::table::Table;

use super::returning::{execute_dml, DmlPlan};
use super::render_returning;

/// A DELETE statement with a WHERE tree and returning fields.
///
/// A DELETE without a WHERE clause renders verbatim and removes every row.
#[derive(Debug, Clone)]
pub struct Delete {
    table: Table,
    with: Option<With>,
    filter: Option<Condition>,
    returning: Vec<Field>,
    returned: Option<RecordSet>,
    settings: RenderSettings,
}

impl Delete {
    /// Start a DELETE from the given table.
    pub fn from(table: &Table) -> Self {
        Self {
            table: table.clone(),
            with: None,
            filter: None,
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

    /// AND a condition into the WHERE clause.
    pub fn filter(mut self, cond: impl IntoCondition) -> Self {
        let cond = cond.into_condition();
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(cond),
            None => cond,
        });
        self
    }

    /// Request returning fields, replacing any previous request.
    pub fn returning(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.returning = fields.into_iter().collect();
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

    /// Render for a dialect (debugging helper).
    pub fn to_sql(&self, dialect: Dialect) -> QueryResult<String> {
        Ok(render(dialect, self.settings, self)?.0)
    }

    /// Execute against a connection; returns the affected-row count.
    pub async fn execute(&mut self, conn: &impl Connection) -> QueryResult<u64> {
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

impl QueryPart for Delete {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        if let Some(with) = &self.with {
            ctx.visit(with)?;
            ctx.separator();
        }

        ctx.keyword("delete from").separator();
        ctx.ident(self.table.name());

        if let Some(cond) = &self.filter {
            ctx.separator().keyword("where").separator();
            ctx.visit(cond)?;
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
    }

    #[test]
    fn delete_with_where() {
        let t = books();
        let delete = Delete::from(&t).filter(t.field("id").unwrap().eq(7i64));
        assert_eq!(
            delete.to_sql(Dialect::Postgres).unwrap(),
            "DELETE FROM books WHERE id = $1"
        );
    }

    #[test]
    fn delete_with_returning() {
        let t = books();
        let delete = Delete::from(&t)
            .filter(t.field("id").unwrap().eq(7i64))
            .returning([t.field("title").unwrap()]);
        assert_eq!(
            delete.to_sql(Dialect::Postgres).unwrap(),
            "DELETE FROM books WHERE id = $1 RETURNING title"
        );
        assert_eq!(
            delete.to_sql(Dialect::H2).unwrap(),
            "DELETE FROM books WHERE id = ?"
        );
    }

    #[test]
    fn delete_without_where_renders_verbatim() {
        let t = books();
        let delete = Delete::from(&t);
        assert_eq!(
            delete.to_sql(Dialect::Postgres).unwrap(),
            "DELETE FROM books"
        );
    }
}
