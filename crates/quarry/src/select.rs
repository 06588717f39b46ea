//! SELECT statement tree and execution helpers.

use crate::connection::Connection;
use crate::cte::With;
use crate::divide::Division;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Condition, Field, IntoCondition, OrderField, PlainSql};
use crate::ident::Ident;
use crate::render::{render, QueryPart, RenderContext, RenderSettings};
use crate::row::{FromRow, Row};
use crate::table::Table;
use crate::window::WindowExpr;

/// One projected item of a SELECT.
#[derive(Debug, Clone)]
pub enum SelectItem {
    Field(Field),
    Expr(PlainSql),
    Window(WindowExpr),
}

impl QueryPart for SelectItem {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        match self {
            SelectItem::Field(f) => ctx.visit(f),
            SelectItem::Expr(e) => ctx.visit(e),
            SelectItem::Window(w) => ctx.visit(w),
        }
    }
}

/// One source of a SELECT's FROM clause.
#[derive(Debug, Clone)]
pub enum FromItem {
    Table(Ident),
    Division(Division),
}

impl QueryPart for FromItem {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        match self {
            FromItem::Table(name) => {
                ctx.ident(name);
                Ok(())
            }
            FromItem::Division(div) => ctx.visit(div),
        }
    }
}

/// A SELECT statement.
///
/// An empty projection renders as `*`.
#[derive(Debug, Clone, Default)]
pub struct Select {
    with: Option<With>,
    distinct: bool,
    items: Vec<SelectItem>,
    from: Vec<FromItem>,
    filter: Option<Condition>,
    order_by: Vec<OrderField>,
    limit: Option<u64>,
    offset: Option<u64>,
    settings: RenderSettings,
}

impl Select {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend a WITH clause.
    pub fn with(mut self, with: With) -> Self {
        self.with = Some(with);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn field(mut self, field: Field) -> Self {
        self.items.push(SelectItem::Field(field));
        self
    }

    pub fn fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.items
            .extend(fields.into_iter().map(SelectItem::Field));
        self
    }

    /// Project a raw expression (caller-guaranteed SQL).
    pub fn expr(mut self, expr: PlainSql) -> Self {
        self.items.push(SelectItem::Expr(expr));
        self
    }

    /// Project a windowed function call.
    pub fn window(mut self, expr: WindowExpr) -> Self {
        self.items.push(SelectItem::Window(expr));
        self
    }

    pub fn from(mut self, table: &Table) -> Self {
        self.from.push(FromItem::Table(table.name().clone()));
        self
    }

    /// Select from a named source that is not a declared [`Table`], such as
    /// a CTE.
    pub fn from_name(self, name: impl crate::ident::IntoIdent) -> QueryResult<Self> {
        Ok(self.from_ident(name.into_ident()?))
    }

    pub(crate) fn from_ident(mut self, name: Ident) -> Self {
        self.from.push(FromItem::Table(name));
        self
    }

    /// Select from a relational division.
    pub fn from_division(mut self, division: Division) -> Self {
        self.from.push(FromItem::Division(division));
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

    pub fn order_by(mut self, field: OrderField) -> Self {
        self.order_by.push(field);
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn offset(mut self, n: u64) -> Self {
        self.offset = Some(n);
        self
    }

    /// Override the default formatting settings used by the fetch methods.
    pub fn render_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Render for a dialect (debugging helper).
    pub fn to_sql(&self, dialect: crate::dialect::Dialect) -> QueryResult<String> {
        Ok(render(dialect, self.settings, self)?.0)
    }

    // ==================== Execution ====================

    /// Execute and return all rows.
    pub async fn fetch_all(&self, conn: &impl Connection) -> QueryResult<Vec<Row>> {
        let (sql, params) = render(conn.dialect(), self.settings, self)?;
        tracing::debug!(target: "quarry::exec", sql = %sql, binds = params.len(), "select");
        conn.query(&sql, &params).await
    }

    /// Execute and return the first row, if any.
    pub async fn fetch_opt(&self, conn: &impl Connection) -> QueryResult<Option<Row>> {
        let rows = self.fetch_all(conn).await?;
        Ok(rows.into_iter().next())
    }

    /// Execute and return exactly the first row.
    ///
    /// Returns [`QueryError::NotFound`] when no rows come back.
    pub async fn fetch_one(&self, conn: &impl Connection) -> QueryResult<Row> {
        self.fetch_opt(conn)
            .await?
            .ok_or_else(|| QueryError::not_found("expected one row, got none"))
    }

    /// Execute and map all rows to `T`.
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl Connection) -> QueryResult<Vec<T>> {
        let rows = self.fetch_all(conn).await?;
        rows.iter().map(T::from_row).collect()
    }

    /// Execute and map the first row to `T`, if any.
    pub async fn fetch_opt_as<T: FromRow>(
        &self,
        conn: &impl Connection,
    ) -> QueryResult<Option<T>> {
        let row = self.fetch_opt(conn).await?;
        row.as_ref().map(T::from_row).transpose()
    }

    /// Execute and map exactly the first row to `T`.
    pub async fn fetch_one_as<T: FromRow>(&self, conn: &impl Connection) -> QueryResult<T> {
        let row = self.fetch_one(conn).await?;
        T::from_row(&row)
    }
}

impl QueryPart for Select {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        if let Some(with) = &self.with {
            ctx.visit(with)?;
            ctx.separator();
        }

        ctx.keyword("select").separator();
        if self.distinct {
            ctx.keyword("distinct").separator();
        }

        if self.items.is_empty() {
            ctx.sql("*");
        } else {
            ctx.visit_list(&self.items, ", ")?;
        }

        if !self.from.is_empty() {
            ctx.separator().keyword("from").separator();
            ctx.visit_list(&self.from, ", ")?;
        }

        if let Some(cond) = &self.filter {
            ctx.separator().keyword("where").separator();
            ctx.visit(cond)?;
        }

        if !self.order_by.is_empty() {
            ctx.separator().keyword("order by").separator();
            ctx.visit_list(&self.order_by, ", ")?;
        }

        self.render_limit(ctx);
        Ok(())
    }
}

impl Select {
    fn render_limit(&self, ctx: &mut RenderContext) {
        use crate::dialect::Dialect;

        if self.limit.is_none() && self.offset.is_none() {
            return;
        }
        match ctx.dialect() {
            Dialect::Firebird => {
                // ROWS m TO n addresses absolute row positions.
                let offset = self.offset.unwrap_or(0);
                ctx.separator().keyword("rows").separator();
                match self.limit {
                    Some(limit) => {
                        ctx.sql(&(offset + 1).to_string())
                            .separator()
                            .keyword("to")
                            .separator()
                            .sql(&(offset + limit).to_string());
                    }
                    None => {
                        ctx.sql(&(offset + 1).to_string());
                    }
                }
            }
            Dialect::Derby => {
                if let Some(offset) = self.offset {
                    ctx.separator()
                        .keyword("offset")
                        .separator()
                        .sql(&offset.to_string())
                        .separator()
                        .keyword("rows");
                }
                if let Some(limit) = self.limit {
                    ctx.separator()
                        .keyword("fetch first")
                        .separator()
                        .sql(&limit.to_string())
                        .separator()
                        .keyword("rows only");
                }
            }
            _ => {
                if let Some(limit) = self.limit {
                    ctx.separator()
                        .keyword("limit")
                        .separator()
                        .sql(&limit.to_string());
                }
                if let Some(offset) = self.offset {
                    ctx.separator()
                        .keyword("offset")
                        .separator()
                        .sql(&offset.to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::render::IdentCase;
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
    fn plain_select() {
        let t = books();
        let q = Select::new()
            .field(t.field("id").unwrap())
            .field(t.field("title").unwrap())
            .from(&t)
            .filter(t.field("author_id").unwrap().eq(3i64))
            .order_by(t.field("id").unwrap().asc());
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "SELECT id, title FROM books WHERE author_id = $1 ORDER BY id ASC"
        );
    }

    #[test]
    fn empty_projection_is_star() {
        let t = books();
        let q = Select::new().from(&t);
        assert_eq!(q.to_sql(Dialect::Postgres).unwrap(), "SELECT * FROM books");
    }

    #[test]
    fn filter_accumulates_with_and() {
        let t = books();
        let q = Select::new()
            .from(&t)
            .filter(t.field("title").unwrap().eq("dune"))
            .filter(t.field("author_id").unwrap().eq(1i64));
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "SELECT * FROM books WHERE title = $1 AND author_id = $2"
        );
    }

    #[test]
    fn limit_per_dialect() {
        let t = books();
        let q = Select::new().from(&t).limit(10).offset(20);
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "SELECT * FROM books LIMIT 10 OFFSET 20"
        );
        assert_eq!(
            q.to_sql(Dialect::Firebird).unwrap(),
            "SELECT * FROM books ROWS 21 TO 30"
        );
        assert_eq!(
            q.to_sql(Dialect::Derby).unwrap(),
            "SELECT * FROM books OFFSET 20 ROWS FETCH FIRST 10 ROWS ONLY"
        );
    }

    #[test]
    fn ident_casing_changes_only_letter_case() {
        let t = books();
        let q = Select::new()
            .field(t.field("title").unwrap())
            .from(&t)
            .filter(t.field("id").unwrap().eq(1i64));

        let upper = q
            .clone()
            .render_settings(RenderSettings {
                ident_case: IdentCase::Upper,
                ..Default::default()
            })
            .to_sql(Dialect::Postgres)
            .unwrap();
        let lower = q
            .render_settings(RenderSettings {
                ident_case: IdentCase::Lower,
                ..Default::default()
            })
            .to_sql(Dialect::Postgres)
            .unwrap();

        assert_eq!(upper, "SELECT TITLE FROM BOOKS WHERE ID = $1");
        assert_eq!(lower, "SELECT title FROM books WHERE id = $1");
        // Same token count and ordering, only letter case differs.
        assert_eq!(upper.to_lowercase(), lower.to_lowercase());
    }

    #[test]
    fn exists_subquery_renders_inline() {
        let t = books();
        let sub = Select::new()
            .expr(crate::expr::plain_sql("1"))
            .from(&t)
            .filter(t.field("author_id").unwrap().eq(9i64));
        let q = Select::new()
            .from(&t)
            .filter(Condition::exists(sub));
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "SELECT * FROM books WHERE EXISTS (SELECT 1 FROM books WHERE author_id = $1)"
        );
    }

    #[test]
    fn distinct_renders_after_select() {
        let t = books();
        let q = Select::new()
            .distinct()
            .field(t.field("author_id").unwrap())
            .from(&t);
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "SELECT DISTINCT author_id FROM books"
        );
    }
}
