//! UPDATE statement.

use crate::connection::Connection;
use crate::cte::With;
use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::expr::{Condition, Field, IntoCondition, PlainSql};
use crate::ident::Ident;
use crate::render::{render, QueryPart, RenderContext, RenderSettings};
use crate::row::{RecordSet, Row};
use crate::table::Table;
use crate::value::IntoValue;

use super::insert::DmlValue;
use super::returning::{execute_dml, DmlPlan};
use super::render_returning;

/// An UPDATE statement with a WHERE tree and returning fields.
///
/// At least one SET assignment is required; execution fails validation
/// otherwise.
#[derive(Debug, Clone)]
pub struct Update {
    table: Table,
    with: Option<With>,
    sets: Vec<(Ident, DmlValue)>,
    filter: Option<Condition>,
    returning: Vec<Field>,
    returned: Option<RecordSet>,
    settings: RenderSettings,
}

impl Update {
    /// Start an UPDATE of the given table.
    pub fn table(table: &Table) -> Self {
        Self {
            table: table.clone(),
            with: None,
            sets: Vec::new(),
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

    /// SET a column to a bound value.
    pub fn set(mut self, column: &str, value: impl IntoValue) -> QueryResult<Self> {
        self.sets
            .push((Ident::parse(column)?, DmlValue::Value(value.into_value())));
        Ok(self)
    }

    /// SET a column to a raw SQL expression.
    pub fn set_raw(mut self, column: &str, expr: PlainSql) -> QueryResult<Self> {
        self.sets.push((Ident::parse(column)?, DmlValue::Plain(expr)));
        Ok(self)
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

    fn validate(&self) -> QueryResult<()> {
        if self.sets.is_empty() {
            return Err(QueryError::validation("Update: no SET assignments"));
        }
        Ok(())
    }

    /// Render for a dialect (debugging helper).
    pub fn to_sql(&self, dialect: Dialect) -> QueryResult<String> {
        self.validate()?;
        Ok(render(dialect, self.settings, self)?.0)
    }

    /// Execute against a connection; returns the affected-row count.
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

impl QueryPart for Update {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        if let Some(with) = &self.with {
            ctx.visit(with)?;
            ctx.separator();
        }

        ctx.keyword("update").separator();
        ctx.ident(self.table.name());
        ctx.separator().keyword("set").separator();
        for (i, (column, value)) in self.sets.iter().enumerate() {
            if i > 0 {
                ctx.sql(", ");
            }
            ctx.ident(column).sql(" = ");
            ctx.visit(value)?;
        }

        if let Some(cond) = &self.filter {
            ctx.separator().keyword("where").separator();
            ctx.visit(cond)?;
        }

        render_returning(ctx, &self.returning)
    }
}
