//! Window specifications.
//!
//! A window specification is assembled through persistent step objects:
//!
//! ```ignore
//! let spec = window()
//!     .partition_by(author_id)
//!     .order_by(id.asc())
//!     .rows_between_unbounded_preceding()
//!     .and_current_row();
//! ```
//!
//! Every step returns a new object; a partially-built specification can be
//! cloned and extended along different frames without interference. Frame
//! clauses are dialect-gated at render time.

use crate::error::QueryResult;
use crate::expr::{Field, OrderField};
use crate::render::{QueryPart, RenderContext};

/// One end of a window frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameBound {
    UnboundedPreceding,
    Preceding(u32),
    CurrentRow,
    UnboundedFollowing,
    Following(u32),
}

impl FrameBound {
    fn write(self, ctx: &mut RenderContext) {
        match self {
            FrameBound::UnboundedPreceding => {
                ctx.keyword("unbounded preceding");
            }
            FrameBound::Preceding(n) => {
                ctx.sql(&n.to_string()).separator().keyword("preceding");
            }
            FrameBound::CurrentRow => {
                ctx.keyword("current row");
            }
            FrameBound::UnboundedFollowing => {
                ctx.keyword("unbounded following");
            }
            FrameBound::Following(n) => {
                ctx.sql(&n.to_string()).separator().keyword("following");
            }
        }
    }
}

/// Start building a window specification.
pub fn window() -> WindowDef {
    WindowDef {
        partition_by: Vec::new(),
        order_by: Vec::new(),
    }
}

/// Partition/order step of a window specification.
///
/// Finalize with [`WindowDef::spec`], a single-bound `rows_*` method, or a
/// `rows_between_*` method followed by an `and_*` bound.
#[derive(Debug, Clone)]
pub struct WindowDef {
    partition_by: Vec<Field>,
    order_by: Vec<OrderField>,
}

impl WindowDef {
    pub fn partition_by(mut self, field: Field) -> Self {
        self.partition_by.push(field);
        self
    }

    pub fn order_by(mut self, field: OrderField) -> Self {
        self.order_by.push(field);
        self
    }

    /// Finish without a frame clause.
    pub fn spec(self) -> WindowSpec {
        self.frame(None)
    }

    pub fn rows_unbounded_preceding(self) -> WindowSpec {
        self.frame(Some((FrameBound::UnboundedPreceding, None)))
    }

    pub fn rows_preceding(self, n: u32) -> WindowSpec {
        self.frame(Some((FrameBound::Preceding(n), None)))
    }

    pub fn rows_current_row(self) -> WindowSpec {
        self.frame(Some((FrameBound::CurrentRow, None)))
    }

    pub fn rows_unbounded_following(self) -> WindowSpec {
        self.frame(Some((FrameBound::UnboundedFollowing, None)))
    }

    pub fn rows_following(self, n: u32) -> WindowSpec {
        self.frame(Some((FrameBound::Following(n), None)))
    }

    pub fn rows_between_unbounded_preceding(self) -> WindowRowsAndStep {
        self.between(FrameBound::UnboundedPreceding)
    }

    pub fn rows_between_preceding(self, n: u32) -> WindowRowsAndStep {
        self.between(FrameBound::Preceding(n))
    }

    pub fn rows_between_current_row(self) -> WindowRowsAndStep {
        self.between(FrameBound::CurrentRow)
    }

    pub fn rows_between_unbounded_following(self) -> WindowRowsAndStep {
        self.between(FrameBound::UnboundedFollowing)
    }

    pub fn rows_between_following(self, n: u32) -> WindowRowsAndStep {
        self.between(FrameBound::Following(n))
    }

    fn between(self, start: FrameBound) -> WindowRowsAndStep {
        WindowRowsAndStep { def: self, start }
    }

    fn frame(self, frame: Option<(FrameBound, Option<FrameBound>)>) -> WindowSpec {
        WindowSpec {
            partition_by: self.partition_by,
            order_by: self.order_by,
            frame,
        }
    }
}

/// Second-bound step of a `ROWS BETWEEN ... AND ...` frame.
#[derive(Debug, Clone)]
pub struct WindowRowsAndStep {
    def: WindowDef,
    start: FrameBound,
}

impl WindowRowsAndStep {
    pub fn and_unbounded_preceding(self) -> WindowSpec {
        self.end(FrameBound::UnboundedPreceding)
    }

    pub fn and_preceding(self, n: u32) -> WindowSpec {
        self.end(FrameBound::Preceding(n))
    }

    pub fn and_current_row(self) -> WindowSpec {
        self.end(FrameBound::CurrentRow)
    }

    pub fn and_unbounded_following(self) -> WindowSpec {
        self.end(FrameBound::UnboundedFollowing)
    }

    pub fn and_following(self, n: u32) -> WindowSpec {
        self.end(FrameBound::Following(n))
    }

    fn end(self, end: FrameBound) -> WindowSpec {
        let start = self.start;
        self.def.frame(Some((start, Some(end))))
    }
}

/// A complete window specification.
#[derive(Debug, Clone)]
pub struct WindowSpec {
    partition_by: Vec<Field>,
    order_by: Vec<OrderField>,
    frame: Option<(FrameBound, Option<FrameBound>)>,
}

impl QueryPart for WindowSpec {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        let mut wrote = false;

        if !self.partition_by.is_empty() {
            ctx.keyword("partition by").separator();
            ctx.visit_list(&self.partition_by, ", ")?;
            wrote = true;
        }

        if !self.order_by.is_empty() {
            if wrote {
                ctx.separator();
            }
            ctx.keyword("order by").separator();
            ctx.visit_list(&self.order_by, ", ")?;
            wrote = true;
        }

        if let Some((start, end)) = &self.frame {
            if !ctx.dialect().supports_window_frames() {
                return Err(ctx.unsupported("window frame clause"));
            }
            if wrote {
                ctx.separator();
            }
            ctx.keyword("rows").separator();
            match end {
                Some(end) => {
                    ctx.keyword("between").separator();
                    start.write(ctx);
                    ctx.separator().keyword("and").separator();
                    end.write(ctx);
                }
                None => start.write(ctx),
            }
        }

        Ok(())
    }
}

/// A function call awaiting its window, e.g. `sum(amount)`.
#[derive(Debug, Clone)]
pub struct WindowFunc {
    name: String,
    arg: Option<Field>,
}

/// Start a windowed function call.
pub fn window_fn(name: impl Into<String>) -> WindowFunc {
    WindowFunc {
        name: name.into(),
        arg: None,
    }
}

impl WindowFunc {
    pub fn arg(mut self, field: Field) -> Self {
        self.arg = Some(field);
        self
    }

    /// Attach the window, producing a selectable expression.
    pub fn over(self, spec: WindowSpec) -> WindowExpr {
        WindowExpr {
            func: self,
            spec,
            alias: None,
        }
    }
}

/// `func(arg) OVER (spec) [AS alias]`, usable as a select item.
#[derive(Debug, Clone)]
pub struct WindowExpr {
    func: WindowFunc,
    spec: WindowSpec,
    alias: Option<String>,
}

impl WindowExpr {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }
}

impl QueryPart for WindowExpr {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        ctx.sql(&self.func.name).sql("(");
        if let Some(arg) = &self.func.arg {
            ctx.visit(arg)?;
        }
        ctx.sql(") ").keyword("over").sql(" (");
        ctx.visit(&self.spec)?;
        ctx.sql(")");
        if let Some(alias) = &self.alias {
            ctx.separator().keyword("as").separator().sql(alias);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::error::QueryError;
    use crate::render::{render, RenderSettings};

    fn spec() -> WindowSpec {
        window()
            .partition_by(Field::new("author_id").unwrap())
            .order_by(Field::new("id").unwrap().asc())
            .rows_between_unbounded_preceding()
            .and_current_row()
    }

    #[test]
    fn full_specification() {
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &spec()).unwrap();
        assert_eq!(
            sql,
            "PARTITION BY author_id ORDER BY id ASC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW"
        );
    }

    #[test]
    fn single_bound_frame() {
        let spec = window()
            .order_by(Field::new("id").unwrap().asc())
            .rows_preceding(3);
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &spec).unwrap();
        assert_eq!(sql, "ORDER BY id ASC ROWS 3 PRECEDING");
    }

    #[test]
    fn frameless_spec() {
        let spec = window().partition_by(Field::new("a").unwrap()).spec();
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &spec).unwrap();
        assert_eq!(sql, "PARTITION BY a");
    }

    #[test]
    fn frame_unsupported_on_derby() {
        let err = render(Dialect::Derby, RenderSettings::default(), &spec()).unwrap_err();
        assert!(matches!(err, QueryError::Unsupported { .. }));
    }

    #[test]
    fn window_expr_renders_function_and_alias() {
        let expr = window_fn("sum")
            .arg(Field::new("amount").unwrap())
            .over(spec())
            .alias("running");
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &expr).unwrap();
        assert_eq!(
            sql,
            "sum(amount) OVER (PARTITION BY author_id ORDER BY id ASC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW) AS running"
        );
    }

    #[test]
    fn steps_are_persistent() {
        let base = window().order_by(Field::new("id").unwrap().asc());
        let a = base.clone().rows_current_row();
        let b = base.rows_between_preceding(1).and_following(1);
        let (sa, _) = render(Dialect::Postgres, RenderSettings::default(), &a).unwrap();
        let (sb, _) = render(Dialect::Postgres, RenderSettings::default(), &b).unwrap();
        assert_eq!(sa, "ORDER BY id ASC ROWS CURRENT ROW");
        assert_eq!(sb, "ORDER BY id ASC ROWS BETWEEN 1 PRECEDING AND 1 FOLLOWING");
    }
}
