//! CTE (WITH clause) support.
//!
//! A [`With`] clause prepends one or more named subqueries to a statement.
//! Recursive CTEs carry a base and a recursive part combined with
//! UNION / UNION ALL.
//!
//! # Example
//! ```ignore
//! let with = With::new("active_authors",
//!     Select::new().from(&authors).filter(status.eq("active")))?;
//! let q = Select::new().with(with).from_name("active_authors");
//! ```

use crate::error::QueryResult;
use crate::ident::{Ident, IntoIdent};
use crate::render::{QueryPart, RenderContext};
use crate::select::Select;

/// A single CTE definition.
#[derive(Debug, Clone)]
struct Cte {
    name: Ident,
    columns: Option<Vec<Ident>>,
    query: Select,
    /// For recursive CTEs: the recursive part of the query.
    recursive_query: Option<Select>,
    /// Whether to use UNION ALL (true) or UNION (false) for recursive CTEs.
    union_all: bool,
}

/// A WITH clause holding one or more CTEs.
#[derive(Debug, Clone)]
pub struct With {
    ctes: Vec<Cte>,
    recursive: bool,
}

impl With {
    /// Start a WITH clause with a single CTE.
    pub fn new(name: impl IntoIdent, query: Select) -> QueryResult<Self> {
        Ok(Self {
            ctes: vec![Cte {
                name: name.into_ident()?,
                columns: None,
                query,
                recursive_query: None,
                union_all: false,
            }],
            recursive: false,
        })
    }

    /// Start a WITH clause with explicit column names.
    pub fn with_columns(
        name: impl IntoIdent,
        columns: impl IntoIterator<Item = impl IntoIdent>,
        query: Select,
    ) -> QueryResult<Self> {
        Ok(Self {
            ctes: vec![Cte {
                name: name.into_ident()?,
                columns: Some(
                    columns
                        .into_iter()
                        .map(IntoIdent::into_ident)
                        .collect::<QueryResult<_>>()?,
                ),
                query,
                recursive_query: None,
                union_all: false,
            }],
            recursive: false,
        })
    }

    /// Start a recursive WITH clause.
    pub fn recursive(
        name: impl IntoIdent,
        base: Select,
        recursive: Select,
        union_all: bool,
    ) -> QueryResult<Self> {
        Ok(Self {
            ctes: vec![Cte {
                name: name.into_ident()?,
                columns: None,
                query: base,
                recursive_query: Some(recursive),
                union_all,
            }],
            recursive: true,
        })
    }

    /// Add another non-recursive CTE.
    pub fn and(mut self, name: impl IntoIdent, query: Select) -> QueryResult<Self> {
        self.ctes.push(Cte {
            name: name.into_ident()?,
            columns: None,
            query,
            recursive_query: None,
            union_all: false,
        });
        Ok(self)
    }
}

impl QueryPart for With {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        ctx.keyword("with").separator();
        if self.recursive {
            ctx.keyword("recursive").separator();
        }

        for (i, cte) in self.ctes.iter().enumerate() {
            if i > 0 {
                ctx.sql(", ");
            }
            ctx.ident(&cte.name);
            if let Some(columns) = &cte.columns {
                ctx.sql(" (");
                for (j, col) in columns.iter().enumerate() {
                    if j > 0 {
                        ctx.sql(", ");
                    }
                    ctx.ident(col);
                }
                ctx.sql(")");
            }
            ctx.separator().keyword("as").sql(" (");
            ctx.visit(&cte.query)?;
            if let Some(recursive) = &cte.recursive_query {
                ctx.separator()
                    .keyword(if cte.union_all { "union all" } else { "union" })
                    .separator();
                ctx.visit(recursive)?;
            }
            ctx.sql(")");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::Field;
    use crate::table::Table;
    use crate::value::ValueKind;

    fn authors() -> Table {
        Table::new("authors")
            .unwrap()
            .identity("id", ValueKind::Int8)
            .unwrap()
            .column("name", ValueKind::Text)
            .unwrap()
            .column("parent_id", ValueKind::Int8)
            .unwrap()
    }

    #[test]
    fn single_cte() {
        let t = authors();
        let with = With::new(
            "active",
            Select::new()
                .field(t.field("id").unwrap())
                .from(&t)
                .filter(t.field("name").unwrap().ne("")),
        )
        .unwrap();
        let q = Select::new().with(with).from_name("active").unwrap();
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "WITH active AS (SELECT id FROM authors WHERE name <> $1) SELECT * FROM active"
        );
    }

    #[test]
    fn multiple_ctes_join_with_commas() {
        let t = authors();
        let with = With::new("a", Select::new().from(&t))
            .unwrap()
            .and("b", Select::new().from(&t))
            .unwrap();
        let q = Select::new().with(with).from_name("b").unwrap();
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "WITH a AS (SELECT * FROM authors), b AS (SELECT * FROM authors) SELECT * FROM b"
        );
    }

    #[test]
    fn recursive_cte_unions_base_and_step() {
        let t = authors();
        let base = Select::new()
            .field(t.field("id").unwrap())
            .from(&t)
            .filter(t.field("parent_id").unwrap().is_null());
        let step = Select::new()
            .field(Field::qualified("authors", "id").unwrap())
            .from(&t)
            .filter(
                Field::qualified("authors", "parent_id")
                    .unwrap()
                    .eq_field(&Field::qualified("tree", "id").unwrap()),
            );
        let with = With::recursive("tree", base, step, true).unwrap();
        let q = Select::new().with(with).from_name("tree").unwrap();
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "WITH RECURSIVE tree AS (SELECT id FROM authors WHERE parent_id IS NULL \
             UNION ALL SELECT authors.id FROM authors WHERE authors.parent_id = tree.id) \
             SELECT * FROM tree"
        );
    }

    #[test]
    fn cte_with_column_list() {
        let t = authors();
        let with = With::with_columns("named", ["x", "y"], Select::new().from(&t)).unwrap();
        let q = Select::new().with(with).from_name("named").unwrap();
        assert_eq!(
            q.to_sql(Dialect::Postgres).unwrap(),
            "WITH named (x, y) AS (SELECT * FROM authors) SELECT * FROM named"
        );
    }
}
