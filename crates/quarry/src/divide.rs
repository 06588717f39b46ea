//! Relational division.
//!
//! `dividend DIVIDE BY divisor ON <condition> RETURNING <fields>` answers
//! "which dividend rows match *every* divisor row", rendered as the classic
//! double `NOT EXISTS` encoding. The intermediate step types form the
//! canonical condition-step surface: each combinator returns a new step
//! wrapping the updated tree, and the type surface makes `returning`
//! unreachable until at least one ON condition exists.
//!
//! Fields in the ON condition referring to the dividend must be qualified
//! with the dividend's table name; the renderer re-qualifies them onto the
//! correlated inner alias.

use crate::error::{QueryError, QueryResult};
use crate::expr::{Condition, Field, IntoCondition};
use crate::ident::{Ident, IdentPart};
use crate::render::{QueryPart, RenderContext};
use crate::select::Select;

fn alias(name: &str) -> Ident {
    Ident {
        parts: vec![IdentPart::Unquoted(name.to_string())],
    }
}

/// Division start: only `on` is reachable from here.
#[derive(Debug, Clone)]
pub struct DivideByStep {
    dividend: Ident,
    divisor: Ident,
}

impl DivideByStep {
    pub(crate) fn new(dividend: Ident, divisor: Ident) -> Self {
        Self { dividend, divisor }
    }

    /// Supply the first ON condition.
    pub fn on(self, cond: impl IntoCondition) -> DivideOnStep {
        DivideOnStep {
            dividend: self.dividend,
            divisor: self.divisor,
            on: cond.into_condition(),
        }
    }
}

/// Division with at least one ON condition assembled.
///
/// Combinators accept an existing condition, a boolean-valued field, a
/// literal boolean, or a raw [`PlainSql`](crate::expr::PlainSql) fragment,
/// and leave the receiver's own tree untouched.
#[derive(Debug, Clone)]
pub struct DivideOnStep {
    dividend: Ident,
    divisor: Ident,
    on: Condition,
}

impl DivideOnStep {
    pub fn and(self, cond: impl IntoCondition) -> Self {
        self.map(|on| on.and(cond))
    }

    pub fn or(self, cond: impl IntoCondition) -> Self {
        self.map(|on| on.or(cond))
    }

    pub fn and_not(self, cond: impl IntoCondition) -> Self {
        self.map(|on| on.and_not(cond))
    }

    pub fn or_not(self, cond: impl IntoCondition) -> Self {
        self.map(|on| on.or_not(cond))
    }

    pub fn and_exists(self, query: Select) -> Self {
        self.map(|on| on.and_exists(query))
    }

    pub fn and_not_exists(self, query: Select) -> Self {
        self.map(|on| on.and_not_exists(query))
    }

    pub fn or_exists(self, query: Select) -> Self {
        self.map(|on| on.or_exists(query))
    }

    pub fn or_not_exists(self, query: Select) -> Self {
        self.map(|on| on.or_not_exists(query))
    }

    /// Close the division, naming the quotient columns.
    pub fn returning(self, fields: impl IntoIterator<Item = Field>) -> QueryResult<Division> {
        let returning: Vec<Field> = fields.into_iter().collect();
        if returning.is_empty() {
            return Err(QueryError::validation(
                "relational division requires at least one returning field",
            ));
        }
        Ok(Division {
            dividend: self.dividend,
            divisor: self.divisor,
            on: self.on,
            returning,
        })
    }

    fn map(self, f: impl FnOnce(Condition) -> Condition) -> Self {
        Self {
            dividend: self.dividend,
            divisor: self.divisor,
            on: f(self.on),
        }
    }
}

/// A complete relational division, usable as a FROM source.
#[derive(Debug, Clone)]
pub struct Division {
    dividend: Ident,
    divisor: Ident,
    on: Condition,
    returning: Vec<Field>,
}

impl QueryPart for Division {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        let outer = alias("d");
        let inner = alias("i");

        let quotient: Vec<Field> = self
            .returning
            .iter()
            .map(|f| Field::qualified(outer.clone(), f.name_ident().clone()))
            .collect::<QueryResult<_>>()?;

        ctx.sql("(").keyword("select distinct").separator();
        ctx.visit_list(&quotient, ", ")?;
        ctx.separator().keyword("from").separator();
        ctx.ident(&self.dividend).separator().ident(&outer);

        ctx.separator()
            .keyword("where not exists")
            .sql(" (")
            .keyword("select")
            .sql(" 1 ")
            .keyword("from")
            .separator()
            .ident(&self.divisor);

        ctx.separator()
            .keyword("where not exists")
            .sql(" (")
            .keyword("select")
            .sql(" 1 ")
            .keyword("from")
            .separator()
            .ident(&self.dividend)
            .separator()
            .ident(&inner)
            .separator()
            .keyword("where")
            .separator();

        // Dividend references in the ON condition correlate against the
        // inner copy.
        let on = self.on.requalify(&self.dividend, &inner);
        ctx.visit(&on)?;

        for field in &self.returning {
            ctx.separator().keyword("and").separator();
            let i = Field::qualified(inner.clone(), field.name_ident().clone())?;
            let d = Field::qualified(outer.clone(), field.name_ident().clone())?;
            ctx.visit(&i)?;
            ctx.sql(" = ");
            ctx.visit(&d)?;
        }

        ctx.sql("))");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialect::Dialect;
    use crate::expr::plain_sql;
    use crate::render::{render, RenderSettings};
    use crate::select::Select;
    use crate::table::Table;
    use crate::value::ValueKind;

    fn tables() -> (Table, Table) {
        let transactions = Table::new("transactions")
            .unwrap()
            .column("account_id", ValueKind::Int8)
            .unwrap()
            .column("product_id", ValueKind::Int8)
            .unwrap();
        let products = Table::new("products")
            .unwrap()
            .identity("id", ValueKind::Int8)
            .unwrap()
            .column("kind", ValueKind::Text)
            .unwrap();
        (transactions, products)
    }

    #[test]
    fn division_renders_double_not_exists() {
        let (transactions, products) = tables();
        let division = transactions
            .divide_by(&products)
            .on(Field::qualified("transactions", "product_id")
                .unwrap()
                .eq_field(&Field::qualified("products", "id").unwrap()))
            .returning([transactions.field("account_id").unwrap()])
            .unwrap();

        let q = Select::new().from_division(division);
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &q).unwrap();
        assert_eq!(
            sql,
            "SELECT * FROM (SELECT DISTINCT d.account_id FROM transactions d \
             WHERE NOT EXISTS (SELECT 1 FROM products \
             WHERE NOT EXISTS (SELECT 1 FROM transactions i \
             WHERE i.product_id = products.id AND i.account_id = d.account_id)))"
        );
    }

    #[test]
    fn combinators_extend_the_on_tree() {
        let (transactions, products) = tables();
        let division = transactions
            .divide_by(&products)
            .on(Field::qualified("transactions", "product_id")
                .unwrap()
                .eq_field(&Field::qualified("products", "id").unwrap()))
            .and(Field::qualified("products", "kind").unwrap().eq("book"))
            .returning([transactions.field("account_id").unwrap()])
            .unwrap();

        let q = Select::new().from_division(division);
        let (sql, params) = render(Dialect::Postgres, RenderSettings::default(), &q).unwrap();
        assert!(sql.contains("i.product_id = products.id AND products.kind = $1"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn plain_sql_condition_is_inserted_verbatim() {
        let (transactions, products) = tables();
        let division = transactions
            .divide_by(&products)
            .on(Field::qualified("transactions", "product_id")
                .unwrap()
                .eq_field(&Field::qualified("products", "id").unwrap()))
            .and(plain_sql("products.kind <> 'internal'"))
            .returning([transactions.field("account_id").unwrap()])
            .unwrap();

        let q = Select::new().from_division(division);
        let (sql, _) = render(Dialect::Postgres, RenderSettings::default(), &q).unwrap();
        assert!(sql.contains("AND products.kind <> 'internal'"));
    }

    #[test]
    fn steps_are_persistent() {
        let (transactions, products) = tables();
        let base = transactions.divide_by(&products).on(
            Field::qualified("transactions", "product_id")
                .unwrap()
                .eq_field(&Field::qualified("products", "id").unwrap()),
        );
        let narrowed = base
            .clone()
            .and(Field::qualified("products", "kind").unwrap().eq("book"));

        let plain = base
            .returning([transactions.field("account_id").unwrap()])
            .unwrap();
        let filtered = narrowed
            .returning([transactions.field("account_id").unwrap()])
            .unwrap();

        let (sql_plain, _) = render(
            Dialect::Postgres,
            RenderSettings::default(),
            &Select::new().from_division(plain),
        )
        .unwrap();
        let (sql_filtered, _) = render(
            Dialect::Postgres,
            RenderSettings::default(),
            &Select::new().from_division(filtered),
        )
        .unwrap();
        assert!(!sql_plain.contains("kind"));
        assert!(sql_filtered.contains("kind"));
    }

    #[test]
    fn empty_returning_is_rejected() {
        let (transactions, products) = tables();
        let err = transactions
            .divide_by(&products)
            .on(true)
            .returning(Vec::<Field>::new())
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }
}
