//! Fields, raw SQL fragments, and the condition tree.
//!
//! [`Condition`] is a persistent boolean tree: every combinator consumes its
//! receiver and returns a new tree, so two chains forked from the same base
//! (via `clone`) never interfere. Combinators accumulate left-associatively,
//! matching how a chained `a.and(b).and(c)` reads.

use crate::error::{QueryError, QueryResult};
use crate::ident::{Ident, IntoIdent};
use crate::render::{QueryPart, RenderContext};
use crate::select::Select;
use crate::value::{IntoValue, Value};

/// A column reference, optionally qualified by a table (or alias) name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    table: Option<Ident>,
    name: Ident,
}

impl Field {
    /// Create a field reference.
    ///
    /// A dotted input (`"b.title"`) splits into qualifier and column name.
    pub fn new(name: impl IntoIdent) -> QueryResult<Self> {
        let ident = name.into_ident()?;
        if ident.parts.len() > 1 {
            let mut parts = ident.parts;
            let name = parts.pop().expect("len > 1");
            Ok(Self {
                table: Some(Ident { parts }),
                name: Ident { parts: vec![name] },
            })
        } else {
            Ok(Self {
                table: None,
                name: ident,
            })
        }
    }

    /// Create a field reference qualified by an explicit table or alias.
    pub fn qualified(table: impl IntoIdent, name: impl IntoIdent) -> QueryResult<Self> {
        Ok(Self {
            table: Some(table.into_ident()?),
            name: name.into_ident()?,
        })
    }

    /// The unqualified column name as written.
    pub fn name(&self) -> &str {
        self.name.tail()
    }

    /// The qualifying table or alias, if any.
    pub fn table(&self) -> Option<&Ident> {
        self.table.as_ref()
    }

    pub(crate) fn name_ident(&self) -> &Ident {
        &self.name
    }

    /// A copy of this field with its qualifier replaced.
    pub(crate) fn requalified(&self, from: &Ident, to: &Ident) -> Field {
        if self.table.as_ref() == Some(from) {
            Field {
                table: Some(to.clone()),
                name: self.name.clone(),
            }
        } else {
            self.clone()
        }
    }

    /// A copy of this field stripped of any qualifier.
    pub(crate) fn unqualified(&self) -> Field {
        Field {
            table: None,
            name: self.name.clone(),
        }
    }

    // ==================== Condition constructors ====================

    pub fn eq(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Eq, value)
    }

    pub fn ne(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Ne, value)
    }

    pub fn gt(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Gt, value)
    }

    pub fn gte(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Gte, value)
    }

    pub fn lt(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Lt, value)
    }

    pub fn lte(&self, value: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Lte, value)
    }

    pub fn like(&self, pattern: impl IntoValue) -> Condition {
        self.cmp(CmpOp::Like, pattern)
    }

    pub fn not_like(&self, pattern: impl IntoValue) -> Condition {
        self.cmp(CmpOp::NotLike, pattern)
    }

    /// Compare two fields: `self = other`.
    pub fn eq_field(&self, other: &Field) -> Condition {
        Condition::FieldCmp {
            left: self.clone(),
            op: CmpOp::Eq,
            right: other.clone(),
        }
    }

    pub fn is_null(&self) -> Condition {
        Condition::Null {
            field: self.clone(),
            negated: false,
        }
    }

    pub fn is_not_null(&self) -> Condition {
        Condition::Null {
            field: self.clone(),
            negated: true,
        }
    }

    /// `field IN (values...)`. An empty list collapses to FALSE.
    pub fn in_values<V: IntoValue>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let values: Vec<Value> = values.into_iter().map(IntoValue::into_value).collect();
        if values.is_empty() {
            return Condition::False;
        }
        Condition::InList {
            field: self.clone(),
            values,
            negated: false,
        }
    }

    /// `field NOT IN (values...)`. An empty list collapses to TRUE.
    pub fn not_in<V: IntoValue>(&self, values: impl IntoIterator<Item = V>) -> Condition {
        let values: Vec<Value> = values.into_iter().map(IntoValue::into_value).collect();
        if values.is_empty() {
            return Condition::True;
        }
        Condition::InList {
            field: self.clone(),
            values,
            negated: true,
        }
    }

    pub fn between(&self, low: impl IntoValue, high: impl IntoValue) -> Condition {
        Condition::Between {
            field: self.clone(),
            low: low.into_value(),
            high: high.into_value(),
            negated: false,
        }
    }

    pub fn not_between(&self, low: impl IntoValue, high: impl IntoValue) -> Condition {
        Condition::Between {
            field: self.clone(),
            low: low.into_value(),
            high: high.into_value(),
            negated: true,
        }
    }

    fn cmp(&self, op: CmpOp, value: impl IntoValue) -> Condition {
        Condition::Cmp {
            field: self.clone(),
            op,
            value: value.into_value(),
        }
    }

    // ==================== Ordering ====================

    pub fn asc(&self) -> OrderField {
        OrderField {
            field: self.clone(),
            desc: false,
        }
    }

    pub fn desc(&self) -> OrderField {
        OrderField {
            field: self.clone(),
            desc: true,
        }
    }
}

impl QueryPart for Field {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        if let Some(table) = &self.table {
            ctx.ident(table).sql(".");
        }
        ctx.ident(&self.name);
        Ok(())
    }
}

/// A field with an ORDER BY direction.
#[derive(Debug, Clone)]
pub struct OrderField {
    field: Field,
    desc: bool,
}

impl QueryPart for OrderField {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        ctx.visit(&self.field)?;
        ctx.separator()
            .keyword(if self.desc { "desc" } else { "asc" });
        Ok(())
    }
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl CmpOp {
    fn write(self, ctx: &mut RenderContext) {
        match self {
            CmpOp::Eq => {
                ctx.sql("=");
            }
            CmpOp::Ne => {
                ctx.sql("<>");
            }
            CmpOp::Gt => {
                ctx.sql(">");
            }
            CmpOp::Gte => {
                ctx.sql(">=");
            }
            CmpOp::Lt => {
                ctx.sql("<");
            }
            CmpOp::Lte => {
                ctx.sql("<=");
            }
            CmpOp::Like => {
                ctx.keyword("like");
            }
            CmpOp::NotLike => {
                ctx.keyword("not like");
            }
        }
    }
}

/// A raw SQL fragment with optional positional (`?`) and named (`:name`)
/// bind values.
///
/// The text is inserted verbatim into the generated statement: syntactic
/// correctness and injection-safety are entirely the caller's
/// responsibility. This type is the only way raw text enters a statement
/// tree, so the hazard cannot be reached through the typed-expression path.
#[derive(Debug, Clone)]
pub struct PlainSql {
    sql: String,
    positional: Vec<Value>,
    named: Vec<(String, Value)>,
}

/// Start a raw SQL fragment.
pub fn plain_sql(sql: impl Into<String>) -> PlainSql {
    PlainSql {
        sql: sql.into(),
        positional: Vec::new(),
        named: Vec::new(),
    }
}

impl PlainSql {
    /// Bind the next positional `?` marker.
    pub fn bind(mut self, value: impl IntoValue) -> Self {
        self.positional.push(value.into_value());
        self
    }

    /// Bind a named `:name` marker.
    pub fn bind_named(mut self, name: impl Into<String>, value: impl IntoValue) -> Self {
        self.named.push((name.into(), value.into_value()));
        self
    }
}

impl QueryPart for PlainSql {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        let mut positional = self.positional.iter();
        let mut chars = self.sql.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '?' => match positional.next() {
                    // Markers beyond the bound values pass through verbatim.
                    Some(v) => {
                        ctx.bind(v.clone());
                    }
                    None => {
                        ctx.sql("?");
                    }
                },
                ':' => {
                    // `::` is cast syntax, never a bind marker.
                    if chars.peek() == Some(&':') {
                        chars.next();
                        ctx.sql("::");
                        continue;
                    }
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c == '_' || c.is_ascii_alphanumeric() {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    if name.is_empty() {
                        ctx.sql(":");
                        continue;
                    }
                    match self.named.iter().find(|(n, _)| *n == name) {
                        Some((_, v)) => {
                            ctx.bind(v.clone());
                        }
                        None => {
                            return Err(QueryError::validation(format!(
                                "unbound named parameter ':{name}' in plain SQL"
                            )));
                        }
                    }
                }
                _ => {
                    let mut buf = [0u8; 4];
                    ctx.sql(ch.encode_utf8(&mut buf));
                }
            }
        }
        Ok(())
    }
}

/// A boolean predicate tree.
#[derive(Debug, Clone)]
pub enum Condition {
    /// Always true.
    True,
    /// Always false.
    False,
    /// `field op value`
    Cmp {
        field: Field,
        op: CmpOp,
        value: Value,
    },
    /// `left op right` over two fields
    FieldCmp {
        left: Field,
        op: CmpOp,
        right: Field,
    },
    /// `field IS [NOT] NULL`
    Null { field: Field, negated: bool },
    /// `field [NOT] IN (values...)`
    InList {
        field: Field,
        values: Vec<Value>,
        negated: bool,
    },
    /// `field [NOT] BETWEEN low AND high`
    Between {
        field: Field,
        low: Value,
        high: Value,
        negated: bool,
    },
    /// A boolean-valued column standing alone.
    BoolField(Field),
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    /// `[NOT] EXISTS (subquery)`
    Exists { query: Box<Select>, negated: bool },
    /// Raw SQL, caller-guaranteed.
    Plain(PlainSql),
}

/// Anything a condition combinator accepts: an existing condition, a
/// boolean-valued field, a literal boolean, or a raw fragment.
pub trait IntoCondition {
    fn into_condition(self) -> Condition;
}

impl IntoCondition for Condition {
    fn into_condition(self) -> Condition {
        self
    }
}

impl IntoCondition for bool {
    fn into_condition(self) -> Condition {
        if self { Condition::True } else { Condition::False }
    }
}

impl IntoCondition for Field {
    fn into_condition(self) -> Condition {
        Condition::BoolField(self)
    }
}

impl IntoCondition for PlainSql {
    fn into_condition(self) -> Condition {
        Condition::Plain(self)
    }
}

impl Condition {
    pub fn exists(query: Select) -> Condition {
        Condition::Exists {
            query: Box::new(query),
            negated: false,
        }
    }

    pub fn not_exists(query: Select) -> Condition {
        Condition::Exists {
            query: Box::new(query),
            negated: true,
        }
    }

    // ==================== Combinators ====================
    //
    // All consume the receiver and return a new tree.

    pub fn and(self, other: impl IntoCondition) -> Condition {
        Condition::And(Box::new(self), Box::new(other.into_condition()))
    }

    pub fn or(self, other: impl IntoCondition) -> Condition {
        Condition::Or(Box::new(self), Box::new(other.into_condition()))
    }

    pub fn and_not(self, other: impl IntoCondition) -> Condition {
        self.and(Condition::Not(Box::new(other.into_condition())))
    }

    pub fn or_not(self, other: impl IntoCondition) -> Condition {
        self.or(Condition::Not(Box::new(other.into_condition())))
    }

    pub fn and_exists(self, query: Select) -> Condition {
        self.and(Condition::exists(query))
    }

    pub fn and_not_exists(self, query: Select) -> Condition {
        self.and(Condition::not_exists(query))
    }

    pub fn or_exists(self, query: Select) -> Condition {
        self.or(Condition::exists(query))
    }

    pub fn or_not_exists(self, query: Select) -> Condition {
        self.or(Condition::not_exists(query))
    }

    pub fn negate(self) -> Condition {
        Condition::Not(Box::new(self))
    }

    /// Rewrite field qualifiers `from` to `to` throughout the tree.
    ///
    /// Raw fragments and EXISTS subqueries are left untouched; callers
    /// embedding those in a requalified position must qualify them with the
    /// target alias themselves.
    pub(crate) fn requalify(&self, from: &Ident, to: &Ident) -> Condition {
        match self {
            Condition::Cmp { field, op, value } => Condition::Cmp {
                field: field.requalified(from, to),
                op: *op,
                value: value.clone(),
            },
            Condition::FieldCmp { left, op, right } => Condition::FieldCmp {
                left: left.requalified(from, to),
                op: *op,
                right: right.requalified(from, to),
            },
            Condition::Null { field, negated } => Condition::Null {
                field: field.requalified(from, to),
                negated: *negated,
            },
            Condition::InList {
                field,
                values,
                negated,
            } => Condition::InList {
                field: field.requalified(from, to),
                values: values.clone(),
                negated: *negated,
            },
            Condition::Between {
                field,
                low,
                high,
                negated,
            } => Condition::Between {
                field: field.requalified(from, to),
                low: low.clone(),
                high: high.clone(),
                negated: *negated,
            },
            Condition::BoolField(field) => Condition::BoolField(field.requalified(from, to)),
            Condition::And(a, b) => Condition::And(
                Box::new(a.requalify(from, to)),
                Box::new(b.requalify(from, to)),
            ),
            Condition::Or(a, b) => Condition::Or(
                Box::new(a.requalify(from, to)),
                Box::new(b.requalify(from, to)),
            ),
            Condition::Not(inner) => Condition::Not(Box::new(inner.requalify(from, to))),
            other => other.clone(),
        }
    }

    fn render_grouped(&self, ctx: &mut RenderContext, parenthesize: bool) -> QueryResult<()> {
        if parenthesize {
            ctx.sql("(");
            self.render(ctx)?;
            ctx.sql(")");
            Ok(())
        } else {
            self.render(ctx)
        }
    }
}

impl QueryPart for Condition {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        match self {
            Condition::True => {
                ctx.sql("1 = 1");
            }
            Condition::False => {
                ctx.sql("1 = 0");
            }
            Condition::Cmp { field, op, value } => {
                ctx.visit(field)?;
                ctx.separator();
                op.write(ctx);
                ctx.separator().bind(value.clone());
            }
            Condition::FieldCmp { left, op, right } => {
                ctx.visit(left)?;
                ctx.separator();
                op.write(ctx);
                ctx.separator();
                ctx.visit(right)?;
            }
            Condition::Null { field, negated } => {
                ctx.visit(field)?;
                ctx.separator()
                    .keyword(if *negated { "is not null" } else { "is null" });
            }
            Condition::InList {
                field,
                values,
                negated,
            } => {
                if values.is_empty() {
                    ctx.sql(if *negated { "1 = 1" } else { "1 = 0" });
                    return Ok(());
                }
                ctx.visit(field)?;
                ctx.separator()
                    .keyword(if *negated { "not in" } else { "in" })
                    .sql(" (");
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        ctx.sql(", ");
                    }
                    ctx.bind(v.clone());
                }
                ctx.sql(")");
            }
            Condition::Between {
                field,
                low,
                high,
                negated,
            } => {
                ctx.visit(field)?;
                ctx.separator()
                    .keyword(if *negated { "not between" } else { "between" })
                    .separator()
                    .bind(low.clone())
                    .separator();
                ctx.keyword("and").separator().bind(high.clone());
            }
            Condition::BoolField(field) => {
                ctx.visit(field)?;
            }
            Condition::And(a, b) => {
                a.render_grouped(ctx, matches!(**a, Condition::Or(..)))?;
                ctx.separator().keyword("and").separator();
                b.render_grouped(ctx, matches!(**b, Condition::Or(..)))?;
            }
            Condition::Or(a, b) => {
                a.render_grouped(ctx, matches!(**a, Condition::And(..)))?;
                ctx.separator().keyword("or").separator();
                b.render_grouped(ctx, matches!(**b, Condition::And(..)))?;
            }
            Condition::Not(inner) => {
                ctx.keyword("not").sql(" (");
                inner.render(ctx)?;
                ctx.sql(")");
            }
            Condition::Exists { query, negated } => {
                if *negated {
                    ctx.keyword("not").separator();
                }
                ctx.keyword("exists").sql(" (");
                ctx.visit(query.as_ref())?;
                ctx.sql(")");
            }
            Condition::Plain(plain) => {
                ctx.visit(plain)?;
            }
        }
        Ok(())
    }
}
