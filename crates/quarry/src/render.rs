//! The query-part rendering engine.
//!
//! A statement is a tree of [`QueryPart`]s. Rendering walks the tree through
//! a [`RenderContext`], which accumulates SQL text and the ordered bind-value
//! list while carrying the target [`Dialect`] and the active
//! [`RenderSettings`]. Dispatch is double-polymorphic: callers hand any part
//! to [`RenderContext::visit`], and each part renders its children by calling
//! back into the context, so the context never needs to know concrete part
//! types.
//!
//! Rendering is side-effect-free on the tree; only the context mutates. The
//! same tree can therefore be rendered repeatedly, and concurrently from
//! multiple contexts.

use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::ident::Ident;
use crate::value::Value;

/// Identifier case style applied at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IdentCase {
    /// Emit identifiers exactly as written.
    #[default]
    AsIs,
    /// Uppercase unquoted identifiers.
    Upper,
    /// Lowercase unquoted identifiers.
    Lower,
}

impl IdentCase {
    /// Apply this style to a bare name (used for out-of-band column name
    /// lists, which must match what the renderer would emit).
    pub fn apply(self, name: &str) -> String {
        match self {
            IdentCase::AsIs => name.to_string(),
            IdentCase::Upper => name.to_uppercase(),
            IdentCase::Lower => name.to_lowercase(),
        }
    }
}

/// Keyword case style applied at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeywordCase {
    /// Uppercase keywords (`SELECT`, `RETURNING`).
    #[default]
    Upper,
    /// Lowercase keywords.
    Lower,
}

/// Formatting settings carried by a [`RenderContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderSettings {
    pub ident_case: IdentCase,
    pub keyword_case: KeywordCase,
}

/// Any node that can render itself into a [`RenderContext`].
pub trait QueryPart {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()>;
}

impl<T: QueryPart + ?Sized> QueryPart for &T {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        (**self).render(ctx)
    }
}

impl<T: QueryPart + ?Sized> QueryPart for Box<T> {
    fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
        (**self).render(ctx)
    }
}

/// Accumulator and dispatch surface for turning a [`QueryPart`] tree into
/// SQL text plus an ordered bind-value list.
#[derive(Debug)]
pub struct RenderContext {
    sql: String,
    params: Vec<Value>,
    dialect: Dialect,
    settings: RenderSettings,
}

impl RenderContext {
    /// Create a context for the given dialect with default settings.
    pub fn new(dialect: Dialect) -> Self {
        Self::with_settings(dialect, RenderSettings::default())
    }

    /// Create a context with explicit formatting settings.
    pub fn with_settings(dialect: Dialect, settings: RenderSettings) -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
            dialect,
            settings,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn settings(&self) -> RenderSettings {
        self.settings
    }

    /// Render a part into this context.
    pub fn visit(&mut self, part: &impl QueryPart) -> QueryResult<()> {
        part.render(self)
    }

    /// Render a list of parts joined by `sep`.
    pub fn visit_list<P: QueryPart>(&mut self, parts: &[P], sep: &str) -> QueryResult<()> {
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                self.sql(sep);
            }
            self.visit(part)?;
        }
        Ok(())
    }

    /// Append raw SQL text.
    pub fn sql(&mut self, raw: &str) -> &mut Self {
        self.sql.push_str(raw);
        self
    }

    /// Append a keyword, styled per the active keyword case.
    ///
    /// Keywords are passed in canonical lowercase.
    pub fn keyword(&mut self, kw: &str) -> &mut Self {
        match self.settings.keyword_case {
            KeywordCase::Upper => self.sql.push_str(&kw.to_uppercase()),
            KeywordCase::Lower => self.sql.push_str(&kw.to_lowercase()),
        }
        self
    }

    /// Append an identifier, styled per the active identifier case.
    pub fn ident(&mut self, ident: &Ident) -> &mut Self {
        ident.write_sql(&mut self.sql, self.settings.ident_case);
        self
    }

    /// Append a bind placeholder and record its value.
    pub fn bind(&mut self, value: Value) -> &mut Self {
        self.params.push(value);
        self.dialect
            .write_placeholder(&mut self.sql, self.params.len());
        self
    }

    /// Append a clause separator.
    pub fn separator(&mut self) -> &mut Self {
        self.sql.push(' ');
        self
    }

    /// Build an unsupported-dialect-feature error for the active dialect.
    pub fn unsupported(&self, feature: impl Into<String>) -> QueryError {
        QueryError::unsupported(self.dialect.as_str(), feature)
    }

    /// Number of bind values accumulated so far.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Finish rendering, yielding the SQL text and ordered bind values.
    pub fn finish(self) -> (String, Vec<Value>) {
        (self.sql, self.params)
    }

    /// The SQL accumulated so far.
    pub fn sql_so_far(&self) -> &str {
        &self.sql
    }
}

/// Render a single part to SQL text and bind values.
pub fn render(
    dialect: Dialect,
    settings: RenderSettings,
    part: &impl QueryPart,
) -> QueryResult<(String, Vec<Value>)> {
    let mut ctx = RenderContext::with_settings(dialect, settings);
    ctx.visit(part)?;
    Ok(ctx.finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pair;

    impl QueryPart for Pair {
        fn render(&self, ctx: &mut RenderContext) -> QueryResult<()> {
            ctx.keyword("select").separator();
            ctx.bind(Value::Int4(1)).sql(", ").bind(Value::Int4(2));
            Ok(())
        }
    }

    #[test]
    fn placeholders_follow_dialect() {
        let (sql, params) = render(Dialect::Postgres, RenderSettings::default(), &Pair).unwrap();
        assert_eq!(sql, "SELECT $1, $2");
        assert_eq!(params.len(), 2);

        let (sql, params) = render(Dialect::Sqlite, RenderSettings::default(), &Pair).unwrap();
        assert_eq!(sql, "SELECT ?, ?");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn keyword_case_is_a_setting() {
        let settings = RenderSettings {
            keyword_case: KeywordCase::Lower,
            ..Default::default()
        };
        let (sql, _) = render(Dialect::Postgres, settings, &Pair).unwrap();
        assert!(sql.starts_with("select "));
    }

    #[test]
    fn ident_case_is_a_setting() {
        let ident = Ident::parse("users.name").unwrap();
        let mut ctx = RenderContext::with_settings(
            Dialect::Postgres,
            RenderSettings {
                ident_case: IdentCase::Upper,
                ..Default::default()
            },
        );
        ctx.ident(&ident);
        assert_eq!(ctx.finish().0, "USERS.NAME");
    }

    #[test]
    fn bind_values_keep_order() {
        let mut ctx = RenderContext::new(Dialect::Postgres);
        ctx.bind(Value::Text("a".into()));
        ctx.bind(Value::Int8(5));
        let (sql, params) = ctx.finish();
        assert_eq!(sql, "$1$2");
        assert_eq!(params, vec![Value::Text("a".into()), Value::Int8(5)]);
    }
}
