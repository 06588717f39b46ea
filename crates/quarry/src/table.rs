//! Table metadata: column names, declared kinds, and the identity column.
//!
//! A [`Table`] is the anchor for DML statements and for the returning-value
//! resolver, which needs to know the identity column and its declared kind
//! to coerce captured key values.

use crate::divide::DivideByStep;
use crate::error::{QueryError, QueryResult};
use crate::expr::Field;
use crate::ident::{Ident, IntoIdent};
use crate::value::ValueKind;

/// A column with its declared kind.
#[derive(Debug, Clone)]
pub struct Column {
    name: Ident,
    kind: ValueKind,
}

impl Column {
    pub fn name(&self) -> &str {
        self.name.tail()
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    pub(crate) fn ident(&self) -> &Ident {
        &self.name
    }
}

/// A table with declared columns and an optional identity column.
#[derive(Debug, Clone)]
pub struct Table {
    name: Ident,
    columns: Vec<Column>,
    identity: Option<usize>,
}

impl Table {
    /// Create a table reference.
    pub fn new(name: impl IntoIdent) -> QueryResult<Self> {
        Ok(Self {
            name: name.into_ident()?,
            columns: Vec::new(),
            identity: None,
        })
    }

    /// Declare a column.
    pub fn column(mut self, name: impl IntoIdent, kind: ValueKind) -> QueryResult<Self> {
        let name = name.into_ident()?;
        if name.parts.len() != 1 {
            return Err(QueryError::validation(format!(
                "column name must be a single segment: '{}'",
                name.tail()
            )));
        }
        self.columns.push(Column { name, kind });
        Ok(self)
    }

    /// Declare the identity (auto-generated key) column.
    pub fn identity(mut self, name: impl IntoIdent, kind: ValueKind) -> QueryResult<Self> {
        if self.identity.is_some() {
            return Err(QueryError::validation("table already has an identity column"));
        }
        self = self.column(name, kind)?;
        self.identity = Some(self.columns.len() - 1);
        Ok(self)
    }

    pub fn name(&self) -> &Ident {
        &self.name
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// The identity column, if one was declared.
    pub fn identity_column(&self) -> Option<&Column> {
        self.identity.map(|i| &self.columns[i])
    }

    /// An unqualified field reference for a declared column.
    pub fn field(&self, name: &str) -> Option<Field> {
        self.columns
            .iter()
            .find(|c| c.name().eq_ignore_ascii_case(name))
            .map(|c| Field::new(c.ident().clone()).expect("column idents are valid"))
    }

    /// Unqualified field references for all declared columns, in declaration
    /// order.
    pub fn fields(&self) -> Vec<Field> {
        self.columns
            .iter()
            .map(|c| Field::new(c.ident().clone()).expect("column idents are valid"))
            .collect()
    }

    /// Start a relational division with this table as the dividend.
    pub fn divide_by(&self, divisor: &Table) -> DivideByStep {
        DivideByStep::new(self.name.clone(), divisor.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn identity_is_a_column() {
        let t = books();
        let id = t.identity_column().unwrap();
        assert_eq!(id.name(), "id");
        assert_eq!(id.kind(), ValueKind::Int8);
        assert_eq!(t.columns().len(), 3);
    }

    #[test]
    fn field_lookup_is_case_insensitive() {
        let t = books();
        assert!(t.field("TITLE").is_some());
        assert!(t.field("missing").is_none());
    }

    #[test]
    fn second_identity_is_rejected() {
        let err = books().identity("id2", ValueKind::Int8).unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }

    #[test]
    fn dotted_column_names_are_rejected() {
        let err = Table::new("t")
            .unwrap()
            .column("a.b", ValueKind::Text)
            .unwrap_err();
        assert!(matches!(err, QueryError::Validation(_)));
    }
}
