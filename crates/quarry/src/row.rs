//! Result rows and typed mapping.

use crate::error::{QueryError, QueryResult};
use crate::value::{FromValue, Value};
use std::sync::Arc;

/// A single result row: column names plus one value per column.
///
/// Rows are immutable once built. Column lookup is case-insensitive because
/// backends disagree about the case of unquoted result column names.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Build a row. The value list must match the column list in length.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> QueryResult<Self> {
        if columns.len() != values.len() {
            return Err(QueryError::validation(format!(
                "row has {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The value at a column index.
    pub fn value_at(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }

    /// The value of a named column (case-insensitive).
    pub fn value_of(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Typed access to a named column.
    pub fn get<T: FromValue>(&self, column: &str) -> QueryResult<T> {
        let value = self
            .value_of(column)
            .ok_or_else(|| QueryError::decode(column, "no such column"))?;
        T::from_value(value).map_err(|msg| QueryError::decode(column, msg))
    }

    /// Typed access by column index.
    pub fn get_at<T: FromValue>(&self, idx: usize) -> QueryResult<T> {
        let value = self
            .value_at(idx)
            .ok_or_else(|| QueryError::decode(idx.to_string(), "no such column"))?;
        T::from_value(value).map_err(|msg| QueryError::decode(idx.to_string(), msg))
    }
}

/// Trait for converting a result row into a Rust struct.
///
/// Typically derived with `#[derive(FromRow)]` from the `quarry-derive`
/// crate.
///
/// # Example
///
/// ```ignore
/// use quarry::FromRow;
///
/// #[derive(FromRow)]
/// struct Book {
///     id: i64,
///     title: String,
///     #[quarry(column = "author_id")]
///     author: Option<i64>,
/// }
/// ```
pub trait FromRow: Sized {
    /// Convert a result row into Self
    fn from_row(row: &Row) -> QueryResult<Self>;
}

impl FromRow for Row {
    fn from_row(row: &Row) -> QueryResult<Self> {
        Ok(row.clone())
    }
}

/// The row collection produced by a statement's returning subsystem or by a
/// SELECT.
///
/// Rows share one column-name list; ordering matches the caller's requested
/// field order.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    columns: Arc<[String]>,
    rows: Vec<Row>,
}

impl RecordSet {
    /// An empty set with the given column shape.
    pub fn empty(columns: Arc<[String]>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub(crate) fn from_rows(columns: Arc<[String]>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// The first row, if any.
    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Map every row to `T`.
    pub fn into_typed<T: FromRow>(&self) -> QueryResult<Vec<T>> {
        self.rows.iter().map(T::from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        let columns: Arc<[String]> = Arc::from(vec!["id".to_string(), "title".to_string()]);
        Row::new(columns, vec![Value::Int8(7), Value::Text("dune".into())]).unwrap()
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let r = row();
        assert_eq!(r.get::<i64>("ID").unwrap(), 7);
        assert_eq!(r.get::<String>("title").unwrap(), "dune");
    }

    #[test]
    fn missing_column_is_decode_error() {
        let err = row().get::<i64>("nope").unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }));
    }

    #[test]
    fn wrong_type_is_decode_error() {
        let err = row().get::<String>("id").unwrap_err();
        assert!(matches!(err, QueryError::Decode { .. }));
    }

    #[test]
    fn mismatched_lengths_rejected() {
        let columns: Arc<[String]> = Arc::from(vec!["a".to_string()]);
        assert!(Row::new(columns, vec![]).is_err());
    }

    #[test]
    fn record_set_first_of_empty_is_none() {
        let set = RecordSet::empty(Arc::from(vec!["id".to_string()]));
        assert!(set.first().is_none());
        assert!(set.is_empty());
    }
}
