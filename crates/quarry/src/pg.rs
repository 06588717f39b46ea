//! tokio-postgres driver adapter.
//!
//! Postgres negotiates the native-returning path: DML with returning fields
//! executes as a query and the response rows carry the values. The
//! generated-keys and declared-columns prepare modes are unreachable for
//! this backend and refuse with a contract error.

use std::sync::Arc;

use bytes::BytesMut;
use tokio_postgres::types::{to_sql_checked, IsNull, ToSql, Type};

use crate::connection::{Connection, ExecMode, ExecOutcome};
use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::row::Row;
use crate::value::Value;

impl ToSql for Value {
    fn to_sql(
        &self,
        ty: &Type,
        out: &mut BytesMut,
    ) -> Result<IsNull, Box<dyn std::error::Error + Sync + Send>> {
        match self {
            Value::Null => Ok(IsNull::Yes),
            Value::Bool(v) => v.to_sql(ty, out),
            Value::Int2(v) => v.to_sql(ty, out),
            Value::Int4(v) => v.to_sql(ty, out),
            Value::Int8(v) => v.to_sql(ty, out),
            Value::Float4(v) => v.to_sql(ty, out),
            Value::Float8(v) => v.to_sql(ty, out),
            Value::Text(v) => v.to_sql(ty, out),
            Value::Bytes(v) => v.to_sql(ty, out),
            Value::Uuid(v) => v.to_sql(ty, out),
            Value::Date(v) => v.to_sql(ty, out),
            Value::Timestamp(v) => v.to_sql(ty, out),
            Value::TimestampTz(v) => v.to_sql(ty, out),
            Value::Json(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_ty: &Type) -> bool {
        // The variant decides at bind time; the backend checks the rest.
        true
    }

    to_sql_checked!();
}

fn param_refs(params: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    params.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn convert_value(row: &tokio_postgres::Row, idx: usize, ty: &Type) -> QueryResult<Value> {
    let name = row.columns()[idx].name();
    let decode = |e: tokio_postgres::Error| QueryError::decode(name, e.to_string());

    let value = if *ty == Type::BOOL {
        row.try_get::<_, Option<bool>>(idx).map_err(decode)?.map(Value::Bool)
    } else if *ty == Type::INT2 {
        row.try_get::<_, Option<i16>>(idx).map_err(decode)?.map(Value::Int2)
    } else if *ty == Type::INT4 {
        row.try_get::<_, Option<i32>>(idx).map_err(decode)?.map(Value::Int4)
    } else if *ty == Type::INT8 {
        row.try_get::<_, Option<i64>>(idx).map_err(decode)?.map(Value::Int8)
    } else if *ty == Type::FLOAT4 {
        row.try_get::<_, Option<f32>>(idx).map_err(decode)?.map(Value::Float4)
    } else if *ty == Type::FLOAT8 {
        row.try_get::<_, Option<f64>>(idx).map_err(decode)?.map(Value::Float8)
    } else if *ty == Type::TEXT || *ty == Type::VARCHAR || *ty == Type::BPCHAR || *ty == Type::NAME
    {
        row.try_get::<_, Option<String>>(idx).map_err(decode)?.map(Value::Text)
    } else if *ty == Type::BYTEA {
        row.try_get::<_, Option<Vec<u8>>>(idx).map_err(decode)?.map(Value::Bytes)
    } else if *ty == Type::UUID {
        row.try_get::<_, Option<uuid::Uuid>>(idx).map_err(decode)?.map(Value::Uuid)
    } else if *ty == Type::DATE {
        row.try_get::<_, Option<chrono::NaiveDate>>(idx)
            .map_err(decode)?
            .map(Value::Date)
    } else if *ty == Type::TIMESTAMP {
        row.try_get::<_, Option<chrono::NaiveDateTime>>(idx)
            .map_err(decode)?
            .map(Value::Timestamp)
    } else if *ty == Type::TIMESTAMPTZ {
        row.try_get::<_, Option<chrono::DateTime<chrono::Utc>>>(idx)
            .map_err(decode)?
            .map(Value::TimestampTz)
    } else if *ty == Type::JSON || *ty == Type::JSONB {
        row.try_get::<_, Option<serde_json::Value>>(idx)
            .map_err(decode)?
            .map(Value::Json)
    } else {
        return Err(QueryError::decode(
            name,
            format!("unsupported postgres type '{}'", ty.name()),
        ));
    };

    Ok(value.unwrap_or(Value::Null))
}

fn convert_row(row: &tokio_postgres::Row) -> QueryResult<Row> {
    let columns: Arc<[String]> = row
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect::<Vec<_>>()
        .into();
    let mut values = Vec::with_capacity(row.len());
    for (idx, column) in row.columns().iter().enumerate() {
        values.push(convert_value(row, idx, column.type_())?);
    }
    Row::new(columns, values)
}

impl Connection for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn query(&self, sql: &str, params: &[Value]) -> QueryResult<Vec<Row>> {
        let refs = param_refs(params);
        let rows = tokio_postgres::Client::query(self, sql, &refs)
            .await
            .map_err(QueryError::from_db_error)?;
        rows.iter().map(convert_row).collect()
    }

    async fn execute(
        &self,
        sql: &str,
        params: &[Value],
        mode: ExecMode,
    ) -> QueryResult<ExecOutcome> {
        match mode {
            ExecMode::Plain => {
                let refs = param_refs(params);
                let rows_affected = tokio_postgres::Client::execute(self, sql, &refs)
                    .await
                    .map_err(QueryError::from_db_error)?;
                Ok(ExecOutcome::affected(rows_affected))
            }
            ExecMode::GeneratedKeys | ExecMode::DeclaredColumns(_) => Err(QueryError::contract(
                "postgres resolves returning natively; this prepare mode is unreachable",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_binds_as_sql_null() {
        let mut buf = BytesMut::new();
        let is_null = Value::Null.to_sql(&Type::INT8, &mut buf).unwrap();
        assert!(matches!(is_null, IsNull::Yes));
    }

    #[test]
    fn param_refs_preserve_arity() {
        let params = vec![Value::Int8(1), Value::Text("x".into()), Value::Null];
        assert_eq!(param_refs(&params).len(), 3);
    }
}
