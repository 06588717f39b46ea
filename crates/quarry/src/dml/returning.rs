//! The returning-value resolver.
//!
//! After a DML statement executes, the requested returning fields are
//! resolved through the strategy the backend supports:
//!
//! - native-returning backends already shipped the rows in the execution
//!   response;
//! - generated-keys backends yield key values, which either satisfy an
//!   identity-only request directly or key one follow-up query;
//! - last-insert-id backends re-fetch the written row by the backend's row
//!   identifier;
//! - declared-columns backends shipped a pre-shaped cursor.
//!
//! The capability tag is computed once per execution and drives both the
//! prepare mode and the resolution path; the renderer consults the same
//! derivation, so no backend can be routed to mismatched branches.

use std::sync::Arc;

use crate::connection::{Connection, ExecMode};
use crate::dialect::ReturningMode;
use crate::error::{QueryError, QueryResult};
use crate::expr::Field;
use crate::render::RenderSettings;
use crate::row::{RecordSet, Row};
use crate::select::Select;
use crate::table::Table;
use crate::value::{Value, ValueKind};

/// What a statement's execution needs beyond its rendered SQL.
pub(crate) struct DmlPlan<'a> {
    pub table: &'a Table,
    pub returning: &'a [Field],
    pub settings: RenderSettings,
}

/// Execute rendered DML and resolve the requested returning fields.
///
/// Returns the affected-row count and, when returning fields were
/// requested, the resolved record set. With an empty returning set exactly
/// one backend round trip happens and no set is produced.
pub(crate) async fn execute_dml<C: Connection>(
    conn: &C,
    sql: String,
    params: Vec<Value>,
    plan: DmlPlan<'_>,
) -> QueryResult<(u64, Option<RecordSet>)> {
    let dialect = conn.dialect();

    if plan.returning.is_empty() {
        tracing::debug!(target: "quarry::exec", sql = %sql, binds = params.len(), "dml");
        let outcome = conn.execute(&sql, &params, ExecMode::Plain).await?;
        return Ok((outcome.rows_affected, None));
    }

    // Computed once; used for prepare and resolve alike.
    let mode = dialect.returning_mode();
    tracing::debug!(
        target: "quarry::exec",
        sql = %sql,
        binds = params.len(),
        mode = ?mode,
        "dml with returning"
    );

    match mode {
        ReturningMode::Native => {
            // The RETURNING clause is already embedded in the SQL text; the
            // statement executes like a query.
            let rows = conn.query(&sql, &params).await?;
            let affected = rows.len() as u64;
            let set = shape_rows(plan.returning, rows);
            Ok((affected, Some(set)))
        }

        ReturningMode::GeneratedKeys => {
            let outcome = conn.execute(&sql, &params, ExecMode::GeneratedKeys).await?;
            let set = resolve_generated_keys(conn, &plan, outcome.generated).await?;
            Ok((outcome.rows_affected, Some(set)))
        }

        ReturningMode::LastInsertId => {
            let outcome = conn.execute(&sql, &params, ExecMode::Plain).await?;
            let set = resolve_last_insert_id(conn, &plan).await?;
            Ok((outcome.rows_affected, Some(set)))
        }

        ReturningMode::DeclaredColumns => {
            // Declared names must match what the renderer would emit, so the
            // same identifier-case transform applies.
            let names: Vec<String> = plan
                .returning
                .iter()
                .map(|f| plan.settings.ident_case.apply(f.name()))
                .collect();
            let outcome = conn
                .execute(&sql, &params, ExecMode::DeclaredColumns(names))
                .await?;
            let rows = outcome.generated.unwrap_or_default();
            Ok((outcome.rows_affected, Some(shape_rows(plan.returning, rows))))
        }
    }
}

/// Resolve returning fields from captured generated-key values.
async fn resolve_generated_keys<C: Connection>(
    conn: &C,
    plan: &DmlPlan<'_>,
    generated: Option<Vec<Row>>,
) -> QueryResult<RecordSet> {
    // Some drivers illegally hand back no cursor at all; that is "zero
    // generated values", not an error.
    let key_rows = generated.unwrap_or_default();

    let identity = plan.table.identity_column().ok_or_else(|| {
        QueryError::contract(format!(
            "generated-keys returning on table '{}' requires an identity column",
            plan.table.name().tail()
        ))
    })?;

    let mut keys = Vec::with_capacity(key_rows.len());
    for row in &key_rows {
        let raw = row.value_at(0).cloned().unwrap_or(Value::Null);
        keys.push(raw.coerce(identity.kind())?);
    }

    if keys.is_empty() {
        return Ok(RecordSet::empty(shape_columns(plan.returning)));
    }

    // Only the identity value was requested: build the rows directly, no
    // follow-up round trip. The rows produced here must be byte-identical to
    // what the general path below would fetch for the identity column.
    if plan.returning.len() == 1
        && plan.returning[0].name().eq_ignore_ascii_case(identity.name())
    {
        let columns = shape_columns(plan.returning);
        let rows = keys
            .into_iter()
            .map(|key| Row::new(columns.clone(), vec![key]).expect("one column, one value"))
            .collect();
        return Ok(RecordSet::from_rows(columns, rows));
    }

    // Other fields were requested too: one follow-up query keyed on the
    // captured identity values. Fewer matching rows than keys is the
    // caller's concern, not ours.
    let id_field = Field::new(identity.ident().clone())?;
    let query = Select::new()
        .fields(plan.returning.iter().map(Field::unqualified))
        .from(plan.table)
        .filter(id_field.in_values(keys))
        .render_settings(plan.settings);
    tracing::debug!(target: "quarry::exec", "generated-keys follow-up select");
    let rows = query.fetch_all(conn).await?;
    Ok(shape_rows(plan.returning, rows))
}

/// Resolve returning fields by re-querying the backend's last-inserted-row
/// identifier.
async fn resolve_last_insert_id<C: Connection>(
    conn: &C,
    plan: &DmlPlan<'_>,
) -> QueryResult<RecordSet> {
    let dialect = conn.dialect();
    let rowid = dialect.row_identifier().ok_or_else(|| {
        QueryError::contract(format!(
            "dialect '{dialect}' took the last-insert-id path without a row identifier"
        ))
    })?;

    let id = conn.last_insert_id().await?;
    let id = match plan.table.identity_column() {
        Some(identity) => id.coerce(identity.kind())?,
        // Row identifiers are integral where this path exists.
        None => id.coerce(ValueKind::Int8)?,
    };

    let query = Select::new()
        .fields(plan.returning.iter().map(Field::unqualified))
        .from(plan.table)
        .filter(Field::new(rowid)?.eq(id))
        .render_settings(plan.settings);
    tracing::debug!(target: "quarry::exec", "last-insert-id follow-up select");
    let rows = query.fetch_all(conn).await?;
    Ok(shape_rows(plan.returning, rows))
}

fn shape_columns(returning: &[Field]) -> Arc<[String]> {
    returning
        .iter()
        .map(|f| f.name().to_string())
        .collect::<Vec<_>>()
        .into()
}

/// Normalize driver rows into the returning-field shape: one column per
/// requested field, in caller order, Null where the driver sent nothing.
fn shape_rows(returning: &[Field], rows: Vec<Row>) -> RecordSet {
    let columns = shape_columns(returning);
    let shaped = rows
        .into_iter()
        .map(|row| {
            let values = returning
                .iter()
                .map(|f| row.value_of(f.name()).cloned().unwrap_or(Value::Null))
                .collect();
            Row::new(columns.clone(), values).expect("shape matches by construction")
        })
        .collect();
    RecordSet::from_rows(columns, shaped)
}
