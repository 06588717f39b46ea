//! Driver interface.
//!
//! [`Connection`] is what a backend adapter implements: prepare-and-run a
//! statement from SQL text plus ordered bind values. It also carries the
//! backend identity tag, which is the single input to the returning-mode
//! classification. Connection pooling and wire protocol live below this
//! trait and are out of scope here.

use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::row::Row;
use crate::value::Value;

/// How a DML command should be prepared with respect to returned values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecMode {
    /// Plain command; only the affected-row count matters.
    Plain,
    /// Ask the driver to capture auto-generated key values.
    GeneratedKeys,
    /// Declare the named columns the driver must expose after execution.
    /// Names carry the identifier casing the renderer would emit.
    DeclaredColumns(Vec<String>),
}

/// The result of a DML execution.
#[derive(Debug, Clone, Default)]
pub struct ExecOutcome {
    pub rows_affected: u64,
    /// Generated-key or declared-column rows, when the mode requested them.
    /// `None` from a nonconforming driver means "no extra values", never an
    /// error.
    pub generated: Option<Vec<Row>>,
}

impl ExecOutcome {
    /// An outcome with only an affected-row count.
    pub fn affected(rows_affected: u64) -> Self {
        Self {
            rows_affected,
            generated: None,
        }
    }
}

/// An active backend connection handle.
///
/// A statement issues at most one outstanding call at a time on a given
/// connection; any follow-up query runs strictly after the primary command
/// completes. Implementations must not retry: every failure propagates to
/// the caller unchanged.
pub trait Connection: Send + Sync {
    /// The backend this connection talks to.
    fn dialect(&self) -> Dialect;

    /// Run a query and materialize all result rows.
    fn query(
        &self,
        sql: &str,
        params: &[Value],
    ) -> impl std::future::Future<Output = QueryResult<Vec<Row>>> + Send;

    /// Run a DML command prepared per `mode`.
    fn execute(
        &self,
        sql: &str,
        params: &[Value],
        mode: ExecMode,
    ) -> impl std::future::Future<Output = QueryResult<ExecOutcome>> + Send;

    /// The backend's last-inserted-row identifier.
    ///
    /// Only meaningful for backends on the last-insert-id returning path;
    /// the default refuses.
    fn last_insert_id(&self) -> impl std::future::Future<Output = QueryResult<Value>> + Send {
        async {
            Err(QueryError::contract(
                "this backend does not expose a last-insert identifier",
            ))
        }
    }
}
