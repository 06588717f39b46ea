//! Target backend identity and capability classification.
//!
//! [`Dialect`] names the backend a statement is rendered for. Everything that
//! varies per backend (placeholder style, limit syntax, the returning
//! strategy) hangs off this one enum so there is a single dispatch point
//! instead of string-building scattered per backend.

use std::fmt;

/// Target database dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    Firebird,
    Sqlite,
    Mysql,
    Mariadb,
    H2,
    Derby,
    Hsqldb,
}

/// How a backend yields requested column values after an
/// INSERT/UPDATE/DELETE.
///
/// Computed once per execution via [`Dialect::returning_mode`] and threaded
/// through both the prepare and resolve phases; the renderer consults the
/// same derivation, so the three sites can never disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturningMode {
    /// The SQL text carries a native `RETURNING` clause and the statement
    /// executes like a query.
    Native,
    /// The driver captures auto-generated key values; non-key columns need a
    /// follow-up query.
    GeneratedKeys,
    /// No capture at all; the just-written row is re-fetched by the
    /// backend's last-insert row identifier.
    LastInsertId,
    /// The driver exposes arbitrary named columns after execution when they
    /// are declared up front.
    DeclaredColumns,
}

impl Dialect {
    /// The returning strategy this backend supports.
    pub fn returning_mode(self) -> ReturningMode {
        match self {
            Dialect::Postgres | Dialect::Firebird => ReturningMode::Native,
            Dialect::Mysql | Dialect::Mariadb | Dialect::H2 | Dialect::Derby => {
                ReturningMode::GeneratedKeys
            }
            Dialect::Sqlite => ReturningMode::LastInsertId,
            Dialect::Hsqldb => ReturningMode::DeclaredColumns,
        }
    }

    /// Write the bind placeholder for the 1-based parameter `idx`.
    pub(crate) fn write_placeholder(self, out: &mut String, idx: usize) {
        use std::fmt::Write;
        match self {
            Dialect::Postgres => {
                let _ = write!(out, "${}", idx);
            }
            _ => out.push('?'),
        }
    }

    /// The pseudo-column identifying the last-inserted row, for backends on
    /// the [`ReturningMode::LastInsertId`] path.
    pub(crate) fn row_identifier(self) -> Option<&'static str> {
        match self {
            Dialect::Sqlite => Some("_rowid_"),
            _ => None,
        }
    }

    /// Whether the backend accepts an explicit window frame clause
    /// (`ROWS BETWEEN ...`).
    pub fn supports_window_frames(self) -> bool {
        !matches!(self, Dialect::Derby)
    }

    /// Whether the backend has a conflict-ignore form for INSERT.
    pub fn supports_insert_ignore(self) -> bool {
        matches!(
            self,
            Dialect::Postgres | Dialect::Sqlite | Dialect::Mysql | Dialect::Mariadb
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::Firebird => "firebird",
            Dialect::Sqlite => "sqlite",
            Dialect::Mysql => "mysql",
            Dialect::Mariadb => "mariadb",
            Dialect::H2 => "h2",
            Dialect::Derby => "derby",
            Dialect::Hsqldb => "hsqldb",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
