//! # quarry
//!
//! A SQL-construction and execution library for Rust.
//!
//! Statements are composable in-memory trees, rendered into dialect-correct
//! SQL through a visitor context, executed against a backend driver, and,
//! for DML, resolved into a typed record set of the requested returning
//! columns regardless of what the backend natively supports.
//!
//! ## Features
//!
//! - **One rendering engine**: every fragment is a [`QueryPart`] visited by
//!   a [`RenderContext`] carrying the target [`Dialect`] and formatting
//!   settings; per-backend syntax lives behind that single dispatch point
//! - **Returning everywhere**: native `RETURNING`, driver generated-key
//!   capture, last-insert-id requery, and declared-column retrieval all end
//!   in the same post-condition: a [`RecordSet`] shaped by the requested
//!   fields
//! - **Persistent builders**: condition chains, window steps, and division
//!   steps never mutate their receiver
//! - **Type-safe mapping**: rows map to structs via the [`FromRow`] trait
//!
//! ## Example
//!
//! ```ignore
//! use quarry::{Insert, Table, ValueKind};
//!
//! let books = Table::new("books")?
//!     .identity("id", ValueKind::Int8)?
//!     .column("title", ValueKind::Text)?;
//!
//! let mut insert = Insert::into(&books)
//!     .set("title", "Dune")?
//!     .returning_identity();
//! insert.execute(&client).await?;
//! let id: i64 = insert.returned_record().unwrap().get("id")?;
//! ```

pub mod connection;
pub mod cte;
pub mod dialect;
pub mod divide;
pub mod dml;
pub mod error;
pub mod expr;
pub mod ident;
pub mod render;
pub mod row;
pub mod select;
pub mod table;
pub mod value;
pub mod window;

#[cfg(feature = "postgres")]
pub mod pg;

pub use connection::{Connection, ExecMode, ExecOutcome};
pub use cte::With;
pub use dialect::{Dialect, ReturningMode};
pub use divide::{DivideByStep, DivideOnStep, Division};
pub use dml::{Delete, Insert, Update};
pub use error::{QueryError, QueryResult};
pub use expr::{plain_sql, CmpOp, Condition, Field, IntoCondition, OrderField, PlainSql};
pub use ident::{Ident, IntoIdent};
pub use render::{
    render, IdentCase, KeywordCase, QueryPart, RenderContext, RenderSettings,
};
pub use row::{FromRow, RecordSet, Row};
pub use select::{FromItem, Select, SelectItem};
pub use table::{Column, Table};
pub use value::{FromValue, IntoValue, Value, ValueKind};
pub use window::{
    window, window_fn, FrameBound, WindowDef, WindowExpr, WindowFunc, WindowRowsAndStep,
    WindowSpec,
};

#[cfg(feature = "derive")]
pub use quarry_derive::FromRow;
