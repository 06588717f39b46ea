//! DML statements (INSERT/UPDATE/DELETE) and the returning-value subsystem.
//!
//! Every statement follows the same pipeline: render once, classify the
//! backend's returning capability once, execute, then resolve the requested
//! returning fields through whichever strategy the backend supports. The
//! caller always ends up with the same post-condition: a [`RecordSet`]
//! shaped by the requested fields, in caller order, regardless of backend.
//!
//! [`RecordSet`]: crate::row::RecordSet

mod delete;
mod insert;
mod returning;
mod update;

pub use delete::Delete;
pub use insert::Insert;
pub use update::Update;

use crate::dialect::ReturningMode;
use crate::error::QueryResult;
use crate::expr::Field;
use crate::render::RenderContext;

/// Render the RETURNING clause for a statement.
///
/// Only native-returning backends get SQL text; every other backend resolves
/// returning values out of band, so an empty clause here is correct for
/// them. An empty field set renders nothing anywhere.
pub(crate) fn render_returning(ctx: &mut RenderContext, returning: &[Field]) -> QueryResult<()> {
    if returning.is_empty() {
        return Ok(());
    }
    if ctx.dialect().returning_mode() == ReturningMode::Native {
        ctx.separator().keyword("returning").separator();
        ctx.visit_list(returning, ", ")?;
    }
    Ok(())
}
