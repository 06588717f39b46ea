//! Derive macros for quarry
//!
//! Provides `#[derive(FromRow)]`.

use proc_macro::TokenStream;
use syn::{parse_macro_input, DeriveInput};

mod from_row;

/// Derive `FromRow` trait for a struct.
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
///
/// # Attributes
///
/// - `#[quarry(column = "name")]` - Map field to a different column name
#[proc_macro_derive(FromRow, attributes(quarry))]
pub fn derive_from_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    from_row::expand(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
