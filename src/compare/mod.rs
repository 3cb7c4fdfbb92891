//! Side-by-side comparison of two products.
//!
//! [`merge`] walks both feature trees and flattens them into [`Row`]s,
//! [`render`] turns those rows into a [`ComparisonTable`] that can be printed
//! as HTML or as a terminal table.

mod merge;
mod render;

pub use merge::{merge, Label, Row, MISSING};
pub use render::{render, ComparisonTable, DefinitionLink, DisplayCell, DisplayRow, RowStyle};

use crate::product::{Definitions, Product};

/// Merges and renders two products of `category` in one step.
pub fn compare(
    category: &str,
    product1: &Product,
    product2: &Product,
    definitions: &Definitions,
) -> ComparisonTable {
    let rows = merge(category, product1, product2, definitions);
    render(category, &product1.name, &product2.name, &rows)
}
