use crate::events::EdaError;
use crate::table::{ColumnData, Table};

pub const REVENUE_COLUMN: &str = "revenue";

pub fn revenue(price: f64, quantity: f64, discount: f64) -> f64 {
    price * quantity * (1.0 - discount)
}

/// Append `revenue = price * quantity * (1 - discount)`.
///
/// Inputs are not range checked, so negative or out of range values carry
/// straight through. A null in any input gives a null revenue.
pub fn add_revenue(table: &mut Table) -> Result<(), EdaError> {
    let price = table.numeric("price")?;
    let quantity = table.numeric("quantity")?;
    let discount = table.numeric("discount")?;

    let values = price
        .iter()
        .zip(quantity.iter())
        .zip(discount.iter())
        .map(|((p, q), d)| match (p, q, d) {
            (Some(p), Some(q), Some(d)) => Some(revenue(*p, *q, *d)),
            _ => None,
        })
        .collect();

    table.push_column(REVENUE_COLUMN, ColumnData::Float(values));
    Ok(())
}
