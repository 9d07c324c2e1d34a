//! Row building: the model's CSV line → the fixed five-column sheet row.

use crate::error::RowError;
use serde::Serialize;

/// Columns of the target worksheet, in order.
pub const COLUMNS: [&str; 5] = ["Link", "Name", "Phone", "Center", "Source"];

/// One worksheet row: the submitted link followed by the four extracted values.
///
/// Values are kept as text; the spreadsheet applies its own coercion
/// (`USER_ENTERED`) when the row is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetRow {
    pub link: String,
    pub name: String,
    pub phone: String,
    pub center: String,
    pub source: String,
}

impl SheetRow {
    /// Cell values in column order.
    pub fn values(&self) -> [&str; 5] {
        [
            &self.link,
            &self.name,
            &self.phone,
            &self.center,
            &self.source,
        ]
    }
}

/// Split `reply` on commas, trim each field, and prepend `original_link`.
///
/// The result must have exactly five fields. Anything else is rejected
/// rather than padded or truncated, so a misaligned row never reaches the
/// sheet.
pub fn build_row(reply: &str, original_link: &str) -> Result<SheetRow, RowError> {
    let fields: Vec<String> = std::iter::once(original_link.to_string())
        .chain(reply.split(',').map(|f| f.trim().to_string()))
        .collect();

    let [link, name, phone, center, source]: [String; 5] = fields
        .try_into()
        .map_err(|v: Vec<String>| RowError::UnexpectedFormat { fields: v.len() })?;

    Ok(SheetRow {
        link,
        name,
        phone,
        center,
        source,
    })
}
