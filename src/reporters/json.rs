//! JSON reporter
//!
//! Outputs results as pretty-printed JSON for piping to jq or further
//! processing. Infinite and NaN values have no JSON number form and are
//! written as the strings `"inf"`, `"-inf"` and `"NaN"`.

use anyhow::Result;
use serde::Serialize;

/// Render any serialisable result as JSON
pub fn render<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
