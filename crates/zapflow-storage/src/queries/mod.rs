// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules over the raw connection.

pub mod leads;
pub mod messages;

use std::str::FromStr;

/// Parses a TEXT column into an enum, reporting a conversion failure
/// against the originating column index.
pub(crate) fn parse_col<T>(idx: usize, value: &str) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value.parse().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}
