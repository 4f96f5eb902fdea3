//! Row decoding and numeric normalization.
//!
//! This module turns raw procedure rows into model values. Every rule that changes a
//! number on its way to the caller lives here:
//! - NULL numeric cells decode to `0.0` (NULL text cells to `""`)
//! - textual numbers are parsed, then rounded per column
//! - store fractions are scaled to percentages
//!
//! # Architecture
//!
//! Decoding uses a two-phase approach, as for any MySQL column whose exact type the
//! procedure bodies are free to change:
//! 1. `ColumnKind` classifies the reported column type
//! 2. [`Numeric`], [`Integer`] and [`TextNumber`] pick the matching sqlx decoder

use crate::models::{Global, LastTwoSides, Order, ProfitSummary, ThreadIdentity, ThreadProfit};
use sqlx::mysql::{MySqlRow, MySqlTypeInfo, MySqlValueRef};
use sqlx::{Decode, MySql, Row, Type, TypeInfo, ValueRef};
use tracing::warn;

/// Decimal places kept for cumulative quote quantities.
pub const QUOTE_QUANTITY_PLACES: i32 = 2;

/// Decimal places kept for prices in order listings.
pub const PRICE_PLACES: i32 = 3;

/// Decimal places kept for dollar amounts.
pub const AMOUNT_PLACES: i32 = 2;

// =============================================================================
// Normalization
// =============================================================================

/// A NULL aggregate is surfaced as zero, never as an error or NaN.
pub fn null_safe(value: Option<f64>) -> f64 {
    value.unwrap_or(0.0)
}

/// Round half away from zero to `places` decimals.
pub fn round_places(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

/// Scale a `[0,1]` store fraction to a percentage.
pub fn fraction_to_percent(fraction: f64) -> f64 {
    fraction * 100.0
}

/// Parse a textually encoded number. Unparseable text is logged and read as zero.
pub fn parse_number(text: &str) -> f64 {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed.parse::<f64>() {
        Ok(v) => v,
        Err(e) => {
            warn!(value = %text, error = %e, "Failed to parse numeric text, using 0");
            0.0
        }
    }
}

/// Cumulative quote quantity from text, rounded to cents.
pub fn quote_quantity(text: &str) -> f64 {
    round_places(parse_number(text), QUOTE_QUANTITY_PLACES)
}

/// Price from text, rounded to three decimals.
pub fn price(text: &str) -> f64 {
    round_places(parse_number(text), PRICE_PLACES)
}

/// Executed quantity from text. Not rounded.
pub fn quantity(text: &str) -> f64 {
    parse_number(text)
}

// =============================================================================
// Column Classification
// =============================================================================

/// Logical category for MySQL column types that may carry a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Float,
    Double,
    Decimal,
    Signed,
    Unsigned,
    Text,
    /// BINARY, VARBINARY and BLOB, e.g. a `CAST(... AS CHAR)` under a binary charset
    Binary,
    Other,
}

/// Classify a MySQL type name, e.g. "BIGINT UNSIGNED" or "NEWDECIMAL".
pub fn column_kind(type_name: &str) -> ColumnKind {
    let upper = type_name.to_ascii_uppercase();

    // Decimal - check first, SUM() over DECIMAL columns lands here
    if upper.contains("DECIMAL") || upper.contains("NUMERIC") {
        return ColumnKind::Decimal;
    }

    if upper.contains("DOUBLE") || upper == "REAL" {
        return ColumnKind::Double;
    }

    if upper.contains("FLOAT") {
        return ColumnKind::Float;
    }

    if upper.contains("INT") || upper == "BOOLEAN" || upper == "YEAR" {
        if upper.contains("UNSIGNED") {
            return ColumnKind::Unsigned;
        }
        return ColumnKind::Signed;
    }

    if upper.contains("CHAR") || upper.contains("TEXT") || upper == "ENUM" {
        return ColumnKind::Text;
    }

    if upper.contains("BINARY") || upper.contains("BLOB") {
        return ColumnKind::Binary;
    }

    ColumnKind::Other
}

fn kind_of(value: &MySqlValueRef<'_>) -> (ColumnKind, String) {
    let name = value.type_info().name().to_string();
    (column_kind(&name), name)
}

/// Whether a column of this kind can hold a number, in binary or textual form.
pub fn holds_number(kind: ColumnKind) -> bool {
    kind != ColumnKind::Other
}

/// Text of a textual or binary cell.
fn cell_text<'r>(
    kind: ColumnKind,
    value: MySqlValueRef<'r>,
) -> Result<&'r str, sqlx::error::BoxDynError> {
    match kind {
        ColumnKind::Binary => {
            let bytes = <&[u8] as Decode<MySql>>::decode(value)?;
            Ok(std::str::from_utf8(bytes)?)
        }
        _ => <&str as Decode<MySql>>::decode(value),
    }
}

// =============================================================================
// Decoders
// =============================================================================

/// Any numeric or numeric-text column read as `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Numeric(pub f64);

impl Type<MySql> for Numeric {
    fn type_info() -> MySqlTypeInfo {
        <f64 as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        holds_number(column_kind(ty.name()))
    }
}

impl<'r> Decode<'r, MySql> for Numeric {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let (kind, name) = kind_of(&value);
        let v = match kind {
            ColumnKind::Double => <f64 as Decode<MySql>>::decode(value)?,
            ColumnKind::Float => <f32 as Decode<MySql>>::decode(value)? as f64,
            ColumnKind::Signed => <i64 as Decode<MySql>>::decode(value)? as f64,
            ColumnKind::Unsigned => <u64 as Decode<MySql>>::decode(value)? as f64,
            ColumnKind::Decimal | ColumnKind::Text | ColumnKind::Binary => {
                cell_text(kind, value)?.trim().parse::<f64>()?
            }
            ColumnKind::Other => return Err(format!("{} is not numeric", name).into()),
        };
        Ok(Numeric(v))
    }
}

/// Any integer-valued column read as `i64` (counts, identifiers, timestamps).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Integer(pub i64);

impl Type<MySql> for Integer {
    fn type_info() -> MySqlTypeInfo {
        <i64 as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        holds_number(column_kind(ty.name()))
    }
}

impl<'r> Decode<'r, MySql> for Integer {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let (kind, name) = kind_of(&value);
        let v = match kind {
            ColumnKind::Signed => <i64 as Decode<MySql>>::decode(value)?,
            ColumnKind::Unsigned => i64::try_from(<u64 as Decode<MySql>>::decode(value)?)?,
            ColumnKind::Double => <f64 as Decode<MySql>>::decode(value)?.round() as i64,
            ColumnKind::Float => <f32 as Decode<MySql>>::decode(value)?.round() as i64,
            ColumnKind::Decimal | ColumnKind::Text | ColumnKind::Binary => {
                let text = cell_text(kind, value)?.trim();
                match text.parse::<i64>() {
                    Ok(v) => v,
                    Err(_) => text.parse::<f64>()?.round() as i64,
                }
            }
            ColumnKind::Other => return Err(format!("{} is not an integer", name).into()),
        };
        Ok(Integer(v))
    }
}

/// Raw text of a numeric column, preserved for [`parse_number`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextNumber(pub String);

impl Type<MySql> for TextNumber {
    fn type_info() -> MySqlTypeInfo {
        <String as Type<MySql>>::type_info()
    }

    fn compatible(ty: &MySqlTypeInfo) -> bool {
        holds_number(column_kind(ty.name()))
    }
}

impl<'r> Decode<'r, MySql> for TextNumber {
    fn decode(value: MySqlValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let (kind, name) = kind_of(&value);
        let text = match kind {
            ColumnKind::Decimal | ColumnKind::Text | ColumnKind::Binary => {
                cell_text(kind, value)?.to_string()
            }
            ColumnKind::Other => return Err(format!("{} cannot hold a number", name).into()),
            _ => <Numeric as Decode<MySql>>::decode(value)?.0.to_string(),
        };
        Ok(TextNumber(text))
    }
}

// =============================================================================
// Cell Helpers
// =============================================================================

/// Null-safe numeric cell.
pub fn number(row: &MySqlRow, idx: usize) -> Result<f64, sqlx::Error> {
    let value = row.try_get::<Option<Numeric>, _>(idx)?;
    Ok(null_safe(value.map(|n| n.0)))
}

/// Null-safe integer cell.
pub fn integer(row: &MySqlRow, idx: usize) -> Result<i64, sqlx::Error> {
    let value = row.try_get::<Option<Integer>, _>(idx)?;
    Ok(value.map(|n| n.0).unwrap_or(0))
}

/// Null-safe text cell.
pub fn text(row: &MySqlRow, idx: usize) -> Result<String, sqlx::Error> {
    let value = row.try_get::<Option<String>, _>(idx)?;
    Ok(value.unwrap_or_default())
}

/// Null-safe textual number cell.
pub fn number_text(row: &MySqlRow, idx: usize) -> Result<String, sqlx::Error> {
    let value = row.try_get::<Option<TextNumber>, _>(idx)?;
    Ok(value.map(|t| t.0).unwrap_or_default())
}

/// Boolean flag stored as TINYINT(1) or any other number.
pub fn flag(row: &MySqlRow, idx: usize) -> Result<bool, sqlx::Error> {
    Ok(number(row, idx)? != 0.0)
}

// =============================================================================
// Row Shapes
// =============================================================================

/// `(threadID, threadIDSession)`
pub fn thread_identity(row: &MySqlRow) -> Result<ThreadIdentity, sqlx::Error> {
    Ok(ThreadIdentity::new(text(row, 0)?, text(row, 1)?))
}

/// `(threadID, status)`
pub fn session_status(row: &MySqlRow) -> Result<(String, bool), sqlx::Error> {
    Ok((text(row, 0)?, flag(row, 1)?))
}

/// `(cumulativeQuoteQty, orderID, price, executedQty, transactTime)`
pub fn order_snapshot(row: &MySqlRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        cumulative_quote_quantity: number(row, 0)?,
        order_id: integer(row, 1)?,
        price: number(row, 2)?,
        executed_quantity: number(row, 3)?,
        transact_time: integer(row, 4)?,
        ..Order::default()
    })
}

/// `(orderID, price, executedQty, cumulativeQuoteQty, transactTime)`
pub fn order_by_id(row: &MySqlRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        order_id: integer(row, 0)?,
        price: number(row, 1)?,
        executed_quantity: number(row, 2)?,
        cumulative_quote_quantity: number(row, 3)?,
        transact_time: integer(row, 4)?,
        ..Order::default()
    })
}

/// `(orderID, symbol)`
pub fn order_pending(row: &MySqlRow) -> Result<Order, sqlx::Error> {
    Ok(Order {
        order_id: integer(row, 0)?,
        symbol: text(row, 1)?,
        ..Order::default()
    })
}

/// `(orderID, cumulativeQuoteQty, price, executedQty)` with textual numbers.
pub fn order_listing(row: &MySqlRow) -> Result<Order, sqlx::Error> {
    let order_id = integer(row, 0)?;
    let cumulative_quote_quantity = number_text(row, 1)?;
    let order_price = number_text(row, 2)?;
    let executed_quantity = number_text(row, 3)?;

    Ok(Order {
        order_id,
        cumulative_quote_quantity: quote_quantity(&cumulative_quote_quantity),
        price: price(&order_price),
        executed_quantity: quantity(&executed_quantity),
        ..Order::default()
    })
}

/// `(side1, side2)`
pub fn last_two_sides(row: &MySqlRow) -> Result<LastTwoSides, sqlx::Error> {
    Ok(LastTwoSides {
        side1: text(row, 0)?,
        side2: text(row, 1)?,
    })
}

/// `(profit, profitNet, profitPct, transactTime)`
pub fn global(row: &MySqlRow) -> Result<Global, sqlx::Error> {
    Ok(Global {
        profit: number(row, 0)?,
        profit_net: number(row, 1)?,
        profit_pct: number(row, 2)?,
        transact_time: integer(row, 3)?,
    })
}

/// `(profit, profitNet, fraction)`
pub fn profit_summary(row: &MySqlRow) -> Result<ProfitSummary, sqlx::Error> {
    Ok(ProfitSummary {
        profit: number(row, 0)?,
        profit_net: number(row, 1)?,
        percentage: fraction_to_percent(number(row, 2)?),
    })
}

/// `(fiat, fraction)`
pub fn thread_profit(row: &MySqlRow) -> Result<ThreadProfit, sqlx::Error> {
    Ok(ThreadProfit {
        fiat: number(row, 0)?,
        percentage: fraction_to_percent(number(row, 1)?),
    })
}
