//! PostgreSQL to JSON value mapping.
//!
//! Rows are turned into positional JSON arrays aligned with the column list.
//! Type conversion uses a two-phase approach:
//! 1. `TypeCategory` classifies the column's type name
//! 2. A decoder per category extracts the value
//!
//! Values that cannot be decoded become `null` and are logged at debug level.

use bigdecimal::BigDecimal;
use ipnetwork::IpNetwork;
use serde_json::Value as JsonValue;
use sqlx::postgres::types::{Oid, PgInterval, PgMoney, PgTimeTz};
use sqlx::postgres::{PgRow, PgValueFormat, PgValueRef};
use sqlx::{Column, Decode, Postgres, Row, Type, TypeInfo, ValueRef};
use tracing::debug;

/// Logical category for PostgreSQL column types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    SmallInt,
    Integer,
    BigInt,
    Oid,
    Real,
    Double,
    /// NUMERIC/DECIMAL, rendered as an exact string
    Decimal,
    Money,
    Boolean,
    /// The single-byte `"char"` type
    Char,
    Json,
    Uuid,
    Binary,
    Timestamp,
    TimestampTz,
    Date,
    Time,
    TimeTz,
    Interval,
    Inet,
    Cidr,
    Text,
    TextArray,
    SmallIntArray,
    IntegerArray,
    BigIntArray,
    BooleanArray,
    RealArray,
    DoubleArray,
    DecimalArray,
    JsonArray,
    UuidArray,
    DateArray,
    TimestampArray,
    TimestampTzArray,
    Unknown,
}

/// Classify a PostgreSQL type name (as reported by the driver) into a category.
pub fn categorize_type(type_name: &str) -> TypeCategory {
    let lower = type_name.to_ascii_lowercase();

    if let Some(element) = lower.strip_suffix("[]") {
        return match element {
            "text" | "varchar" | "name" | "char" | "bpchar" => TypeCategory::TextArray,
            "int2" => TypeCategory::SmallIntArray,
            "int4" => TypeCategory::IntegerArray,
            "int8" => TypeCategory::BigIntArray,
            "bool" => TypeCategory::BooleanArray,
            "float4" => TypeCategory::RealArray,
            "float8" => TypeCategory::DoubleArray,
            "numeric" => TypeCategory::DecimalArray,
            "jsonb" => TypeCategory::JsonArray,
            "uuid" => TypeCategory::UuidArray,
            "date" => TypeCategory::DateArray,
            "timestamp" => TypeCategory::TimestampArray,
            "timestamptz" => TypeCategory::TimestampTzArray,
            _ => TypeCategory::Unknown,
        };
    }

    match lower.as_str() {
        "int2" | "smallint" | "smallserial" => TypeCategory::SmallInt,
        "int4" | "int" | "integer" | "serial" => TypeCategory::Integer,
        "int8" | "bigint" | "bigserial" => TypeCategory::BigInt,
        "oid" => TypeCategory::Oid,
        "float4" | "real" => TypeCategory::Real,
        "float8" | "double precision" => TypeCategory::Double,
        "numeric" | "decimal" => TypeCategory::Decimal,
        "money" => TypeCategory::Money,
        "bool" | "boolean" => TypeCategory::Boolean,
        "\"char\"" => TypeCategory::Char,
        "json" | "jsonb" => TypeCategory::Json,
        "uuid" => TypeCategory::Uuid,
        "bytea" => TypeCategory::Binary,
        "timestamp" => TypeCategory::Timestamp,
        "timestamptz" => TypeCategory::TimestampTz,
        "date" => TypeCategory::Date,
        "time" => TypeCategory::Time,
        "timetz" => TypeCategory::TimeTz,
        "interval" => TypeCategory::Interval,
        "inet" => TypeCategory::Inet,
        "cidr" => TypeCategory::Cidr,
        "text" | "varchar" | "name" | "char" | "bpchar" | "citext" | "unknown" => {
            TypeCategory::Text
        }
        _ => TypeCategory::Unknown,
    }
}

/// Column names in result order, as reported by the server.
pub fn column_names(row: &PgRow) -> Vec<String> {
    row.columns().iter().map(|c| c.name().to_string()).collect()
}

/// Decode every column of a row into a positional JSON array.
pub fn row_to_values(row: &PgRow) -> Vec<JsonValue> {
    row.columns()
        .iter()
        .map(|col| {
            let type_name = col.type_info().name();
            decode_column(row, col.ordinal(), type_name, categorize_type(type_name))
        })
        .collect()
}

fn decode_column(row: &PgRow, idx: usize, type_name: &str, category: TypeCategory) -> JsonValue {
    match category {
        TypeCategory::SmallInt => decode_with(row, idx, type_name, |v: i16| v.into()),
        TypeCategory::Integer => decode_with(row, idx, type_name, |v: i32| v.into()),
        TypeCategory::BigInt => decode_with(row, idx, type_name, |v: i64| v.into()),
        TypeCategory::Oid => decode_with(row, idx, type_name, |v: Oid| v.0.into()),
        TypeCategory::Real => decode_with(row, idx, type_name, |v: f32| float(v as f64)),
        TypeCategory::Double => decode_with(row, idx, type_name, float),
        TypeCategory::Decimal => decode_numeric(row, idx, type_name),
        TypeCategory::Money => decode_with(row, idx, type_name, |v: PgMoney| money(v.0)),
        TypeCategory::Boolean => decode_with(row, idx, type_name, JsonValue::Bool),
        TypeCategory::Char => decode_with(row, idx, type_name, |v: i8| {
            JsonValue::String(char::from(v as u8).to_string())
        }),
        TypeCategory::Json => decode_with(row, idx, type_name, |v: JsonValue| v),
        TypeCategory::Uuid => {
            decode_with(row, idx, type_name, |v: uuid::Uuid| JsonValue::String(v.to_string()))
        }
        TypeCategory::Binary => decode_with(row, idx, type_name, |v: Vec<u8>| binary(&v)),
        TypeCategory::Timestamp => decode_with(row, idx, type_name, timestamp),
        TypeCategory::TimestampTz => decode_with(row, idx, type_name, timestamptz),
        TypeCategory::Date => decode_with(row, idx, type_name, |v: chrono::NaiveDate| {
            JsonValue::String(v.to_string())
        }),
        TypeCategory::Time => decode_with(row, idx, type_name, |v: chrono::NaiveTime| {
            JsonValue::String(v.to_string())
        }),
        TypeCategory::TimeTz => decode_with(
            row,
            idx,
            type_name,
            |v: PgTimeTz<chrono::NaiveTime, chrono::FixedOffset>| {
                JsonValue::String(format!("{}{}", v.time, v.offset))
            },
        ),
        TypeCategory::Interval => {
            decode_with(row, idx, type_name, |v: PgInterval| JsonValue::String(interval(&v)))
        }
        TypeCategory::Inet => decode_with(row, idx, type_name, |v: IpNetwork| inet(v, false)),
        TypeCategory::Cidr => decode_with(row, idx, type_name, |v: IpNetwork| inet(v, true)),
        TypeCategory::TextArray => decode_with(row, idx, type_name, |v: Vec<Option<String>>| {
            array(v, JsonValue::String)
        }),
        TypeCategory::SmallIntArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<i16>>| array(v, JsonValue::from))
        }
        TypeCategory::IntegerArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<i32>>| array(v, JsonValue::from))
        }
        TypeCategory::BigIntArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<i64>>| array(v, JsonValue::from))
        }
        TypeCategory::BooleanArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<bool>>| array(v, JsonValue::Bool))
        }
        TypeCategory::RealArray => decode_with(row, idx, type_name, |v: Vec<Option<f32>>| {
            array(v, |f| float(f as f64))
        }),
        TypeCategory::DoubleArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<f64>>| array(v, float))
        }
        // Elements skip the display-scale step; trailing zeros are dropped.
        TypeCategory::DecimalArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<BigDecimal>>| {
                array(v, |d| JsonValue::String(d.normalized().to_plain_string()))
            })
        }
        TypeCategory::JsonArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<JsonValue>>| array(v, |j| j))
        }
        TypeCategory::UuidArray => decode_with(row, idx, type_name, |v: Vec<Option<uuid::Uuid>>| {
            array(v, |u| JsonValue::String(u.to_string()))
        }),
        TypeCategory::DateArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<chrono::NaiveDate>>| {
                array(v, |d| JsonValue::String(d.to_string()))
            })
        }
        TypeCategory::TimestampArray => {
            decode_with(row, idx, type_name, |v: Vec<Option<chrono::NaiveDateTime>>| {
                array(v, timestamp)
            })
        }
        TypeCategory::TimestampTzArray => decode_with(
            row,
            idx,
            type_name,
            |v: Vec<Option<chrono::DateTime<chrono::Utc>>>| array(v, timestamptz),
        ),
        TypeCategory::Text | TypeCategory::Unknown => {
            decode_with(row, idx, type_name, JsonValue::String)
        }
    }
}

/// Decode column `idx` as `T` and map it to JSON. NULL stays `null`.
fn decode_with<'r, T, F>(row: &'r PgRow, idx: usize, type_name: &str, f: F) -> JsonValue
where
    T: Decode<'r, Postgres> + Type<Postgres>,
    F: FnOnce(T) -> JsonValue,
{
    match row.try_get::<Option<T>, _>(idx) {
        Ok(Some(v)) => f(v),
        Ok(None) => JsonValue::Null,
        Err(e) => {
            debug!(column = idx, type_name = %type_name, error = %e, "Failed to decode column");
            JsonValue::Null
        }
    }
}

/// Sign word values of the binary NUMERIC header.
const NUMERIC_NAN: u16 = 0xC000;
const NUMERIC_POS_INF: u16 = 0xD000;
const NUMERIC_NEG_INF: u16 = 0xF000;

/// Decode NUMERIC at any precision, keeping the column's display scale.
///
/// Special values (`NaN`, `Infinity`, `-Infinity`) are returned as strings.
fn decode_numeric(row: &PgRow, idx: usize, type_name: &str) -> JsonValue {
    let value = match row.try_get_raw(idx) {
        Ok(value) => value,
        Err(e) => {
            debug!(column = idx, type_name = %type_name, error = %e, "Failed to read column");
            return JsonValue::Null;
        }
    };
    if value.is_null() {
        return JsonValue::Null;
    }

    match numeric_to_string(value) {
        Ok(s) => JsonValue::String(s),
        Err(e) => {
            debug!(column = idx, type_name = %type_name, error = %e, "Failed to decode column");
            JsonValue::Null
        }
    }
}

fn numeric_to_string(value: PgValueRef<'_>) -> Result<String, sqlx::error::BoxDynError> {
    if value.format() == PgValueFormat::Text {
        return Ok(value.as_str()?.to_string());
    }

    let bytes = value.as_bytes()?;
    let header = NumericHeader::parse(bytes).ok_or("NUMERIC value shorter than its header")?;
    match header.sign {
        NUMERIC_NAN => return Ok("NaN".to_string()),
        NUMERIC_POS_INF => return Ok("Infinity".to_string()),
        NUMERIC_NEG_INF => return Ok("-Infinity".to_string()),
        _ => {}
    }

    let decimal = <BigDecimal as Decode<'_, Postgres>>::decode(value)?;
    Ok(decimal.with_scale(i64::from(header.dscale)).to_plain_string())
}

/// The fixed part of a binary NUMERIC: ndigits, weight, sign, dscale.
#[derive(Debug, PartialEq, Eq)]
struct NumericHeader {
    sign: u16,
    dscale: u16,
}

impl NumericHeader {
    fn parse(bytes: &[u8]) -> Option<Self> {
        let word = |at: usize| Some(u16::from_be_bytes([*bytes.get(at)?, *bytes.get(at + 1)?]));
        Some(Self {
            sign: word(4)?,
            dscale: word(6)?,
        })
    }
}

/// Finite floats become numbers; NaN and infinities become strings.
fn float(v: f64) -> JsonValue {
    serde_json::Number::from_f64(v)
        .map(JsonValue::Number)
        .unwrap_or_else(|| JsonValue::String(v.to_string()))
}

fn timestamp(v: chrono::NaiveDateTime) -> JsonValue {
    JsonValue::String(v.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
}

fn timestamptz(v: chrono::DateTime<chrono::Utc>) -> JsonValue {
    JsonValue::String(v.to_rfc3339())
}

/// MONEY is a count of cents; render it with two fraction digits.
fn money(cents: i64) -> JsonValue {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    JsonValue::String(format!("{sign}{}.{:02}", abs / 100, abs % 100))
}

/// Render an interval the way PostgreSQL's default `postgres` style does,
/// e.g. `1 year 2 mons 3 days 04:05:06.5`.
fn interval(v: &PgInterval) -> String {
    fn unit(n: i64, singular: &str, plural: &str) -> String {
        format!("{n} {}", if n == 1 { singular } else { plural })
    }

    let mut parts = Vec::new();
    let years = i64::from(v.months / 12);
    let months = i64::from(v.months % 12);
    if years != 0 {
        parts.push(unit(years, "year", "years"));
    }
    if months != 0 {
        parts.push(unit(months, "mon", "mons"));
    }
    if v.days != 0 {
        parts.push(unit(i64::from(v.days), "day", "days"));
    }

    if v.microseconds != 0 || parts.is_empty() {
        let sign = if v.microseconds < 0 { "-" } else { "" };
        let total = v.microseconds.unsigned_abs();
        let secs = total / 1_000_000;
        let micros = total % 1_000_000;
        let mut clock = format!("{sign}{:02}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60);
        if micros != 0 {
            let fraction = format!("{micros:06}");
            clock.push('.');
            clock.push_str(fraction.trim_end_matches('0'));
        }
        parts.push(clock);
    }
    parts.join(" ")
}

/// `inet` hides a host-length prefix; `cidr` always shows it.
fn inet(network: IpNetwork, always_prefix: bool) -> JsonValue {
    let host_prefix = if network.is_ipv4() { 32 } else { 128 };
    if always_prefix || network.prefix() != host_prefix {
        JsonValue::String(network.to_string())
    } else {
        JsonValue::String(network.ip().to_string())
    }
}

fn array<T>(values: Vec<Option<T>>, f: impl Fn(T) -> JsonValue) -> JsonValue {
    JsonValue::Array(
        values
            .into_iter()
            .map(|v| v.map(&f).unwrap_or(JsonValue::Null))
            .collect(),
    )
}

/// BYTEA values are returned base64-encoded.
fn binary(bytes: &[u8]) -> JsonValue {
    use base64::{Engine as _, engine::general_purpose::STANDARD};
    JsonValue::String(STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_integers() {
        assert_eq!(categorize_type("INT2"), TypeCategory::SmallInt);
        assert_eq!(categorize_type("INT4"), TypeCategory::Integer);
        assert_eq!(categorize_type("INT8"), TypeCategory::BigInt);
        assert_eq!(categorize_type("OID"), TypeCategory::Oid);
    }

    #[test]
    fn test_categorize_numeric_is_decimal() {
        assert_eq!(categorize_type("NUMERIC"), TypeCategory::Decimal);
        assert_eq!(categorize_type("FLOAT8"), TypeCategory::Double);
        assert_eq!(categorize_type("FLOAT4"), TypeCategory::Real);
    }

    #[test]
    fn test_categorize_temporal() {
        assert_eq!(categorize_type("TIMESTAMPTZ"), TypeCategory::TimestampTz);
        assert_eq!(categorize_type("TIMESTAMP"), TypeCategory::Timestamp);
        assert_eq!(categorize_type("DATE"), TypeCategory::Date);
        assert_eq!(categorize_type("TIME"), TypeCategory::Time);
    }

    #[test]
    fn test_categorize_text_like() {
        for name in ["TEXT", "VARCHAR", "NAME", "CHAR", "BPCHAR"] {
            assert_eq!(categorize_type(name), TypeCategory::Text, "{name}");
        }
    }

    #[test]
    fn test_categorize_arrays() {
        assert_eq!(categorize_type("TEXT[]"), TypeCategory::TextArray);
        assert_eq!(categorize_type("INT4[]"), TypeCategory::IntegerArray);
        assert_eq!(categorize_type("INT8[]"), TypeCategory::BigIntArray);
        assert_eq!(categorize_type("BOOL[]"), TypeCategory::BooleanArray);
        assert_eq!(categorize_type("FLOAT8[]"), TypeCategory::DoubleArray);
        assert_eq!(categorize_type("INT2[]"), TypeCategory::SmallIntArray);
        assert_eq!(categorize_type("FLOAT4[]"), TypeCategory::RealArray);
        assert_eq!(categorize_type("NUMERIC[]"), TypeCategory::DecimalArray);
        assert_eq!(categorize_type("TIMESTAMPTZ[]"), TypeCategory::TimestampTzArray);
        assert_eq!(categorize_type("INTERVAL[]"), TypeCategory::Unknown);
    }

    #[test]
    fn test_categorize_other() {
        assert_eq!(categorize_type("JSONB"), TypeCategory::Json);
        assert_eq!(categorize_type("UUID"), TypeCategory::Uuid);
        assert_eq!(categorize_type("BYTEA"), TypeCategory::Binary);
        assert_eq!(categorize_type("BOOL"), TypeCategory::Boolean);
        assert_eq!(categorize_type("INTERVAL"), TypeCategory::Interval);
        assert_eq!(categorize_type("TIMETZ"), TypeCategory::TimeTz);
        assert_eq!(categorize_type("MONEY"), TypeCategory::Money);
        assert_eq!(categorize_type("INET"), TypeCategory::Inet);
        assert_eq!(categorize_type("CIDR"), TypeCategory::Cidr);
        assert_eq!(categorize_type("\"CHAR\""), TypeCategory::Char);
        assert_eq!(categorize_type("POINT"), TypeCategory::Unknown);
    }

    #[test]
    fn test_numeric_header_special_values() {
        // ndigits, weight, sign, dscale
        let nan = [0, 0, 0, 0, 0xC0, 0x00, 0, 0];
        assert_eq!(NumericHeader::parse(&nan).unwrap().sign, NUMERIC_NAN);

        let scaled = [0, 1, 0, 0, 0x40, 0x00, 0, 2, 0, 1];
        let header = NumericHeader::parse(&scaled).unwrap();
        assert_eq!(header.sign, 0x4000);
        assert_eq!(header.dscale, 2);

        assert_eq!(NumericHeader::parse(&[0, 0, 0]), None);
    }

    #[test]
    fn test_interval_formatting() {
        let iv = |months, days, microseconds| PgInterval {
            months,
            days,
            microseconds,
        };
        assert_eq!(interval(&iv(0, 1, 0)), "1 day");
        assert_eq!(interval(&iv(14, 3, 0)), "1 year 2 mons 3 days");
        assert_eq!(interval(&iv(0, 0, 3_723_500_000)), "01:02:03.5");
        assert_eq!(interval(&iv(0, 0, 0)), "00:00:00");
        assert_eq!(interval(&iv(0, -2, -60_000_000)), "-2 days -00:01:00");
    }

    #[test]
    fn test_money_formatting() {
        assert_eq!(money(1250), serde_json::json!("12.50"));
        assert_eq!(money(-5), serde_json::json!("-0.05"));
        assert_eq!(money(0), serde_json::json!("0.00"));
    }

    #[test]
    fn test_inet_prefix_display() {
        let host: IpNetwork = "10.0.0.1/32".parse().unwrap();
        let net: IpNetwork = "10.0.0.0/8".parse().unwrap();
        assert_eq!(inet(host, false), serde_json::json!("10.0.0.1"));
        assert_eq!(inet(host, true), serde_json::json!("10.0.0.1/32"));
        assert_eq!(inet(net, false), serde_json::json!("10.0.0.0/8"));
    }

    #[test]
    fn test_float_non_finite() {
        assert_eq!(float(1.5), serde_json::json!(1.5));
        assert_eq!(float(f64::NAN), JsonValue::String("NaN".to_string()));
        assert_eq!(float(f64::INFINITY), JsonValue::String("inf".to_string()));
    }

    #[test]
    fn test_array_preserves_nulls() {
        let v = array(vec![Some(1i32), None, Some(3)], JsonValue::from);
        assert_eq!(v, serde_json::json!([1, null, 3]));
    }

    #[test]
    fn test_binary_is_base64() {
        assert_eq!(binary(b"hi"), JsonValue::String("aGk=".to_string()));
    }
}
