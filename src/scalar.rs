//! Custom scalar & enum registry (C1, §4.1).

use async_graphql::{Enum, InputValueError, InputValueResult, Scalar, ScalarType, Value};
use chrono::{DateTime, NaiveDateTime, Utc};

/// The exact wire format for every timestamp, per §3/§6: microsecond
/// precision, no timezone suffix.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

pub fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(s, DATETIME_FORMAT)
        .ok()
        .map(|ndt| ndt.and_utc())
}

pub fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

/// `DateTimeScalar`: serializes to the exact `%Y-%m-%dT%H:%M:%S.%f` wire
/// format; parsing a string literal in that format succeeds, parsing any
/// other literal kind is rejected (the source lets it silently become
/// `None` — we require the field to be declared `Option<DateTimeValue>`
/// wherever a client might reasonably supply a non-string literal, and
/// error rather than inject an ambiguous null; see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DateTimeValue(pub DateTime<Utc>);

#[Scalar(name = "DateTime")]
impl ScalarType for DateTimeValue {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::String(s) => parse_datetime(&s)
                .map(DateTimeValue)
                .ok_or_else(|| InputValueError::custom("invalid DateTime literal")),
            _ => Err(InputValueError::custom(
                "DateTime only accepts string literals",
            )),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(format_datetime(&self.0))
    }
}

/// `AnyScalar`: accepts any literal and preserves its shape. Booleans and
/// null get explicit cases rather than falling through to a raw
/// pass-through (§9's preserved-quirk note on the original's ambiguous
/// unrecognized-literal handling).
#[derive(Debug, Clone, PartialEq)]
pub struct AnyValue(pub Value);

#[Scalar(name = "Any")]
impl ScalarType for AnyValue {
    fn parse(value: Value) -> InputValueResult<Self> {
        let inner = match value {
            Value::Number(n) => Value::Number(n),
            Value::String(s) => Value::String(s),
            Value::Boolean(b) => Value::Boolean(b),
            Value::Null => Value::Null,
            other => other,
        };
        Ok(AnyValue(inner))
    }

    fn to_value(&self) -> Value {
        self.0.clone()
    }
}

#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOperator {
    Eq,
    Ge,
    Gt,
    Le,
    Lt,
    Ne,
}

impl FilterOperator {
    pub fn sql_op(self) -> &'static str {
        match self {
            FilterOperator::Eq => "=",
            FilterOperator::Ge => ">=",
            FilterOperator::Gt => ">",
            FilterOperator::Le => "<=",
            FilterOperator::Lt => "<",
            FilterOperator::Ne => "<>",
        }
    }
}

impl Default for FilterOperator {
    fn default() -> Self {
        FilterOperator::Eq
    }
}

/// Spelled `AESC`/`aesc`, not `ASC` — preserved intentionally; see
/// DESIGN.md's Open Questions entry.
#[derive(Enum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Aesc,
    Desc,
}

impl Default for SortDirection {
    fn default() -> Self {
        SortDirection::Aesc
    }
}

impl SortDirection {
    pub fn sql_suffix(self) -> &'static str {
        match self {
            SortDirection::Aesc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datetime_roundtrip() {
        let original = "2024-03-05T14:08:22.123456";
        let parsed = parse_datetime(original).unwrap();
        assert_eq!(format_datetime(&parsed), original);
    }

    #[test]
    fn test_datetime_roundtrip_zero_micros() {
        let original = "2024-01-01T00:00:00.000000";
        let parsed = parse_datetime(original).unwrap();
        assert_eq!(format_datetime(&parsed), original);
    }

    #[test]
    fn test_sort_direction_default_is_aesc() {
        assert_eq!(SortDirection::default(), SortDirection::Aesc);
    }
}
