//! Defines the column type tags used on disk and the runtime value enum
//! records are built from.
//!
//! `ColumnType` is a small, Copy enum naming what a column may hold.
//! `Value` is a tagged variant wide enough to hold any column's runtime
//! literal.

use crate::error::Error;
use chrono::{DateTime, NaiveDate, Utc};

/// Stable on-disk tag values. Never renumber these: existing table
/// files encode columns with these exact codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Int = 0,
    Varchar = 1,
    Date = 2,
    Timestamp = 3,
    Float = 4,
    Json = 5,
}

impl ColumnType {
    pub fn from_tag(tag: u16) -> Result<Self, Error> {
        match tag {
            0 => Ok(ColumnType::Int),
            1 => Ok(ColumnType::Varchar),
            2 => Ok(ColumnType::Date),
            3 => Ok(ColumnType::Timestamp),
            4 => Ok(ColumnType::Float),
            5 => Ok(ColumnType::Json),
            _ => Err(Error::Decode(format!("unknown column type tag {tag}"))),
        }
    }

    pub fn to_tag(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            ColumnType::Int => "INT",
            ColumnType::Varchar => "VARCHAR",
            ColumnType::Date => "DATE",
            ColumnType::Timestamp => "TIMESTAMP",
            ColumnType::Float => "FLOAT",
            ColumnType::Json => "JSON",
        }
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Any runtime literal a record column can hold.
///
/// `Date` and `Timestamp` are stored internally already converted to their
/// on-disk integer form (day count / microseconds), since that is the form
/// every comparison and every encode operates on; `from_date_str` and
/// `from_timestamp_str` do the one-time string parse.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int(i64),
    Varchar(String),
    Date(i32),
    Timestamp(i64),
    Float(f64),
    Json(serde_json::Value),
}

impl Value {
    pub fn type_of(&self) -> ColumnType {
        match self {
            Value::Int(_) => ColumnType::Int,
            Value::Varchar(_) => ColumnType::Varchar,
            Value::Date(_) => ColumnType::Date,
            Value::Timestamp(_) => ColumnType::Timestamp,
            Value::Float(_) => ColumnType::Float,
            Value::Json(_) => ColumnType::Json,
        }
    }

    /// Parses `YYYY-MM-DD`, interpreted as UTC midnight, into the day-count
    /// form stored on disk.
    pub fn from_date_str(s: &str) -> Result<Value, Error> {
        let d = NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
            log::debug!("date parse failure for {s:?}: {e}");
            Error::TypeMismatch {
                column: String::new(),
                expected: "DATE (YYYY-MM-DD)",
                got: "unparsable string",
            }
        })?;
        let midnight = d.and_hms_opt(0, 0, 0).expect("midnight is always valid");
        let secs = midnight.and_utc().timestamp();
        Ok(Value::Date((secs.div_euclid(86_400)) as i32))
    }

    /// Parses an RFC3339 timestamp, truncating fractional seconds to
    /// microseconds, into the on-disk microseconds-since-epoch form.
    pub fn from_timestamp_str(s: &str) -> Result<Value, Error> {
        let dt: DateTime<Utc> = DateTime::parse_from_rfc3339(s)
            .map_err(|_| Error::TypeMismatch {
                column: String::new(),
                expected: "TIMESTAMP (RFC3339)",
                got: "unparsable string",
            })?
            .with_timezone(&Utc);
        let micros = dt.timestamp() * 1_000_000 + (dt.timestamp_subsec_micros() as i64);
        Ok(Value::Timestamp(micros))
    }

    /// Renders a stored DATE day-count back to `YYYY-MM-DD`, used both for
    /// display and for string-normalised comparisons. `days` comes from a
    /// column value that can be constructed directly (not only parsed from
    /// a string), so a day count outside chrono's representable calendar
    /// range is reported as a decode error rather than panicking.
    pub fn date_to_string(days: i32) -> Result<String, Error> {
        let secs = days as i64 * 86_400;
        let dt = DateTime::<Utc>::from_timestamp(secs, 0)
            .ok_or_else(|| Error::Decode(format!("day count {days} is out of range")))?;
        Ok(dt.format("%Y-%m-%d").to_string())
    }

    /// Renders a stored TIMESTAMP microsecond count back to RFC3339 with
    /// microsecond precision, for the string-normalised comparison rule.
    /// Same out-of-range handling as `date_to_string`.
    pub fn timestamp_to_string(micros: i64) -> Result<String, Error> {
        let secs = micros.div_euclid(1_000_000);
        let rem_micros = micros.rem_euclid(1_000_000);
        let dt = DateTime::<Utc>::from_timestamp(secs, (rem_micros as u32) * 1_000)
            .ok_or_else(|| Error::Decode(format!("microsecond count {micros} is out of range")))?;
        Ok(dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{i}"),
            Value::Varchar(s) => write!(f, "{s}"),
            Value::Date(d) => write!(
                f,
                "{}",
                Value::date_to_string(*d).unwrap_or_else(|_| "<date out of range>".into())
            ),
            Value::Timestamp(t) => write!(
                f,
                "{}",
                Value::timestamp_to_string(*t).unwrap_or_else(|_| "<timestamp out of range>".into())
            ),
            Value::Float(x) => write!(f, "{x}"),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

#[test]
fn test_date_round_trip() {
    let v = Value::from_date_str("2024-01-01").unwrap();
    match v {
        Value::Date(days) => assert_eq!(Value::date_to_string(days).unwrap(), "2024-01-01"),
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_timestamp_round_trip_truncates_to_micros() {
    let v = Value::from_timestamp_str("2024-01-01T12:30:00.123456789Z").unwrap();
    match v {
        Value::Timestamp(micros) => {
            assert_eq!(micros % 1_000_000, 123_456);
            assert_eq!(
                Value::timestamp_to_string(micros).unwrap(),
                "2024-01-01T12:30:00.123456Z"
            );
        }
        _ => panic!("wrong variant"),
    }
}

#[test]
fn test_date_to_string_out_of_range_is_a_decode_error_not_a_panic() {
    // i32::MAX days is far beyond chrono's representable calendar range.
    assert!(matches!(
        Value::date_to_string(i32::MAX),
        Err(Error::Decode(_))
    ));
}

#[test]
fn test_timestamp_to_string_out_of_range_is_a_decode_error_not_a_panic() {
    assert!(matches!(
        Value::timestamp_to_string(i64::MAX),
        Err(Error::Decode(_))
    ));
}
