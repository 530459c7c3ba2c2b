//! Record encoding: a positional, header-less byte layout driven by the
//! schema's column order, and the pushdown-aware decoder that walks it
//! while applying a `plan::Plan`.

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Cursor, Read};

use crate::error::Error;
use crate::plan::{FilterOp, Plan};
use crate::schema::Schema;
use crate::value::{ColumnType, Value};

pub type Record = Vec<Value>;

/// Serialises one record against `schema`, checking that every item's
/// runtime type matches its column's declared type, surfaced as
/// `Error::TypeMismatch` since encoding is where the check actually happens.
pub fn encode(schema: &Schema, record: &Record) -> Result<Vec<u8>, Error> {
    if record.len() != schema.columns.len() {
        return Err(Error::TypeMismatch {
            column: String::new(),
            expected: "matching column count",
            got: "wrong number of values",
        });
    }
    let mut buf = Vec::new();
    for (col, value) in schema.columns.iter().zip(record.iter()) {
        encode_value(&mut buf, col.col_type, &col.name, value)?;
    }
    Ok(buf)
}

fn encode_value(
    buf: &mut Vec<u8>,
    col_type: ColumnType,
    col_name: &str,
    value: &Value,
) -> Result<(), Error> {
    let mismatch = || Error::TypeMismatch {
        column: col_name.to_string(),
        expected: col_type.name(),
        got: value.type_of().name(),
    };
    match (col_type, value) {
        (ColumnType::Int, Value::Int(i)) => {
            buf.write_i64::<LittleEndian>(*i).unwrap();
        }
        (ColumnType::Float, Value::Float(f)) => {
            buf.write_f64::<LittleEndian>(*f).unwrap();
        }
        (ColumnType::Date, Value::Date(d)) => {
            buf.write_i32::<LittleEndian>(*d).unwrap();
        }
        (ColumnType::Timestamp, Value::Timestamp(t)) => {
            buf.write_i64::<LittleEndian>(*t).unwrap();
        }
        (ColumnType::Varchar, Value::Varchar(s)) => {
            let bytes = s.as_bytes();
            if bytes.len() > i16::MAX as usize {
                return Err(mismatch());
            }
            buf.write_i16::<LittleEndian>(bytes.len() as i16).unwrap();
            buf.extend_from_slice(bytes);
        }
        (ColumnType::Json, Value::Json(v)) => {
            let text = v.to_string();
            let bytes = text.as_bytes();
            if bytes.len() > i16::MAX as usize {
                return Err(mismatch());
            }
            buf.write_i16::<LittleEndian>(bytes.len() as i16).unwrap();
            buf.extend_from_slice(bytes);
        }
        _ => return Err(mismatch()),
    }
    Ok(())
}

/// Width in bytes of a fixed-width column type; `None` for variable-width
/// types, whose width is only known after reading the length prefix.
fn fixed_width(col_type: ColumnType) -> Option<usize> {
    match col_type {
        ColumnType::Int => Some(8),
        ColumnType::Date => Some(4),
        ColumnType::Timestamp => Some(8),
        ColumnType::Float => Some(8),
        ColumnType::Varchar | ColumnType::Json => None,
    }
}

/// Decodes `payload` against `schema` following `plan`, applying filters as
/// soon as each filtered column is read and short-circuiting on the first
/// mismatch. Returns `None` when the record is rejected by a filter,
/// `Some(row)` (the projected subset, in column order) when it survives.
pub fn decode_with_plan(
    schema: &Schema,
    plan: &Plan,
    payload: &[u8],
) -> Result<Option<Record>, Error> {
    let mut c = Cursor::new(payload);
    let mut projected: Vec<Value> = Vec::new();

    for (col, col_plan) in schema.columns.iter().zip(plan.columns.iter()) {
        if col_plan.must_extract {
            let value = read_value(&mut c, col.col_type)?;
            if let Some((op, cmp)) = &col_plan.filter {
                if !compare(&value, cmp, *op)? {
                    return Ok(None);
                }
            }
            if col_plan.projected {
                projected.push(value);
            }
        } else {
            skip_value(&mut c, col.col_type)?;
        }
    }
    Ok(Some(projected))
}

fn read_value(c: &mut Cursor<&[u8]>, col_type: ColumnType) -> Result<Value, Error> {
    let err = || Error::Decode("truncated record payload".into());
    match col_type {
        ColumnType::Int => Ok(Value::Int(c.read_i64::<LittleEndian>().map_err(|_| err())?)),
        ColumnType::Float => Ok(Value::Float(c.read_f64::<LittleEndian>().map_err(|_| err())?)),
        ColumnType::Date => Ok(Value::Date(c.read_i32::<LittleEndian>().map_err(|_| err())?)),
        ColumnType::Timestamp => {
            Ok(Value::Timestamp(c.read_i64::<LittleEndian>().map_err(|_| err())?))
        }
        ColumnType::Varchar => {
            let len = c.read_i16::<LittleEndian>().map_err(|_| err())?;
            let mut bytes = vec![0_u8; len as usize];
            c.read_exact(&mut bytes).map_err(|_| err())?;
            let s = String::from_utf8(bytes)
                .map_err(|_| Error::Decode("varchar is not valid utf-8".into()))?;
            Ok(Value::Varchar(s))
        }
        ColumnType::Json => {
            let len = c.read_i16::<LittleEndian>().map_err(|_| err())?;
            let mut bytes = vec![0_u8; len as usize];
            c.read_exact(&mut bytes).map_err(|_| err())?;
            let v: serde_json::Value = serde_json::from_slice(&bytes)
                .map_err(|_| Error::Decode("json value is not valid json".into()))?;
            Ok(Value::Json(v))
        }
    }
}

/// Skips a value without materialising it. Fixed-width fields consume
/// their width unconditionally; variable-width fields still read the
/// length prefix, then skip by that length.
fn skip_value(c: &mut Cursor<&[u8]>, col_type: ColumnType) -> Result<(), Error> {
    let err = || Error::Decode("truncated record payload".into());
    if let Some(width) = fixed_width(col_type) {
        c.set_position(c.position() + width as u64);
        return Ok(());
    }
    let len = c.read_i16::<LittleEndian>().map_err(|_| err())?;
    c.set_position(c.position() + len as u64);
    Ok(())
}

/// Equality/inequality: INT/FLOAT numeric, VARCHAR byte-wise,
/// DATE/TIMESTAMP on their string-normalised form. JSON never reaches here
/// (the planner rejects JSON filters before a plan is built). A DATE or
/// TIMESTAMP value outside chrono's representable calendar range fails the
/// comparison with a decode error rather than panicking.
fn compare(actual: &Value, expected: &Value, op: FilterOp) -> Result<bool, Error> {
    let eq = match (actual, expected) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Varchar(a), Value::Varchar(b)) => a == b,
        (Value::Date(a), Value::Date(b)) => {
            Value::date_to_string(*a)? == Value::date_to_string(*b)?
        }
        (Value::Timestamp(a), Value::Timestamp(b)) => {
            Value::timestamp_to_string(*a)? == Value::timestamp_to_string(*b)?
        }
        _ => false,
    };
    Ok(match op {
        FilterOp::Eq => eq,
        FilterOp::Ne => !eq,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Column;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int),
            Column::varchar("name", 32),
        ])
    }

    #[test]
    fn test_record_round_trip_project_all() {
        let s = schema();
        let rec: Record = vec![Value::Int(7), Value::Varchar("alice".into())];
        let bytes = encode(&s, &rec).unwrap();
        let plan = Plan::project_all(&s);
        let decoded = decode_with_plan(&s, &plan, &bytes).unwrap().unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_record_round_trip_float() {
        let s = Schema::new(vec![Column::new("score", ColumnType::Float)]);
        let rec: Record = vec![Value::Float(-3.5)];
        let bytes = encode(&s, &rec).unwrap();
        let plan = Plan::project_all(&s);
        let decoded = decode_with_plan(&s, &plan, &bytes).unwrap().unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_record_round_trip_json() {
        let s = Schema::new(vec![Column::new("payload", ColumnType::Json)]);
        let rec: Record = vec![Value::Json(serde_json::json!({"a": 1, "b": [true, null]}))];
        let bytes = encode(&s, &rec).unwrap();
        let plan = Plan::project_all(&s);
        let decoded = decode_with_plan(&s, &plan, &bytes).unwrap().unwrap();
        assert_eq!(decoded, rec);
    }

    #[test]
    fn test_record_filter_rejects() {
        let s = schema();
        let rec: Record = vec![Value::Int(7), Value::Varchar("alice".into())];
        let bytes = encode(&s, &rec).unwrap();
        let plan = crate::plan::build_plan(
            &s,
            &[crate::plan::FilterSpec {
                column: "name".into(),
                op: FilterOp::Eq,
                value: Value::Varchar("bob".into()),
            }],
            &[],
        )
        .unwrap();
        assert!(decode_with_plan(&s, &plan, &bytes).unwrap().is_none());
    }

    #[test]
    fn test_record_projection_subset() {
        let s = schema();
        let rec: Record = vec![Value::Int(7), Value::Varchar("alice".into())];
        let bytes = encode(&s, &rec).unwrap();
        let plan = crate::plan::build_plan(&s, &[], &["id".to_string()]).unwrap();
        let decoded = decode_with_plan(&s, &plan, &bytes).unwrap().unwrap();
        assert_eq!(decoded, vec![Value::Int(7)]);
    }

    #[test]
    fn test_record_type_mismatch_on_encode() {
        let s = schema();
        let rec: Record = vec![Value::Varchar("oops".into()), Value::Varchar("alice".into())];
        assert!(matches!(encode(&s, &rec), Err(Error::TypeMismatch { .. })));
    }

    #[test]
    fn test_fixed_width_columns_always_consume_width_when_skipped() {
        let s = Schema::new(vec![
            Column::new("a", ColumnType::Int),
            Column::new("b", ColumnType::Int),
        ]);
        let rec: Record = vec![Value::Int(1), Value::Int(2)];
        let bytes = encode(&s, &rec).unwrap();
        // Plan only extracts column b; column a must still be skipped by width.
        let plan = crate::plan::build_plan(&s, &[], &["b".to_string()]).unwrap();
        let decoded = decode_with_plan(&s, &plan, &bytes).unwrap().unwrap();
        assert_eq!(decoded, vec![Value::Int(2)]);
    }
}
