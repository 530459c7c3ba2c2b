//! Resolves filter column names to indices, type-checks filter values
//! against the schema, and builds the per-column extraction plan the codec
//! consumes during decode.

use crate::error::Error;
use crate::schema::Schema;
use crate::value::{ColumnType, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

impl FilterOp {
    pub fn parse(s: &str) -> Option<FilterOp> {
        match s {
            "=" | "==" => Some(FilterOp::Eq),
            "!=" | "<>" => Some(FilterOp::Ne),
            _ => None,
        }
    }
}

/// A caller-supplied filter, before it has been resolved against a schema.
#[derive(Debug, Clone)]
pub struct FilterSpec {
    pub column: String,
    pub op: FilterOp,
    pub value: Value,
}

/// Per-column instructions the record decoder follows while walking a
/// payload left to right.
#[derive(Debug, Clone)]
pub struct ColumnPlan {
    pub must_extract: bool,
    pub filter: Option<(FilterOp, Value)>,
    pub projected: bool,
}

#[derive(Debug, Clone)]
pub struct Plan {
    /// One entry per schema column, in schema order.
    pub columns: Vec<ColumnPlan>,
}

impl Plan {
    /// A plan that extracts and projects every column and filters nothing.
    pub fn project_all(schema: &Schema) -> Plan {
        Plan {
            columns: schema
                .columns
                .iter()
                .map(|_| ColumnPlan {
                    must_extract: true,
                    filter: None,
                    projected: true,
                })
                .collect(),
        }
    }
}

/// Builds a `Plan` from filter descriptors and a projected-column name list
/// (empty projection list means "project all").
///
/// All errors are collected and reported together rather than failing on
/// the first one, so a caller sees every problem with a request at once.
pub fn build_plan(
    schema: &Schema,
    filters: &[FilterSpec],
    projected_names: &[String],
) -> Result<Plan, Error> {
    let mut errors: Vec<String> = Vec::new();
    let mut filter_by_idx: Vec<Option<(FilterOp, Value)>> = vec![None; schema.columns.len()];

    for f in filters {
        let idx = match schema.column_index(&f.column) {
            Some(i) => i,
            None => {
                errors.push(format!("unknown filter column: {}", f.column));
                continue;
            }
        };
        let col = &schema.columns[idx];
        if col.col_type == ColumnType::Json {
            errors.push(format!("column {} (JSON) is not filterable", f.column));
            continue;
        }
        let normalised = match normalise_for_column(col.col_type, &f.value) {
            Ok(v) => v,
            Err(e) => {
                errors.push(format!("column {}: {e}", f.column));
                continue;
            }
        };
        filter_by_idx[idx] = Some((f.op, normalised));
    }

    let project_all = projected_names.is_empty();
    let mut projected_by_idx = vec![false; schema.columns.len()];
    if project_all {
        projected_by_idx.iter_mut().for_each(|p| *p = true);
    } else {
        for name in projected_names {
            match schema.column_index(name) {
                Some(i) => projected_by_idx[i] = true,
                None => errors.push(format!("unknown projected column: {name}")),
            }
        }
    }

    if !errors.is_empty() {
        log::debug!("plan validation failed with {} error(s)", errors.len());
        return Err(Error::PlanInvalid(errors.join("; ")));
    }

    let columns = (0..schema.columns.len())
        .map(|i| {
            let filter = filter_by_idx[i].clone();
            let projected = projected_by_idx[i];
            ColumnPlan {
                must_extract: filter.is_some() || projected,
                filter,
                projected,
            }
        })
        .collect();

    Ok(Plan { columns })
}

/// Checks a filter value's runtime type against a column's declared type,
/// normalising an exact-integer float into an Int when the column is INT
/// (the common case of a JSON number literal used to filter an INT column).
fn normalise_for_column(col_type: ColumnType, value: &Value) -> Result<Value, Error> {
    match (col_type, value) {
        (ColumnType::Int, Value::Int(i)) => Ok(Value::Int(*i)),
        (ColumnType::Int, Value::Float(f)) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
        (ColumnType::Float, Value::Float(f)) => Ok(Value::Float(*f)),
        (ColumnType::Float, Value::Int(i)) => Ok(Value::Float(*i as f64)),
        (ColumnType::Varchar, Value::Varchar(s)) => Ok(Value::Varchar(s.clone())),
        (ColumnType::Date, Value::Date(d)) => Ok(Value::Date(*d)),
        (ColumnType::Date, Value::Varchar(s)) => Value::from_date_str(s),
        (ColumnType::Timestamp, Value::Timestamp(t)) => Ok(Value::Timestamp(*t)),
        (ColumnType::Timestamp, Value::Varchar(s)) => Value::from_timestamp_str(s),
        (got, _) => Err(Error::TypeMismatch {
            column: String::new(),
            expected: got.name(),
            got: value.type_of().name(),
        }),
    }
}

#[test]
fn test_build_plan_extract_and_project_flags() {
    use crate::schema::Column;

    let schema = Schema::new(vec![
        Column::new("id", ColumnType::Int),
        Column::varchar("name", 32),
    ]);
    let filters = vec![FilterSpec {
        column: "name".into(),
        op: FilterOp::Eq,
        value: Value::Varchar("x".into()),
    }];
    let plan = build_plan(&schema, &filters, &["id".to_string()]).unwrap();
    assert!(plan.columns[0].must_extract);
    assert!(plan.columns[0].projected);
    assert!(plan.columns[0].filter.is_none());
    assert!(plan.columns[1].must_extract); // filtered, not projected
    assert!(!plan.columns[1].projected);
    assert!(plan.columns[1].filter.is_some());
}

#[test]
fn test_build_plan_unknown_column_is_invalid() {
    use crate::schema::Column;
    let schema = Schema::new(vec![Column::new("id", ColumnType::Int)]);
    let filters = vec![FilterSpec {
        column: "nope".into(),
        op: FilterOp::Eq,
        value: Value::Int(1),
    }];
    let err = build_plan(&schema, &filters, &[]).unwrap_err();
    assert!(matches!(err, Error::PlanInvalid(_)));
}

#[test]
fn test_build_plan_json_not_filterable() {
    use crate::schema::Column;
    let schema = Schema::new(vec![Column::new("j", ColumnType::Json)]);
    let filters = vec![FilterSpec {
        column: "j".into(),
        op: FilterOp::Eq,
        value: Value::Json(serde_json::json!(1)),
    }];
    assert!(build_plan(&schema, &filters, &[]).is_err());
}

#[test]
fn test_build_plan_integer_float_normalisation() {
    use crate::schema::Column;
    let schema = Schema::new(vec![Column::new("id", ColumnType::Int)]);
    let filters = vec![FilterSpec {
        column: "id".into(),
        op: FilterOp::Eq,
        value: Value::Float(7.0),
    }];
    let plan = build_plan(&schema, &filters, &[]).unwrap();
    assert_eq!(plan.columns[0].filter.as_ref().unwrap().1, Value::Int(7));
}
