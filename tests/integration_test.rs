use heapdb::{Column, ColumnType, Engine, FilterOp, FilterSpec, Schema, Value};

fn users_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Int),
        Column::varchar("name", 32),
    ])
}

#[test]
fn test_create_insert_scan_round_trip_across_a_reopened_engine() {
    let dir = tempfile::tempdir().expect("Should have created a temp dir");
    {
        let mut e = Engine::open(dir.path()).expect("Should have opened the engine");
        e.create_table("users", users_schema())
            .expect("Should have created the table");
        e.insert(
            "users",
            vec![Value::Int(7), Value::Varchar("alice".into())],
        )
        .expect("Should have inserted alice");
        e.insert("users", vec![Value::Int(8), Value::Varchar("bob".into())])
            .expect("Should have inserted bob");
    }

    // Reopening the engine must pick the table's files back up unchanged.
    let mut e = Engine::open(dir.path()).expect("Should have reopened the engine");
    let schema = e
        .get_table_schema("users")
        .expect("Should have read the schema back");
    assert_eq!(schema, users_schema());

    let rows = e.scan("users", &[], &[]).expect("Should have scanned");
    assert_eq!(
        rows,
        vec![
            vec![Value::Int(7), Value::Varchar("alice".into())],
            vec![Value::Int(8), Value::Varchar("bob".into())],
        ]
    );
}

#[test]
fn test_filter_and_projection_combine() {
    let dir = tempfile::tempdir().expect("Should have created a temp dir");
    let mut e = Engine::open(dir.path()).expect("Should have opened the engine");
    e.create_table("users", users_schema())
        .expect("Should have created the table");
    for (id, name) in [(1, "x"), (2, "y"), (3, "x")] {
        e.insert("users", vec![Value::Int(id), Value::Varchar(name.into())])
            .expect("Should have inserted a row");
    }

    let rows = e
        .scan(
            "users",
            &[FilterSpec {
                column: "name".into(),
                op: FilterOp::Eq,
                value: Value::Varchar("x".into()),
            }],
            &["id".to_string()],
        )
        .expect("Should have scanned with a filter");
    assert_eq!(rows, vec![vec![Value::Int(1)], vec![Value::Int(3)]]);
}

#[test]
fn test_unknown_filter_column_is_rejected_before_any_page_is_touched() {
    let dir = tempfile::tempdir().expect("Should have created a temp dir");
    let mut e = Engine::open(dir.path()).expect("Should have opened the engine");
    e.create_table("users", users_schema())
        .expect("Should have created the table");
    e.insert("users", vec![Value::Int(1), Value::Varchar("x".into())])
        .expect("Should have inserted a row");

    let err = e
        .scan(
            "users",
            &[FilterSpec {
                column: "does_not_exist".into(),
                op: FilterOp::Eq,
                value: Value::Int(1),
            }],
            &[],
        )
        .expect_err("Should have rejected an unknown filter column");
    assert!(matches!(err, heapdb::Error::PlanInvalid(_)));
}

#[test]
fn test_type_mismatch_on_insert_leaves_table_unmodified() {
    let dir = tempfile::tempdir().expect("Should have created a temp dir");
    let mut e = Engine::open(dir.path()).expect("Should have opened the engine");
    e.create_table("users", users_schema())
        .expect("Should have created the table");

    let err = e
        .insert("users", vec![Value::Varchar("not an int".into()), Value::Varchar("x".into())])
        .expect_err("Should have rejected a wrongly typed column");
    assert!(matches!(err, heapdb::Error::TypeMismatch { .. }));

    let rows = e.scan("users", &[], &[]).expect("Should have scanned");
    assert!(rows.is_empty());
}

#[test]
fn test_date_and_timestamp_columns_round_trip_through_disk() {
    let dir = tempfile::tempdir().expect("Should have created a temp dir");
    let mut e = Engine::open(dir.path()).expect("Should have opened the engine");
    let schema = Schema::new(vec![
        Column::new("d", ColumnType::Date),
        Column::new("t", ColumnType::Timestamp),
    ]);
    e.create_table("events", schema).expect("Should have created the table");

    let d = Value::from_date_str("2024-01-01").unwrap();
    let t = Value::from_timestamp_str("2024-01-01T12:30:00Z").unwrap();
    e.insert("events", vec![d.clone(), t.clone()])
        .expect("Should have inserted a timestamped row");

    let rows = e.scan("events", &[], &[]).expect("Should have scanned");
    assert_eq!(rows, vec![vec![d, t]]);
}
