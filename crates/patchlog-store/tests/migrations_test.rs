// Integration tests for the migration framework

use rusqlite::Connection;

fn setup_test_db() -> Connection {
    Connection::open_in_memory().expect("Failed to create in-memory database")
}

fn get_table_names(conn: &Connection) -> Vec<String> {
    let mut stmt = conn
        .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
        .unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    let mut conn = setup_test_db();

    let result = patchlog_store::migrations::apply_migrations(&mut conn);
    assert!(
        result.is_ok(),
        "Migrations should succeed: {:?}",
        result.err()
    );

    let tables = get_table_names(&conn);
    for expected in ["documents", "schema_version", "sqlite_sequence"] {
        assert!(
            tables.contains(&expected.to_string()),
            "Missing table: {}",
            expected
        );
    }
}

#[test]
fn test_migrations_are_recorded_once() {
    let mut conn = setup_test_db();
    patchlog_store::migrations::apply_migrations(&mut conn).unwrap();
    patchlog_store::migrations::apply_migrations(&mut conn).unwrap();

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM schema_version", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 1);
}

#[test]
fn test_documents_are_unique_per_collection() {
    let mut conn = setup_test_db();
    patchlog_store::migrations::apply_migrations(&mut conn).unwrap();

    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES ('a', '\"1\"', '{}')",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES ('b', '\"1\"', '{}')",
        [],
    )
    .unwrap();
    let dup = conn.execute(
        "INSERT INTO documents (collection, id, body) VALUES ('a', '\"1\"', '{}')",
        [],
    );
    assert!(dup.is_err());
}
