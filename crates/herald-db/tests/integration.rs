use herald_db::{create_pool, run_migrations, DbRuntimeSettings};

#[test]
fn db_initialization_works() {
    let pool =
        create_pool(":memory:", DbRuntimeSettings::default()).expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 3);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec!["_herald_migrations", "comments", "posts", "users"]
    );
}

#[test]
fn migrations_persist_across_pool_connections() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("persist.db");
    let path = path.to_str().expect("utf-8 path");

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to create pool");
        let conn = pool.get().expect("failed to get connection");
        assert_eq!(run_migrations(&conn).expect("first run"), 3);
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("failed to reopen pool");
    let conn = pool.get().expect("failed to get connection");
    assert_eq!(run_migrations(&conn).expect("second run"), 0);
}
