use sea_orm::{ConnectionTrait, Database, Statement};

use pcba_viewer_lib::database_migration::{DatabaseMigration, TABLE_NAMES};

#[tokio::test]
async fn migration_creates_every_table() {
    let db = Database::connect("sqlite::memory:").await.expect("connect in-memory db");

    DatabaseMigration::migrate(&db).await.expect("migrate should succeed");

    for table in TABLE_NAMES {
        assert!(
            DatabaseMigration::check_table_exists(&db, table).await.unwrap(),
            "{} should exist after migration",
            table
        );
    }
}

#[tokio::test]
async fn migration_adds_plot_data_to_legacy_spec_table() {
    let db = Database::connect("sqlite::memory:").await.expect("connect in-memory db");
    // 旧版数据库的 spec 表没有 plot_data 列
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "CREATE TABLE spec (id INTEGER PRIMARY KEY AUTOINCREMENT, sub_test_id INTEGER NOT NULL, \
         name TEXT NOT NULL, measurement REAL, unit TEXT, lower_limit REAL, nominal REAL, \
         upper_limit REAL, result BOOLEAN, has_plot BOOLEAN NOT NULL DEFAULT 0)"
            .to_string(),
    ))
    .await
    .unwrap();

    DatabaseMigration::migrate(&db).await.unwrap();
    // 第二次执行不应报错
    DatabaseMigration::migrate(&db).await.unwrap();

    let tables = DatabaseMigration::describe_tables(&db).await.unwrap();
    let spec = tables.iter().find(|t| t.name == "spec").expect("spec table");
    assert!(spec.columns.iter().any(|c| c == "plot_data"));
    assert!(tables.iter().all(|t| !t.name.starts_with("sqlite_")));
}
