use super::*;
use crate::manager::ShadowSchemaManager;
use dw_db::DuckDbBackend;

const SCHEMA: &str = "dw_shadow";

/// Original {A(1), C(3)}, shadow {A(1, updated), B(2)}.
async fn reconciliation_fixture() -> (Arc<dyn Database>, ApplyEngine) {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    db.execute_batch(
        "CREATE SCHEMA crm;
         CREATE TABLE crm.contact (id INTEGER, email VARCHAR, phone VARCHAR);
         INSERT INTO crm.contact VALUES (1, 'old-a@x.test', '111'), (3, 'c@x.test', '333');",
    )
    .await
    .unwrap();

    let mut manager = ShadowSchemaManager::new(Arc::clone(&db), SCHEMA);
    manager.begin_run();
    for (column, ty, key) in [
        ("id", dw_core::ColumnType::Integer, true),
        ("email", dw_core::ColumnType::Text, false),
        ("phone", dw_core::ColumnType::Text, false),
    ] {
        manager
            .use_column("crm", "contact", column, ty, key)
            .await
            .unwrap();
    }

    // The script rewrites the shadow row set: A updated, B added, C removed.
    db.execute_batch(
        "UPDATE dw_shadow.crm__contact SET email = 'a@x.test' WHERE id = 1;
         DELETE FROM dw_shadow.crm__contact WHERE id = 3;
         INSERT INTO dw_shadow.crm__contact VALUES (2, 'b@x.test', '222');",
    )
    .await
    .unwrap();

    let engine = ApplyEngine::new(Arc::clone(&db), SCHEMA);
    (db, engine)
}

async fn original_rows(db: &Arc<dyn Database>) -> Vec<Vec<String>> {
    db.query_rows("SELECT CAST(id AS VARCHAR), email, phone FROM crm.contact ORDER BY id")
        .await
        .unwrap()
}

#[tokio::test]
async fn test_full_column_list_updates_inserts_and_deletes() {
    let (db, engine) = reconciliation_fixture().await;

    engine
        .apply(
            "crm",
            "contact",
            &["id".into(), "email".into(), "phone".into()],
        )
        .await
        .unwrap();

    assert_eq!(
        original_rows(&db).await,
        vec![
            vec!["1".to_string(), "a@x.test".to_string(), "111".to_string()],
            vec!["2".to_string(), "b@x.test".to_string(), "222".to_string()],
        ]
    );
}

#[tokio::test]
async fn test_partial_column_list_never_deletes() {
    let (db, engine) = reconciliation_fixture().await;

    engine
        .apply("crm", "contact", &["id".into(), "email".into()])
        .await
        .unwrap();

    let rows = original_rows(&db).await;
    // A updated, B inserted (with full shadow data), C left untouched.
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0][1], "a@x.test");
    assert_eq!(rows[1], vec!["2".to_string(), "b@x.test".to_string(), "222".to_string()]);
    assert_eq!(rows[2][0], "3");
    assert_eq!(rows[2][1], "c@x.test");
}

#[tokio::test]
async fn test_partial_list_does_not_clobber_unlisted_columns() {
    let (db, engine) = reconciliation_fixture().await;

    // Another committed change to a column this apply does not list.
    db.execute("UPDATE crm.contact SET phone = '999' WHERE id = 1")
        .await
        .unwrap();

    engine
        .apply("crm", "contact", &["id".into(), "email".into()])
        .await
        .unwrap();

    let rows = original_rows(&db).await;
    assert_eq!(rows[0][1], "a@x.test");
    assert_eq!(rows[0][2], "999");
}

#[tokio::test]
async fn test_apply_on_missing_original_is_noop() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let mut manager = ShadowSchemaManager::new(Arc::clone(&db), SCHEMA);
    manager.begin_run();
    manager
        .use_column("crm", "contact", "id", dw_core::ColumnType::Integer, true)
        .await
        .unwrap();

    let engine = ApplyEngine::new(Arc::clone(&db), SCHEMA);
    engine.apply("crm", "contact", &["id".into()]).await.unwrap();
}

#[tokio::test]
async fn test_apply_without_shadow_table_is_an_error() {
    let db: Arc<dyn Database> = Arc::new(DuckDbBackend::in_memory().unwrap());
    let engine = ApplyEngine::new(Arc::clone(&db), SCHEMA);
    let result = engine.apply("crm", "contact", &["id".into()]).await;
    assert!(matches!(result, Err(ShadowError::ShadowTableMissing { .. })));
}

#[tokio::test]
async fn test_apply_must_list_the_key() {
    let (_db, engine) = reconciliation_fixture().await;
    let result = engine.apply("crm", "contact", &["email".into()]).await;
    assert!(matches!(result, Err(ShadowError::ApplyMissingKey { .. })));
}

#[tokio::test]
async fn test_apply_rejects_unknown_column() {
    let (_db, engine) = reconciliation_fixture().await;
    let result = engine
        .apply("crm", "contact", &["id".into(), "nope".into()])
        .await;
    assert!(matches!(result, Err(ShadowError::MissingColumn { .. })));
}
