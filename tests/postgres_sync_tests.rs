use std::env;

use tablesync::db::postgres::PostgresClient;
use tablesync::db::DbClient;
use tablesync::models::connections::SyncOptions;
use tablesync::models::definition::TableDefinition;
use tablesync::sync::TableSync;

// Runs only when TEST_DATABASE_URL points at a disposable PostgreSQL database.
async fn setup_test_db(table: &str) -> Option<PostgresClient> {
    dotenv::dotenv().ok();
    let database_url = env::var("TEST_DATABASE_URL").ok()?;
    let client = PostgresClient::connect(&database_url)
        .await
        .expect("Failed to connect to the database");

    client
        .execute(&format!("DROP TABLE IF EXISTS \"{}\"", table))
        .await
        .unwrap();

    Some(client)
}

#[tokio::test]
async fn test_create_comments_and_idempotence() {
    let Some(client) = setup_test_db("sync_pg_user").await else {
        return;
    };
    let options = SyncOptions::default();
    let sync = TableSync::new(&client, &options);
    let mut def = TableDefinition::new(
        "sync_pg_user",
        &[
            ("email", "邮箱|string|0|100|null|1|null"),
            ("age", "年龄|number|0|200|18|0|null"),
        ],
    );
    def.comment = Some("用户".to_string());

    let created = sync.sync(&def).await.unwrap();
    assert!(created.plan.changed);

    let columns = client.get_columns("sync_pg_user").await.unwrap();
    assert_eq!(columns["email"].length, Some(100));
    assert_eq!(columns["email"].comment.as_deref(), Some("邮箱"));
    assert_eq!(columns["age"].default.as_deref(), Some("18"));
    let indexes = client.get_indexes("sync_pg_user").await.unwrap();
    assert!(indexes.contains_key("idx_sync_pg_user_email"));
    assert!(!indexes.values().any(|cols| cols == &vec!["id".to_string()]));

    let again = sync.sync(&def).await.unwrap();
    assert!(!again.plan.changed);
}

#[tokio::test]
async fn test_widen_and_comment_change() {
    let Some(client) = setup_test_db("sync_pg_widen").await else {
        return;
    };
    let options = SyncOptions::default();
    let sync = TableSync::new(&client, &options);
    sync.sync(&TableDefinition::new(
        "sync_pg_widen",
        &[("email", "邮箱|string|0|100|null|0|null")],
    ))
    .await
    .unwrap();

    let outcome = sync
        .sync(&TableDefinition::new(
            "sync_pg_widen",
            &[("email", "电子邮箱|string|0|150|x|0|null")],
        ))
        .await
        .unwrap();

    assert_eq!(
        outcome.statements,
        vec![
            "ALTER TABLE \"sync_pg_widen\" ALTER COLUMN \"email\" TYPE VARCHAR(150)".to_string(),
            "ALTER TABLE \"sync_pg_widen\" ALTER COLUMN \"email\" SET DEFAULT 'x'".to_string(),
            "COMMENT ON COLUMN \"sync_pg_widen\".\"email\" IS '电子邮箱'".to_string(),
        ]
    );
    let columns = client.get_columns("sync_pg_widen").await.unwrap();
    assert_eq!(columns["email"].length, Some(150));
    assert_eq!(columns["email"].default.as_deref(), Some("x"));
}
