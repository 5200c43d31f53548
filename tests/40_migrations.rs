mod common;

use std::path::Path;

use anyhow::Result;

use image_analyzer::database::migrator::{MigrationError, Migrator};

const INITIAL_VERSION: i64 = 20241217061821;

fn migrator(test_db: &common::TestDb) -> Migrator {
    Migrator::new(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("migrations"),
        test_db.pool.clone(),
    )
}

#[tokio::test]
async fn up_redo_down_to_zero() -> Result<()> {
    let Some(test_db) = common::TestDb::connect().await? else { return Ok(()) };
    let migrator = migrator(&test_db);

    assert_eq!(migrator.version().await?, 0);
    assert!(migrator.status().await?.iter().all(|s| s.applied_at.is_none()));

    assert_eq!(migrator.up().await?, vec![INITIAL_VERSION]);
    assert_eq!(migrator.version().await?, INITIAL_VERSION);
    assert!(test_db.table_exists("images_metadata").await?);
    assert!(migrator.up().await?.is_empty());

    let status = migrator.status().await?;
    assert_eq!(status[0].version, INITIAL_VERSION);
    assert!(status[0].applied_at.is_some());

    assert_eq!(migrator.redo().await?, INITIAL_VERSION);
    assert_eq!(migrator.version().await?, INITIAL_VERSION);
    assert!(test_db.table_exists("images_metadata").await?);

    assert_eq!(migrator.down_to(0).await?, vec![INITIAL_VERSION]);
    assert_eq!(migrator.version().await?, 0);
    assert!(!test_db.table_exists("images_metadata").await?);

    test_db.cleanup().await
}

#[tokio::test]
async fn up_to_and_reset() -> Result<()> {
    let Some(test_db) = common::TestDb::connect().await? else { return Ok(()) };
    let migrator = migrator(&test_db);

    assert!(migrator.up_to(INITIAL_VERSION - 1).await?.is_empty());
    assert_eq!(migrator.up_to(INITIAL_VERSION).await?, vec![INITIAL_VERSION]);

    assert_eq!(migrator.reset().await?, vec![INITIAL_VERSION]);
    assert!(!test_db.table_exists("images_metadata").await?);

    test_db.cleanup().await
}

#[tokio::test]
async fn down_with_nothing_applied_fails() -> Result<()> {
    let Some(test_db) = common::TestDb::connect().await? else { return Ok(()) };

    let err = migrator(&test_db).down().await.unwrap_err();
    assert!(matches!(err, MigrationError::NothingApplied));

    test_db.cleanup().await
}
