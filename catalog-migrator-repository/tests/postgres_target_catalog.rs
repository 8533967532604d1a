//! Integration tests for the PostgreSQL target catalog, translation store and
//! checkpoint repository.
//!
//! These tests require a real PostgreSQL database (`DATABASE_URL`).
//!
//! Run with: `cargo test --test postgres_target_catalog -- --ignored`

use catalog_migrator_repository::{
    CheckpointRepository, PostgresCheckpointRepository, PostgresTargetCatalog,
    PostgresTranslationRepository, TargetCatalogRepository, TargetRepositoryError,
    TranslationRepository, TranslationRepositoryError,
};
use catalog_migrator_shared::types::{
    CollectionWrite, ContentUnitWrite, FileWrite, Language, LegacyKey, LessonStatus,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use sqlx::Row;

fn collection_write(name_id: i64) -> CollectionWrite {
    CollectionWrite {
        name_id,
        properties: json!({"kmedia_id": 1, "film_date": "2016-03-01"}),
    }
}

fn file_write(content_unit_id: i64, name: &str) -> FileWrite {
    FileWrite {
        content_unit_id,
        uid: "a1b2c3d4".to_string(),
        name: name.to_string(),
        file_created_at: Utc.with_ymd_and_hms(2016, 3, 1, 5, 30, 0).unwrap(),
        size: Some(1024),
        language: Some(Language::hebrew()),
        properties: json!({"kmedia_id": 100}),
    }
}

// ============================================================================
// Translations
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_sequence_ids_strictly_increase(pool: sqlx::PgPool) {
    let translations = PostgresTranslationRepository::new(pool).await.unwrap();

    let first = translations.next_sequence_id().await.unwrap();
    let second = translations.next_sequence_id().await.unwrap();
    assert!(second > first);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_update_translation_is_per_language(pool: sqlx::PgPool) {
    let translations = PostgresTranslationRepository::new(pool).await.unwrap();
    let id = translations.next_sequence_id().await.unwrap();
    translations.insert_translation(id, &Language::hebrew(), "א").await.unwrap();
    translations.insert_translation(id, &Language::russian(), "б").await.unwrap();

    translations.update_translation(id, &Language::hebrew(), "ב").await.unwrap();
    translations.update_translation(id, &Language::english(), "b").await.unwrap();

    let texts = translations.find_translations(id).await.unwrap();
    assert_eq!(texts.len(), 3);
    assert_eq!(texts.get(&Language::hebrew()), Some("ב"));
    assert_eq!(texts.get(&Language::russian()), Some("б"));
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_update_of_unknown_sequence_is_dangling(pool: sqlx::PgPool) {
    let translations = PostgresTranslationRepository::new(pool.clone()).await.unwrap();

    let result = translations.update_translation(4242, &Language::english(), "x").await;
    assert!(matches!(result, Err(TranslationRepositoryError::DanglingSequence(4242))));

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM string_translations")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_missing_counter_is_unavailable(pool: sqlx::PgPool) {
    sqlx::query("DROP SEQUENCE string_translations_sequence_id_seq")
        .execute(&pool)
        .await
        .unwrap();
    let translations = PostgresTranslationRepository::new(pool).await.unwrap();

    let error = translations.next_sequence_id().await.unwrap_err();
    assert!(matches!(error, TranslationRepositoryError::Unavailable(_)));
    assert!(error.is_durability_failure());
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_statement_timeout_does_not_abort(pool: sqlx::PgPool) {
    let mut conn = pool.acquire().await.unwrap();
    sqlx::query("SET statement_timeout = 1").execute(&mut *conn).await.unwrap();

    let error = sqlx::query("SELECT pg_sleep(1)").execute(&mut *conn).await.unwrap_err();
    let error = TargetRepositoryError::from(error);

    assert!(matches!(error, TargetRepositoryError::DatabaseError(_)));
    assert!(!error.is_durability_failure());
}

// ============================================================================
// Target Catalog
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_create_collection_records_mapping(pool: sqlx::PgPool) {
    let catalog = PostgresTargetCatalog::new(pool).await.unwrap();
    let key = LegacyKey::lesson(1);

    let id = catalog.create_collection(&key, &collection_write(7)).await.unwrap();

    assert_eq!(catalog.find_by_legacy_key(&key).await.unwrap(), Some(id));
    let collection = catalog.get_collection(id).await.unwrap().unwrap();
    assert_eq!(collection.type_name, "DAILY_LESSON");
    assert_eq!(collection.name_id, 7);
    assert_eq!(collection.uid.len(), 8);
    assert_eq!(collection.properties["kmedia_id"], 1);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_duplicate_create_writes_nothing(pool: sqlx::PgPool) {
    let catalog = PostgresTargetCatalog::new(pool).await.unwrap();
    let key = LegacyKey::lesson(1);
    let id = catalog.create_collection(&key, &collection_write(7)).await.unwrap();

    let result = catalog.create_collection(&key, &collection_write(8)).await;

    assert!(matches!(
        result,
        Err(TargetRepositoryError::DuplicateLegacyKey { target_id, .. }) if target_id == id
    ));
    assert_eq!(catalog.counts().await.unwrap().collections, 1);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_content_unit_link_and_update(pool: sqlx::PgPool) {
    let catalog = PostgresTargetCatalog::new(pool.clone()).await.unwrap();
    let collection = catalog.create_collection(&LegacyKey::lesson(1), &collection_write(7)).await.unwrap();
    let key = LegacyKey::container(10);
    let mut write = ContentUnitWrite {
        collection_id: collection,
        position: 1,
        name_id: None,
        properties: json!({"kmedia_id": 10}),
    };

    let unit = catalog.create_content_unit(&key, &write).await.unwrap();
    write.position = 3;
    write.name_id = Some(9);
    catalog.update_content_unit(&key, unit, &write).await.unwrap();

    let row = sqlx::query("SELECT position FROM collections_content_units WHERE content_unit_id = $1")
        .bind(unit)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(row.get::<i32, _>("position"), 3);
    assert_eq!(catalog.get_content_unit(unit).await.unwrap().unwrap().name_id, Some(9));
    assert_eq!(catalog.list_collection_units(collection).await.unwrap(), vec![unit]);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_content_unit_under_missing_collection_is_referential_error(pool: sqlx::PgPool) {
    let catalog = PostgresTargetCatalog::new(pool).await.unwrap();
    let key = LegacyKey::container(10);
    let write = ContentUnitWrite {
        collection_id: 4242,
        position: 0,
        name_id: None,
        properties: json!({}),
    };

    let result = catalog.create_content_unit(&key, &write).await;

    assert!(matches!(result, Err(TargetRepositoryError::ReferentialIntegrity(_))));
    assert_eq!(catalog.find_by_legacy_key(&key).await.unwrap(), None);
    assert_eq!(catalog.counts().await.unwrap().content_units, 0);
}

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_file_create_update_and_stale_mapping(pool: sqlx::PgPool) {
    let catalog = PostgresTargetCatalog::new(pool.clone()).await.unwrap();
    let collection = catalog.create_collection(&LegacyKey::lesson(1), &collection_write(7)).await.unwrap();
    let unit = catalog
        .create_content_unit(
            &LegacyKey::container(10),
            &ContentUnitWrite { collection_id: collection, position: 0, name_id: None, properties: json!({}) },
        )
        .await
        .unwrap();
    let key = LegacyKey::file_asset(100);

    let file = catalog.create_file(&key, &file_write(unit, "a.mp3")).await.unwrap();
    catalog.update_file(&key, file, &file_write(unit, "b.mp3")).await.unwrap();

    let files = catalog.list_unit_files(unit).await.unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].name, "b.mp3");
    assert_eq!(files[0].language, Some(Language::hebrew()));

    sqlx::query("DELETE FROM files WHERE id = $1").bind(file).execute(&pool).await.unwrap();
    let result = catalog.update_file(&key, file, &file_write(unit, "c.mp3")).await;
    assert!(matches!(result, Err(TargetRepositoryError::StaleMapping { .. })));
}

// ============================================================================
// Checkpoints
// ============================================================================

#[sqlx::test(migrations = "src/postgres/migrations")]
#[ignore = "requires a PostgreSQL instance (DATABASE_URL)"]
async fn test_checkpoints_round_trip(pool: sqlx::PgPool) {
    let checkpoints = PostgresCheckpointRepository::new(pool).await.unwrap();
    checkpoints.save_checkpoint("run", 1, LessonStatus::Failed).await.unwrap();
    checkpoints.save_checkpoint("run", 1, LessonStatus::Migrated).await.unwrap();
    checkpoints.save_checkpoint("run", 2, LessonStatus::PartiallyMigrated).await.unwrap();

    let completed = checkpoints.completed_lessons("run").await.unwrap();
    assert_eq!(completed.into_iter().collect::<Vec<_>>(), vec![1]);
    assert_eq!(
        checkpoints.get_checkpoint("run", 2).await.unwrap(),
        Some(LessonStatus::PartiallyMigrated)
    );
    assert!(checkpoints.completed_lessons("other").await.unwrap().is_empty());
}
