use chrono::{Duration, Utc};
use library_tracker::adapters::file::{CsvCatalogStore, JsonCatalogStore, TextCatalogStore};
use library_tracker::adapters::mock::TransactionLog as MockTransactionLog;
use library_tracker::application::library::{
    ImportSummary, LibraryApplicationError, ServiceDependencies, borrow_item, load_catalog,
    return_item, save_catalog, share,
};
use library_tracker::domain::commands::*;
use library_tracker::domain::*;
use library_tracker::ports::{CatalogStore, StoreError};
use rust_decimal_macros::dec;
use std::sync::Arc;

// ============================================================================
// テスト用ヘルパー
// ============================================================================

fn deps_for(catalog: Catalog) -> ServiceDependencies {
    ServiceDependencies {
        catalog: share(catalog),
        transaction_log: Arc::new(MockTransactionLog::new()),
    }
}

/// 貸出・延滞金を含む状態のカタログ
async fn populated() -> ServiceDependencies {
    let now = Utc::now();
    let mut catalog = Catalog::new("Python Learning Library", now);
    catalog
        .add_item(
            Item::physical(ItemId::new(101).unwrap(), "Python Programming", "John Doe", 2023)
                .with_genre(Genre::Programming),
        )
        .unwrap();
    catalog
        .add_item(Item::digital(
            ItemId::new(102).unwrap(),
            "Web Development",
            "Jane Smith",
            2024,
            5.2,
            "PDF",
        ))
        .unwrap();
    catalog
        .register_patron(Patron::standard(
            PatronId::new(1001).unwrap(),
            "Alice",
            Email::parse("alice@email.com").unwrap(),
            now,
        ))
        .unwrap();
    catalog
        .register_patron(Patron::premium(
            PatronId::new(1002).unwrap(),
            "Bob",
            Email::parse("bob@email.com").unwrap(),
            PremiumTier::Gold,
            now,
        ))
        .unwrap();
    let deps = deps_for(catalog);

    let alice = PatronId::new(1001).unwrap();
    let bob = PatronId::new(1002).unwrap();
    borrow_item(
        &deps,
        BorrowItem {
            patron_id: alice,
            item_id: ItemId::new(101).unwrap(),
            borrowed_at: now,
        },
    )
    .await
    .unwrap();
    return_item(
        &deps,
        ReturnItem {
            patron_id: alice,
            item_id: ItemId::new(101).unwrap(),
            returned_at: now + Duration::days(20),
        },
    )
    .await
    .unwrap();
    borrow_item(
        &deps,
        BorrowItem {
            patron_id: bob,
            item_id: ItemId::new(102).unwrap(),
            borrowed_at: now,
        },
    )
    .await
    .unwrap();
    deps
}

async fn assert_round_trip(store: &dyn CatalogStore) {
    let source = populated().await;
    save_catalog(&source, store, Utc::now()).await.unwrap();

    let target = deps_for(Catalog::new("Restored", Utc::now()));
    let summary = load_catalog(&target, store, Utc::now()).await.unwrap();

    assert_eq!(
        summary,
        ImportSummary {
            items_accepted: 2,
            items_rejected: 0,
            patrons_accepted: 2,
            patrons_rejected: 0,
            duplicates: 0,
        }
    );

    let catalog = target.catalog.lock().unwrap();
    // 貸出状態は復元しない
    let web = catalog.find_item(ItemId::new(102).unwrap()).unwrap();
    assert!(web.is_available());
    assert!(web.is_digital());
    assert_eq!(
        catalog.find_item(ItemId::new(101).unwrap()).unwrap().genre(),
        Genre::Programming
    );
    // 延滞金残高は引き継ぐ
    let alice = catalog.find_patron(PatronId::new(1001).unwrap()).unwrap();
    assert_eq!(alice.fine_balance(), dec!(3.00));
    let bob = catalog.find_patron(PatronId::new(1002).unwrap()).unwrap();
    assert_eq!(bob.tier(), Some(PremiumTier::Gold));
    assert!(bob.held_items().is_empty());
    assert!(catalog.is_consistent());
}

// ============================================================================
// 形式ごとの保存・読み込み
// ============================================================================

#[tokio::test]
async fn test_text_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    assert_round_trip(&TextCatalogStore::new(dir.path().join("library_data.txt"))).await;
}

#[tokio::test]
async fn test_csv_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    assert_round_trip(&CsvCatalogStore::new(dir.path().join("csv"))).await;
}

#[tokio::test]
async fn test_json_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    assert_round_trip(&JsonCatalogStore::new(dir.path().join("library_data.json"))).await;
}

// ============================================================================
// 読み込み時の異常系
// ============================================================================

#[tokio::test]
async fn test_csv_row_missing_year_is_reported_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(
        dir.path().join("items.csv"),
        "id,title,creator,year,genre,kind,available\n\
         1,Dune,Frank Herbert,1965,Fiction,physical,true\n\
         2,Cosmos,Carl Sagan,1980,Science,physical,true\n\
         3,SPQR,Mary Beard,,History,physical,true\n\
         4,The Rust Book,Steve Klabnik,2019,Programming,physical,true\n\
         5,Sapiens,Yuval Harari,2011,Non-Fiction,physical,true\n",
    )
    .await
    .unwrap();
    tokio::fs::write(
        dir.path().join("patrons.csv"),
        "id,name,email,tier,borrowed_count,fine_balance\n",
    )
    .await
    .unwrap();
    let deps = deps_for(Catalog::new("Import", Utc::now()));

    let summary = load_catalog(&deps, &CsvCatalogStore::new(dir.path()), Utc::now())
        .await
        .unwrap();

    assert_eq!(summary.items_accepted, 4);
    assert_eq!(summary.items_rejected, 1);
    let catalog = deps.catalog.lock().unwrap();
    assert_eq!(catalog.item_count(), 4);
    assert!(catalog.find_item(ItemId::new(3).unwrap()).is_none());
}

#[tokio::test]
async fn test_existing_ids_are_counted_as_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonCatalogStore::new(dir.path().join("library_data.json"));
    let deps = populated().await;
    save_catalog(&deps, &store, Utc::now()).await.unwrap();

    let summary = load_catalog(&deps, &store, Utc::now()).await.unwrap();

    assert_eq!(summary.items_accepted, 0);
    assert_eq!(summary.patrons_accepted, 0);
    assert_eq!(summary.duplicates, 4);
    // 既存の貸出状態はそのまま
    let catalog = deps.catalog.lock().unwrap();
    assert_eq!(
        catalog.find_item(ItemId::new(102).unwrap()).unwrap().holder(),
        Some(PatronId::new(1002).unwrap())
    );
}

#[tokio::test]
async fn test_missing_file_leaves_catalog_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let deps = populated().await;
    let before = deps.catalog.lock().unwrap().snapshot(Utc::now());

    let result = load_catalog(
        &deps,
        &TextCatalogStore::new(dir.path().join("absent.txt")),
        before.generated_at,
    )
    .await;

    assert!(matches!(
        result,
        Err(LibraryApplicationError::StoreError(StoreError::NotFound { .. }))
    ));
    assert_eq!(deps.catalog.lock().unwrap().snapshot(before.generated_at), before);
}
