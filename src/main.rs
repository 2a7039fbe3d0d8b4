use chrono::{Duration, Utc};
use library_tracker::{
    adapters::file::{CsvCatalogStore, FileTransactionLog, JsonCatalogStore, TextCatalogStore},
    application::library::{
        ReportFormat, ServiceDependencies, borrow_item, load_catalog, recent_transactions, render,
        return_item, save_catalog, share, snapshot,
    },
    config::{AppConfig, LoggingConfig},
    domain::{
        Catalog, Email, Genre, Item, ItemId, Patron, PatronId, PremiumTier, commands::*,
    },
    ports::CatalogStore,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(logging: &LoggingConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("library_tracker={}", logging.level).into());
    let json = logging.format == "json";

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

/// Build the demo catalog: one physical and one digital book, a standard and a Gold patron
fn demo_catalog(name: &str) -> Result<Catalog, Box<dyn std::error::Error>> {
    let now = Utc::now();
    let mut catalog = Catalog::new(name, now);

    catalog.add_item(
        Item::physical(ItemId::new(101)?, "Python Programming", "John Doe", 2023)
            .with_genre(Genre::Programming),
    )?;
    catalog.add_item(
        Item::digital(ItemId::new(102)?, "Web Development", "Jane Smith", 2024, 5.2, "PDF")
            .with_genre(Genre::Programming),
    )?;
    catalog.register_patron(Patron::standard(
        PatronId::new(1001)?,
        "Alice",
        Email::parse("alice@email.com")?,
        now,
    ))?;
    catalog.register_patron(Patron::premium(
        PatronId::new(1002)?,
        "Bob",
        Email::parse("bob@email.com")?,
        PremiumTier::Gold,
        now,
    ))?;

    Ok(catalog)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);

    tracing::info!("Starting library tracker v{}", env!("CARGO_PKG_VERSION"));

    let data_dir = &config.storage.data_dir;
    tokio::fs::create_dir_all(data_dir).await?;
    if let Some(parent) = config.storage.transaction_log.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let deps = ServiceDependencies {
        catalog: share(demo_catalog(&config.library.name)?),
        transaction_log: Arc::new(FileTransactionLog::new(&config.storage.transaction_log)),
    };

    let alice = PatronId::new(1001)?;
    let bob = PatronId::new(1002)?;
    let python_book = ItemId::new(101)?;
    let web_book = ItemId::new(102)?;
    let day0 = Utc::now();

    borrow_item(
        &deps,
        BorrowItem {
            patron_id: alice,
            item_id: python_book,
            borrowed_at: day0,
        },
    )
    .await?;
    println!("✓ Alice borrowed 'Python Programming'");

    // Conflicting borrow: the item is already held by Alice
    match borrow_item(
        &deps,
        BorrowItem {
            patron_id: bob,
            item_id: python_book,
            borrowed_at: day0,
        },
    )
    .await
    {
        Ok(_) => println!("✓ Bob borrowed 'Python Programming'"),
        Err(e) => println!("✗ Bob could not borrow 'Python Programming': {}", e),
    }

    borrow_item(
        &deps,
        BorrowItem {
            patron_id: bob,
            item_id: web_book,
            borrowed_at: day0,
        },
    )
    .await?;
    println!("✓ Bob borrowed 'Web Development'");

    let returned = return_item(
        &deps,
        ReturnItem {
            patron_id: alice,
            item_id: python_book,
            returned_at: day0 + Duration::days(20),
        },
    )
    .await?;
    match returned.late_fee {
        Some(fee) => println!(
            "✓ Alice returned 'Python Programming' after {} days, late fee ${:.2}",
            returned.days_held, fee
        ),
        None => println!("✓ Alice returned 'Python Programming' on time"),
    }

    let format = config
        .library
        .report_format
        .parse::<ReportFormat>()
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, "falling back to text report");
            ReportFormat::Text
        });
    println!("\n{}", render(&snapshot(&deps, Utc::now()), format)?);

    let stores: Vec<Box<dyn CatalogStore>> = vec![
        Box::new(TextCatalogStore::new(data_dir.join("library_data.txt"))),
        Box::new(CsvCatalogStore::new(data_dir.join("csv"))),
        Box::new(JsonCatalogStore::new(data_dir.join("library_data.json"))),
    ];
    for store in &stores {
        save_catalog(&deps, store.as_ref(), Utc::now()).await?;
    }
    println!("✓ Saved catalog to {}", data_dir.display());

    // Rebuild a fresh catalog from the saved JSON
    let restored = ServiceDependencies {
        catalog: share(Catalog::new(&config.library.name, Utc::now())),
        transaction_log: deps.transaction_log.clone(),
    };
    let summary = load_catalog(
        &restored,
        &JsonCatalogStore::new(data_dir.join("library_data.json")),
        Utc::now(),
    )
    .await?;
    println!(
        "✓ Restored {} items and {} patrons ({} skipped)",
        summary.items_accepted,
        summary.patrons_accepted,
        summary.items_rejected + summary.patrons_rejected
    );

    println!("\nRecent transactions:");
    for line in recent_transactions(&deps, 5).await {
        println!("  {}", line);
    }

    Ok(())
}
