//! Subcommand implementations.

pub mod report;

use anyhow::Result;
use chrono::Utc;

use crypto_pipeline_core::AppConfig;
use crypto_pipeline_data::{CsvExporter, Database};

/// Runs one full collection round.
pub async fn collect(config: &AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.path).await?;
    db.ensure_schema().await?;

    crypto_pipeline_collectors::collect_all(&db, config).await?;

    db.close().await;
    Ok(())
}

/// Exports every table to a new CSV session directory.
pub async fn export(config: &AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.path).await?;
    db.ensure_schema().await?;

    let session = CsvExporter::new(&config.export.dir).run(&db).await?;
    println!("Exported to {}", session.display());

    db.close().await;
    Ok(())
}

/// Creates the schema and records the initialization time.
pub async fn init_db(config: &AppConfig) -> Result<()> {
    let db = Database::connect(&config.database.path).await?;
    db.ensure_schema().await?;

    if let Some(at) = db.get_meta("initialized_at").await? {
        println!("Database already initialized at {at}");
    } else {
        let now = Utc::now().to_rfc3339();
        db.set_meta("initialized_at", &now).await?;
        println!("Database initialized at {}", config.database.path);
    }

    db.close().await;
    Ok(())
}
