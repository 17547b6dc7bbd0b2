//! Database initialization
//!
//! Schema is created idempotently on startup; every statement is safe to run
//! against an existing database.

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::path::Path;
use tracing::info;

use vigil_common::Result;

/// Open (or create) the database at `db_path` and ensure the schema exists
pub async fn init_database(db_path: &Path) -> anyhow::Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = connect(&db_url).await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Connect to a database URL, apply pragmas, and create the schema.
/// Integration tests use this directly with `sqlite::memory:`.
pub async fn connect(db_url: &str) -> Result<SqlitePool> {
    // Every pooled connection to :memory: would get its own database, so an
    // in-memory pool must stay at one connection
    let max_connections = if db_url.contains(":memory:") { 1 } else { 10 };
    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;

    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_elders_table(&pool).await?;
    create_caregivers_table(&pool).await?;
    create_caregiver_elders_table(&pool).await?;
    create_game_sessions_table(&pool).await?;
    create_questionnaires_table(&pool).await?;

    Ok(pool)
}

async fn create_elders_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS elders (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            age INTEGER NOT NULL,
            gender TEXT NOT NULL,
            d1 INTEGER NOT NULL DEFAULT 0,
            d2 INTEGER NOT NULL DEFAULT 0,
            d3 INTEGER NOT NULL DEFAULT 0,
            caregiver_guid TEXT REFERENCES caregivers(guid),
            pending_caregiver_email TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_caregivers_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS caregivers (
            guid TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            phone TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Roster join table; rows here must stay consistent with
/// elders.caregiver_guid (both are written in one transaction)
async fn create_caregiver_elders_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS caregiver_elders (
            caregiver_guid TEXT NOT NULL REFERENCES caregivers(guid),
            elder_guid TEXT NOT NULL REFERENCES elders(guid),
            created_at TEXT NOT NULL,
            PRIMARY KEY (caregiver_guid, elder_guid)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_game_sessions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_sessions (
            guid TEXT PRIMARY KEY,
            elder_guid TEXT NOT NULL REFERENCES elders(guid),
            disease_type TEXT NOT NULL,
            mode TEXT NOT NULL,
            result TEXT NOT NULL,
            metrics TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_game_sessions_elder ON game_sessions(elder_guid, created_at)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_questionnaires_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS questionnaires (
            guid TEXT PRIMARY KEY,
            elder_guid TEXT NOT NULL REFERENCES elders(guid),
            caregiver_guid TEXT,
            height REAL NOT NULL,
            weight REAL NOT NULL,
            blood_pressure TEXT,
            heart_rate REAL,
            breaths_per_min REAL NOT NULL,
            physical_activity TEXT,
            sleep_hours REAL,
            stress_level INTEGER NOT NULL DEFAULT 3,
            bmi REAL NOT NULL,
            bmi_status TEXT NOT NULL,
            authenticated INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
