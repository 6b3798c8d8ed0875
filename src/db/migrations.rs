use sqlx::SqlitePool;

/// Ordered schema migrations, applied once each at startup
///
/// The applied version is tracked in `schema_version`, so re-running the
/// list on an up-to-date database is a no-op.
const MIGRATIONS: &[(i64, &str)] = &[
    (
        1,
        r#"
        CREATE TABLE IF NOT EXISTS media_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tmdb_id INTEGER,
            title TEXT NOT NULL,
            director TEXT NOT NULL DEFAULT '',
            genre TEXT NOT NULL DEFAULT '',
            platform TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'wishlist',
            rating REAL,
            review TEXT,
            episodes_watched INTEGER NOT NULL DEFAULT 0,
            total_episodes INTEGER,
            minutes_watched INTEGER NOT NULL DEFAULT 0,
            total_minutes INTEGER,
            is_tv_show INTEGER NOT NULL DEFAULT 0,
            poster_path TEXT,
            release_date TEXT,
            overview TEXT,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_media_items_tmdb_id ON media_items (tmdb_id);
        CREATE INDEX IF NOT EXISTS idx_media_items_status ON media_items (status);
        "#,
    ),
    (
        2,
        r#"
        CREATE TABLE IF NOT EXISTS party_rooms (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            code TEXT NOT NULL UNIQUE,
            media_id INTEGER NOT NULL,
            media_title TEXT NOT NULL,
            media_poster TEXT,
            host_id TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            members TEXT NOT NULL DEFAULT '[]',
            version INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_party_rooms_active ON party_rooms (code, is_active);
        "#,
    ),
];

/// Applies all pending migrations
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    let current: Option<i64> = sqlx::query_scalar("SELECT MAX(version) FROM schema_version")
        .fetch_one(pool)
        .await?;
    let current = current.unwrap_or(0);

    for (version, sql) in MIGRATIONS {
        if *version <= current {
            continue;
        }

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(sql).execute(&mut *tx).await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(*version)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        tracing::info!(version, "Applied schema migration");
    }

    Ok(())
}
