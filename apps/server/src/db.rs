use sqlx::SqlitePool;

pub async fn run_migrations(pool: &SqlitePool) -> anyhow::Result<()> {
    // Enable WAL mode for better concurrent access
    sqlx::query("PRAGMA journal_mode=WAL").execute(pool).await?;

    // Create migrations tracking table
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS _migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .execute(pool)
    .await?;

    let applied: bool =
        sqlx::query_scalar("SELECT COUNT(*) > 0 FROM _migrations WHERE name = '001_init'")
            .fetch_one(pool)
            .await?;

    if !applied {
        let migration_sql = include_str!("../migrations/001_init.sql");
        for statement in migration_sql.split(';') {
            let trimmed = statement.trim();
            if !trimmed.is_empty() {
                sqlx::query(trimmed).execute(pool).await?;
            }
        }
        sqlx::query("INSERT INTO _migrations (name) VALUES ('001_init')")
            .execute(pool)
            .await?;
        tracing::info!("Applied migration: 001_init");
    }

    tracing::info!("Database migrations up to date");
    Ok(())
}

// ── Test support ──

#[cfg(test)]
pub(crate) mod test_util {
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::SqlitePool;

    /// Fresh in-memory database with the full schema applied.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        super::run_migrations(&pool).await.expect("migrations");
        pool
    }

    pub async fn insert_slot(pool: &SqlitePool, date: &str, start: &str, available: bool) -> i64 {
        sqlx::query("INSERT INTO time_slots (date, start_time, is_available) VALUES (?, ?, ?)")
            .bind(date)
            .bind(start)
            .bind(available)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn insert_service(pool: &SqlitePool, name: &str, price: i64, active: bool) -> i64 {
        sqlx::query("INSERT INTO services (name, price, is_active) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(active)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn insert_design(pool: &SqlitePool, name: &str, price: i64, active: bool) -> i64 {
        sqlx::query("INSERT INTO designs (name, price, is_active) VALUES (?, ?, ?)")
            .bind(name)
            .bind(price)
            .bind(active)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    pub async fn insert_category(pool: &SqlitePool, name: &str) -> i64 {
        sqlx::query("INSERT INTO categories (name) VALUES (?)")
            .bind(name)
            .execute(pool)
            .await
            .unwrap()
            .last_insert_rowid()
    }

    /// Insert a booking row directly, bypassing admission.
    pub async fn insert_booking(
        pool: &SqlitePool,
        service_id: i64,
        slot_id: i64,
        status: &str,
    ) -> i64 {
        sqlx::query(
            "INSERT INTO bookings (service_id, time_slot_id, client_name, client_phone, status)
             VALUES (?, ?, 'Тест', '79990000000', ?)",
        )
        .bind(service_id)
        .bind(slot_id)
        .bind(status)
        .execute(pool)
        .await
        .unwrap()
        .last_insert_rowid()
    }

    pub async fn booking_count(pool: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(pool)
            .await
            .unwrap()
    }
}
