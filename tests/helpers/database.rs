use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use haccp_plan::adapters::sqlite::create_migrated_test_pool;
use haccp_plan::cli::AppContext;
use haccp_plan::{Config, FixedClock};
use sqlx::SqlitePool;

/// Create an in-memory SQLite database for testing
///
/// Each call creates a completely isolated database with the embedded
/// migrations applied.
pub async fn setup_test_db() -> SqlitePool {
    create_migrated_test_pool()
        .await
        .expect("failed to create test database")
}

/// Application context on a fresh database, with the clock pinned at `now`.
///
/// Photos are written below `photo_dir`.
pub async fn setup_context(now: DateTime<Utc>, timezone: &str, photo_dir: &Path) -> (AppContext, Arc<FixedClock>) {
    let mut config = Config::default();
    config.organization.timezone = timezone.to_string();
    config.photos.directory = photo_dir.to_path_buf();

    let clock = Arc::new(FixedClock::new(now));
    let ctx = AppContext::with_pool(&config, setup_test_db().await, clock.clone())
        .expect("failed to build application context");
    (ctx, clock)
}

/// Teardown test database
pub async fn teardown_test_db(pool: SqlitePool) {
    pool.close().await;
}
