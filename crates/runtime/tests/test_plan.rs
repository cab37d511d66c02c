use std::{fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use storefront_chats::ServerEvent;
use storefront_config::AppConfig;
use storefront_database::UserRole;
use storefront_runtime::{self, BackendServices};
use tempfile::TempDir;
use tokio::time::sleep;

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.to_string_lossy())
}

fn build_config(database_url: String, max_connections: u32) -> AppConfig {
    let mut config = AppConfig::default();
    config.database.url = database_url;
    config.database.max_connections = max_connections;
    config
}

async fn initialise(config: &AppConfig) -> Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_runs_migrations() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/init.db");
    let config = build_config(sqlite_url(&db_path), 4);

    let services = initialise(&config).await?;
    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type = 'table' AND name IN ('users', 'sessions', 'rooms', 'messages', 'notifications') ORDER BY name",
    )
    .fetch_all(&services.db_pool)
    .await?;

    assert_eq!(
        vec!["messages", "notifications", "rooms", "sessions", "users"],
        tables
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_creates_sqlite_directory_if_missing() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_dir = temp_dir.path().join("nested");
    let db_path = db_dir.join("prepared.db");
    let config = build_config(sqlite_url(&db_path), 2);

    assert!(!db_dir.exists());

    let services = initialise(&config).await?;
    assert!(db_dir.exists(), "database directory should be created");
    assert!(db_path.exists(), "sqlite database file should be created");
    drop(services);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_applies_max_connections_setting() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("runtime/max_conn.db");
    let max_connections = 3;
    let config = build_config(sqlite_url(&db_path), max_connections);

    let services = initialise(&config).await?;
    assert_eq!(
        max_connections,
        services.db_pool.options().get_max_connections()
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn initialise_reports_database_failures_with_context() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let blocker = temp_dir.path().join("blocker");
    fs::write(&blocker, b"not a directory")?;
    let config = build_config(sqlite_url(&blocker.join("db.sqlite")), 1);

    let error = match BackendServices::initialise(&config).await {
        Ok(_) => panic!("expected initialisation to fail when the directory is a file"),
        Err(error) => error,
    };
    assert!(
        error.to_string().contains("failed to initialise database"),
        "database errors should propagate with context, got {error:#}"
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn hub_and_authenticator_share_one_database_and_registry() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let config = build_config(sqlite_url(&temp_dir.path().join("wiring.db")), 2);
    let services = initialise(&config).await?;

    let user = services
        .authenticator
        .create_user("Wiring Check", UserRole::Buyer)
        .await?;
    let session = services.authenticator.issue_session(user.id).await?;

    let (outbound_tx, mut outbound) = services.hub.outbound_channel();
    let connection = services.hub.connect(&session.token, outbound_tx).await?;

    assert_eq!(1, services.registry.connection_count().await);
    assert!(services.hub.presence().is_online(user.id).await);
    match outbound.recv().await {
        Some(ServerEvent::Joined { user: joined, .. }) => assert_eq!(user.public_id, joined.id),
        other => panic!("expected joined, got {other:?}"),
    }

    assert!(services.hub.disconnect(connection.id()).await);
    assert_eq!(0, services.registry.connection_count().await);
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn background_tasks_purge_expired_sessions() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut config = build_config(sqlite_url(&temp_dir.path().join("purge.db")), 2);
    config.auth.session_ttl_seconds = 0;
    let services = initialise(&config).await?;

    let user = services
        .authenticator
        .create_user("Short Lived", UserRole::Buyer)
        .await?;
    services.authenticator.issue_session(user.id).await?;
    sleep(Duration::from_millis(20)).await;

    let tasks = services.spawn_background_tasks();
    assert_eq!(2, tasks.len());

    let mut remaining = i64::MAX;
    for _ in 0..50 {
        remaining = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&services.db_pool)
            .await?;
        if remaining == 0 {
            break;
        }
        sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(0, remaining, "expired sessions should be purged on startup");
    assert!(tasks.is_running());
    Ok(())
}

#[test]
fn telemetry_init_tracing_sets_global_subscriber() {
    storefront_runtime::telemetry::init_tracing().expect("first initialisation should succeed");

    let second = storefront_runtime::telemetry::init_tracing();
    assert!(
        second.is_err(),
        "initialising telemetry twice should fail with global subscriber already set"
    );
}
