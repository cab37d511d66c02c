use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use storefront_auth::Authenticator;
use storefront_chats::{ChatHub, ConnectionRegistry};
use storefront_config::AppConfig;
use storefront_database::{initialize_database, SqlitePool};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// How often expired sessions are swept from the database.
pub const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(600);

pub mod telemetry {
    use anyhow::Result;
    use tracing::Level;
    use tracing_subscriber::{fmt::SubscriberBuilder, EnvFilter};

    pub fn init_tracing() -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let subscriber = SubscriberBuilder::default()
            .with_max_level(Level::TRACE)
            .with_env_filter(env_filter)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .map_err(|error| anyhow::anyhow!("failed to set tracing subscriber: {error}"))
    }
}

#[derive(Clone)]
pub struct BackendServices {
    pub db_pool: SqlitePool,
    pub authenticator: Authenticator,
    pub registry: Arc<ConnectionRegistry>,
    pub hub: Arc<ChatHub>,
}

impl BackendServices {
    pub async fn initialise(config: &AppConfig) -> Result<Self> {
        let db_pool = initialize_database(&config.database)
            .await
            .context("failed to initialise database")?;

        let authenticator = Authenticator::new(db_pool.clone(), &config.auth);
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(ChatHub::new(
            db_pool.clone(),
            authenticator.clone(),
            registry.clone(),
            config.realtime.clone(),
        ));

        info!(
            typing_timeout_ms = config.realtime.typing_timeout_ms,
            outbound_buffer = config.realtime.outbound_buffer,
            "chat hub ready"
        );

        Ok(Self {
            db_pool,
            authenticator,
            registry,
            hub,
        })
    }

    /// Start the periodic jobs a serving process needs. One-shot commands
    /// skip this.
    pub fn spawn_background_tasks(&self) -> BackgroundTasks {
        let typing_sweeper = self.hub.spawn_typing_sweeper();

        let authenticator = self.authenticator.clone();
        let session_purger = tokio::spawn(async move {
            let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
            loop {
                interval.tick().await;
                if let Err(error) = authenticator.purge_expired_sessions().await {
                    warn!(%error, "failed to purge expired sessions");
                }
            }
        });

        BackgroundTasks {
            handles: vec![typing_sweeper, session_purger],
        }
    }
}

/// Handles of the periodic jobs. Dropping this stops them.
pub struct BackgroundTasks {
    handles: Vec<JoinHandle<()>>,
}

impl BackgroundTasks {
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn is_running(&self) -> bool {
        self.handles.iter().all(|handle| !handle.is_finished())
    }
}

impl Drop for BackgroundTasks {
    fn drop(&mut self) {
        for handle in &self.handles {
            handle.abort();
        }
    }
}

pub async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        warn!(?error, "failed to listen for shutdown signal");
    }
    info!("shutdown signal received");
}
