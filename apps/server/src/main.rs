use anyhow::Context;
use clap::{Parser, Subcommand};
use storefront_config::{load as load_config, AppConfig};
use storefront_database::{MessageType, RoomKind, UserRole};
use storefront_gateway::{create_router, GatewayState};
use storefront_runtime::{telemetry, BackendServices};
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "storefront-backend")]
#[command(about = "Storefront realtime chat and notification backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
enum Commands {
    /// Start the HTTP and WebSocket server
    Serve,
    /// Seed the database with a buyer, a seller and a support agent
    SeedData,
    /// Issue a session token for an existing user
    IssueToken {
        /// Public id of the user
        #[arg(long)]
        user: String,
    },
    /// Send a notification to a user
    Notify {
        /// Public id of the recipient
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::SeedData => seed_data(&connect(&config).await?).await,
        Commands::IssueToken { user } => issue_token(&connect(&config).await?, &user).await,
        Commands::Notify {
            user,
            title,
            content,
        } => notify(&connect(&config).await?, &user, &title, &content).await,
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<BackendServices> {
    BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("starting storefront backend");

    let services = connect(&config).await?;
    let _background = services.spawn_background_tasks();

    let state = GatewayState::new(services.hub.clone(), &config.auth);
    let app = create_router(state);

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, dev_tokens = config.auth.allow_dev_tokens, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(storefront_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

/// Users and a conversation to click through in a fresh database.
struct SeedSummary {
    tokens: Vec<(String, String, String)>,
    room_id: String,
}

async fn seed_data(services: &BackendServices) -> anyhow::Result<()> {
    let summary = seed(services).await?;

    println!("Seeded users:");
    for (display_name, public_id, token) in &summary.tokens {
        println!("- {display_name:<16} {public_id:<24} token {token}");
    }
    println!("Support room: {}", summary.room_id);
    Ok(())
}

async fn seed(services: &BackendServices) -> anyhow::Result<SeedSummary> {
    let authenticator = &services.authenticator;
    let hub = &services.hub;

    let buyer = authenticator
        .create_user("Demo Buyer", UserRole::Buyer)
        .await
        .context("failed to create buyer")?;
    let seller = authenticator
        .create_user("Demo Seller", UserRole::Seller)
        .await
        .context("failed to create seller")?;
    let support = authenticator
        .create_user("Demo Support", UserRole::Support)
        .await
        .context("failed to create support agent")?;

    let direct = hub
        .rooms()
        .get_or_create_room(&buyer, &seller.public_id, RoomKind::Direct)
        .await
        .context("failed to open buyer/seller room")?;
    hub.messages()
        .send_message(
            &buyer,
            &direct.public_id,
            "Hi! Is the walnut desk still available?",
            MessageType::Text,
        )
        .await
        .context("failed to send buyer message")?;
    hub.messages()
        .send_message(
            &seller,
            &direct.public_id,
            "It is, I can ship it on Monday.",
            MessageType::Text,
        )
        .await
        .context("failed to send seller message")?;

    let support_room = hub
        .rooms()
        .get_or_create_room(&buyer, &support.public_id, RoomKind::Support)
        .await
        .context("failed to open support room")?;
    hub.messages()
        .send_message(
            &support,
            &support_room.public_id,
            "Welcome to the storefront. Ask us anything here.",
            MessageType::System,
        )
        .await
        .context("failed to send support greeting")?;

    hub.notifications()
        .notify(buyer.id, "Order shipped", "Your order is on its way.")
        .await
        .context("failed to create notification")?;

    let mut tokens = Vec::new();
    for user in [&buyer, &seller, &support] {
        let session = authenticator
            .issue_session(user.id)
            .await
            .with_context(|| format!("failed to issue session for {}", user.public_id))?;
        tokens.push((
            user.display_name.clone(),
            user.public_id.clone(),
            session.token,
        ));
    }

    info!(
        users = tokens.len(),
        direct_room = %direct.public_id,
        support_room = %support_room.public_id,
        "database seeded"
    );
    Ok(SeedSummary {
        tokens,
        room_id: support_room.public_id,
    })
}

async fn issue_token(services: &BackendServices, public_id: &str) -> anyhow::Result<()> {
    let user = services
        .authenticator
        .find_user(public_id)
        .await
        .with_context(|| format!("no user with id {public_id}"))?;
    let session = services
        .authenticator
        .issue_session(user.id)
        .await
        .context("failed to issue session")?;

    println!("{}", session.token);
    println!("expires at {}", session.expires_at.to_rfc3339());
    Ok(())
}

async fn notify(
    services: &BackendServices,
    public_id: &str,
    title: &str,
    content: &str,
) -> anyhow::Result<()> {
    let notification = services
        .hub
        .notifications()
        .notify_public_id(public_id, title, content)
        .await
        .context("failed to send notification")?;

    println!("notification {} stored for {public_id}", notification.id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn services(temp_dir: &TempDir) -> BackendServices {
        let mut config = AppConfig::default();
        config.database.url = format!("sqlite://{}", temp_dir.path().join("cli.db").display());
        config.database.max_connections = 2;
        connect(&config).await.unwrap()
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["storefront-backend"]).unwrap();
        assert_eq!(cli.command, None);

        let cli = Cli::try_parse_from(["storefront-backend", "issue-token", "--user", "u1"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::IssueToken {
                user: "u1".to_string()
            })
        );

        let cli = Cli::try_parse_from([
            "storefront-backend",
            "notify",
            "--user",
            "u1",
            "--title",
            "Hello",
            "--content",
            "World",
        ])
        .unwrap();
        assert!(matches!(cli.command, Some(Commands::Notify { .. })));
    }

    #[test]
    fn notify_requires_every_field() {
        assert!(Cli::try_parse_from(["storefront-backend", "notify", "--user", "u1"]).is_err());
    }

    #[tokio::test]
    async fn seed_creates_users_rooms_and_tokens() {
        let temp_dir = TempDir::new().unwrap();
        let services = services(&temp_dir).await;

        let summary = seed(&services).await.unwrap();
        assert_eq!(summary.tokens.len(), 3);

        for (_, public_id, token) in &summary.tokens {
            let (user, _) = services.authenticator.authenticate_token(token).await.unwrap();
            assert_eq!(&user.public_id, public_id);
        }

        let rooms: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM rooms")
            .fetch_one(&services.db_pool)
            .await
            .unwrap();
        let messages: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages")
            .fetch_one(&services.db_pool)
            .await
            .unwrap();
        let notifications: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
            .fetch_one(&services.db_pool)
            .await
            .unwrap();
        assert_eq!((rooms, messages, notifications), (2, 3, 1));
    }

    #[tokio::test]
    async fn issue_token_and_notify_reject_unknown_users() {
        let temp_dir = TempDir::new().unwrap();
        let services = services(&temp_dir).await;

        assert!(issue_token(&services, "missing").await.is_err());
        assert!(notify(&services, "missing", "Title", "Body").await.is_err());
    }
}
