use std::sync::Arc;

use axum::{
    body::Body,
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_REQUEST_HEADERS,
            ACCESS_CONTROL_REQUEST_METHOD, AUTHORIZATION, CONTENT_TYPE, ORIGIN,
        },
        Method, Request, StatusCode,
    },
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use storefront_auth::Authenticator;
use storefront_chats::{ChatHub, Connection, ConnectionRegistry, ServerEvent};
use storefront_config::{AuthConfig, DatabaseConfig, RealtimeConfig};
use storefront_database::{initialize_database, User, UserRole};
use storefront_gateway::{create_router, GatewayState};
use tempfile::TempDir;
use tokio::sync::mpsc;
use tower::ServiceExt;

type TestResult<T = ()> = anyhow::Result<T>;

struct TestContext {
    _temp_dir: TempDir,
    hub: Arc<ChatHub>,
    router: Router,
}

impl TestContext {
    async fn new() -> TestResult<Self> {
        Self::with_auth(AuthConfig::default()).await
    }

    async fn with_auth(auth: AuthConfig) -> TestResult<Self> {
        let temp_dir = TempDir::new()?;
        let db_path = temp_dir.path().join("gateway.sqlite");
        let pool = initialize_database(&DatabaseConfig {
            url: format!("sqlite://{}", db_path.display()),
            max_connections: 5,
        })
        .await?;

        let authenticator = Authenticator::new(pool.clone(), &auth);
        let registry = Arc::new(ConnectionRegistry::new());
        let hub = Arc::new(ChatHub::new(
            pool,
            authenticator,
            registry,
            RealtimeConfig::default(),
        ));
        let router = create_router(GatewayState::new(hub.clone(), &auth));

        Ok(Self {
            _temp_dir: temp_dir,
            hub,
            router,
        })
    }

    /// A user plus a live session token for it.
    async fn user(&self, name: &str, role: UserRole) -> TestResult<(User, String)> {
        let authenticator = self.hub.authenticator();
        let user = authenticator.create_user(name, role).await?;
        let session = authenticator.issue_session(user.id).await?;
        Ok((user, session.token))
    }

    /// Register a live connection, as the socket handler would, and drain
    /// its `joined` event.
    async fn live(
        &self,
        token: &str,
    ) -> TestResult<(Arc<Connection>, mpsc::Receiver<ServerEvent>)> {
        let (tx, mut rx) = self.hub.outbound_channel();
        let connection = self.hub.connect(token, tx).await?;
        match rx.try_recv()? {
            ServerEvent::Joined { .. } => {}
            other => anyhow::bail!("expected joined, got {other:?}"),
        }
        Ok((connection, rx))
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResult<(StatusCode, Value)> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let body = match body {
            Some(json_body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json_body)?)
            }
            None => Body::empty(),
        };

        let response = self.router.clone().oneshot(builder.body(body)?).await?;
        let status = response.status();
        let bytes = response.into_body().collect().await?.to_bytes();
        let payload = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)?
        };
        Ok((status, payload))
    }

    async fn open_room(&self, token: &str, partner: &User) -> TestResult<String> {
        let (status, body) = self
            .request(
                Method::POST,
                "/api/rooms",
                Some(token),
                Some(json!({ "partnerId": partner.public_id })),
            )
            .await?;
        anyhow::ensure!(status == StatusCode::OK, "room creation failed: {body}");
        Ok(body["id"].as_str().unwrap_or_default().to_string())
    }
}

mod router_tests {
    use super::*;

    #[tokio::test]
    async fn health_reports_ok() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx.request(Method::GET, "/health", None, None).await?;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["connections"], 0);
        Ok(())
    }

    #[tokio::test]
    async fn openapi_document_lists_rest_paths() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx
            .request(Method::GET, "/api-docs/openapi.json", None, None)
            .await?;

        assert_eq!(status, StatusCode::OK);
        let paths = body["paths"].as_object().expect("paths object");
        for path in [
            "/api/rooms",
            "/api/messages",
            "/api/notifications/{notification_id}/read",
            "/api/admin/notifications",
            "/ws",
        ] {
            assert!(paths.contains_key(path), "missing {path} in OpenAPI document");
        }
        assert!(body["components"]["securitySchemes"]["bearerAuth"].is_object());
        Ok(())
    }

    #[tokio::test]
    async fn cors_preflight_allows_any_origin() -> TestResult {
        let ctx = TestContext::new().await?;
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/rooms")
            .header(ORIGIN, "https://shop.example.com")
            .header(ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .header(ACCESS_CONTROL_REQUEST_HEADERS, "authorization, content-type")
            .body(Body::empty())?;

        let response = ctx.router.clone().oneshot(request).await?;
        assert!(
            matches!(response.status(), StatusCode::OK | StatusCode::NO_CONTENT),
            "unexpected preflight status {}",
            response.status()
        );
        let allow_origin = response
            .headers()
            .get(ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        assert_eq!(allow_origin, "*");
        Ok(())
    }
}

mod auth_tests {
    use super::*;

    #[tokio::test]
    async fn protected_routes_require_a_valid_bearer_token() -> TestResult {
        let ctx = TestContext::new().await?;

        let (status, body) = ctx.request(Method::GET, "/api/rooms", None, None).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication_error");

        let (status, body) = ctx
            .request(Method::GET, "/api/auth/me", Some("not-a-session"), None)
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication_error");
        Ok(())
    }

    #[tokio::test]
    async fn dev_tokens_are_disabled_by_default() -> TestResult {
        let ctx = TestContext::new().await?;
        let (status, body) = ctx
            .request(
                Method::POST,
                "/api/auth/dev/token",
                None,
                Some(json!({ "displayName": "Dev" })),
            )
            .await?;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        Ok(())
    }

    #[tokio::test]
    async fn dev_token_session_works_until_logout() -> TestResult {
        let ctx = TestContext::with_auth(AuthConfig {
            allow_dev_tokens: true,
            ..AuthConfig::default()
        })
        .await?;

        let (status, session) = ctx
            .request(
                Method::POST,
                "/api/auth/dev/token",
                None,
                Some(json!({ "displayName": "Seller Sue", "role": "seller" })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(session["user"]["displayName"], "Seller Sue");
        assert_eq!(session["user"]["role"], "seller");
        let token = session["token"].as_str().expect("token").to_string();

        let (status, me) = ctx
            .request(Method::GET, "/api/auth/me", Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(me["id"], session["user"]["id"]);

        let (status, _) = ctx
            .request(Method::POST, "/api/auth/logout", Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = ctx
            .request(Method::GET, "/api/auth/me", Some(&token), None)
            .await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        Ok(())
    }

    #[tokio::test]
    async fn dev_token_rejects_unknown_roles() -> TestResult {
        let ctx = TestContext::with_auth(AuthConfig {
            allow_dev_tokens: true,
            ..AuthConfig::default()
        })
        .await?;

        let (status, body) = ctx
            .request(
                Method::POST,
                "/api/auth/dev/token",
                None,
                Some(json!({ "displayName": "Eve", "role": "superuser" })),
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        Ok(())
    }
}

mod room_tests {
    use super::*;

    #[tokio::test]
    async fn create_room_is_idempotent_for_either_participant() -> TestResult {
        let ctx = TestContext::new().await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, seller_token) = ctx.user("Seller", UserRole::Seller).await?;

        let first = ctx.open_room(&buyer_token, &seller).await?;
        let second = ctx.open_room(&seller_token, &buyer).await?;
        assert_eq!(first, second);

        let (status, rooms) = ctx
            .request(Method::GET, "/api/rooms", Some(&buyer_token), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        let rooms = rooms.as_array().expect("room list");
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0]["id"], first.as_str());
        assert_eq!(rooms[0]["kind"], "direct");

        let participants = rooms[0]["participants"].as_array().expect("participants");
        assert!(participants.contains(&json!(buyer.public_id)));
        assert!(participants.contains(&json!(seller.public_id)));
        Ok(())
    }

    #[tokio::test]
    async fn create_room_validates_partner_and_kind() -> TestResult {
        let ctx = TestContext::new().await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, _) = ctx.user("Seller", UserRole::Seller).await?;

        let cases = [
            json!({ "partnerId": buyer.public_id }),
            json!({ "partnerId": "no-such-user" }),
            json!({ "partnerId": seller.public_id, "kind": "support" }),
            json!({ "partnerId": seller.public_id, "kind": "group" }),
        ];
        for body in cases {
            let (status, response) = ctx
                .request(Method::POST, "/api/rooms", Some(&buyer_token), Some(body.clone()))
                .await?;
            assert_eq!(status, StatusCode::BAD_REQUEST, "request {body}");
            assert_eq!(response["error"], "validation_error");
        }

        let (status, response) = ctx
            .request(
                Method::POST,
                "/api/rooms",
                Some(&buyer_token),
                Some(json!({ "partner": seller.public_id })),
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "validation_error");
        Ok(())
    }

    #[tokio::test]
    async fn get_room_distinguishes_unknown_and_foreign_rooms() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, seller_token) = ctx.user("Seller", UserRole::Seller).await?;
        let (_, stranger_token) = ctx.user("Stranger", UserRole::Buyer).await?;
        let room_id = ctx.open_room(&buyer_token, &seller).await?;

        let (status, room) = ctx
            .request(Method::GET, &format!("/api/rooms/{room_id}"), Some(&buyer_token), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(room["typingUsers"], json!([]));
        assert_eq!(room["onlineParticipants"], json!([]));

        let (_seller_conn, _seller_rx) = ctx.live(&seller_token).await?;
        let (_, room) = ctx
            .request(Method::GET, &format!("/api/rooms/{room_id}"), Some(&buyer_token), None)
            .await?;
        assert_eq!(room["onlineParticipants"], json!([seller.public_id]));

        let (status, body) = ctx
            .request(
                Method::GET,
                &format!("/api/rooms/{room_id}"),
                Some(&stranger_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "authorization_error");

        let (status, body) = ctx
            .request(Method::GET, "/api/rooms/missing", Some(&buyer_token), None)
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "room_not_found");
        Ok(())
    }
}

mod message_tests {
    use super::*;

    #[tokio::test]
    async fn rest_send_reaches_live_subscribers_and_sender() -> TestResult {
        let ctx = TestContext::new().await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, seller_token) = ctx.user("Seller", UserRole::Seller).await?;
        let room_id = ctx.open_room(&buyer_token, &seller).await?;

        let (seller_conn, mut seller_rx) = ctx.live(&seller_token).await?;
        ctx.hub.rooms().join_room(&seller_conn, &room_id).await?;
        // The sender's own socket has not joined the room but still gets the echo.
        let (_buyer_conn, mut buyer_rx) = ctx.live(&buyer_token).await?;

        let (status, message) = ctx
            .request(
                Method::POST,
                "/api/messages",
                Some(&buyer_token),
                Some(json!({ "roomId": room_id, "content": "  Is this still available?  " })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(message["content"], "Is this still available?");
        assert_eq!(message["senderId"], buyer.public_id.as_str());
        assert_eq!(message["messageType"], "text");

        for rx in [&mut seller_rx, &mut buyer_rx] {
            match rx.try_recv()? {
                ServerEvent::NewMessage { message: payload } => {
                    assert_eq!(Some(payload.id), message["id"].as_i64());
                    assert_eq!(payload.room_id, room_id);
                }
                other => panic!("expected new_message, got {other:?}"),
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn non_members_cannot_send_or_read() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, _) = ctx.user("Seller", UserRole::Seller).await?;
        let (_, stranger_token) = ctx.user("Stranger", UserRole::Buyer).await?;
        let room_id = ctx.open_room(&buyer_token, &seller).await?;

        let (status, body) = ctx
            .request(
                Method::POST,
                "/api/messages",
                Some(&stranger_token),
                Some(json!({ "roomId": room_id, "content": "hello" })),
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "authorization_error");

        let uri = format!("/api/rooms/{room_id}/messages");
        let (status, _) = ctx.request(Method::GET, &uri, Some(&stranger_token), None).await?;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, history) = ctx.request(Method::GET, &uri, Some(&buyer_token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(history, json!([]));
        Ok(())
    }

    #[tokio::test]
    async fn message_validation_errors_are_bad_requests() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, _) = ctx.user("Seller", UserRole::Seller).await?;
        let room_id = ctx.open_room(&buyer_token, &seller).await?;
        let too_long = "x".repeat(RealtimeConfig::default().max_message_length + 1);

        for body in [
            json!({ "roomId": room_id, "content": "   " }),
            json!({ "roomId": room_id, "content": too_long }),
            json!({ "roomId": room_id, "content": "hi", "messageType": "video" }),
        ] {
            let (status, response) = ctx
                .request(Method::POST, "/api/messages", Some(&buyer_token), Some(body))
                .await?;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(response["error"], "validation_error");
        }

        let (status, response) = ctx
            .request(
                Method::POST,
                "/api/messages",
                Some(&buyer_token),
                Some(json!({ "roomId": room_id, "content": "maintenance", "messageType": "system" })),
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(response["error"], "authorization_error");
        Ok(())
    }

    #[tokio::test]
    async fn history_pages_are_oldest_first() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, _) = ctx.user("Seller", UserRole::Seller).await?;
        let room_id = ctx.open_room(&buyer_token, &seller).await?;

        let mut ids = Vec::new();
        for index in 0..4 {
            let (_, message) = ctx
                .request(
                    Method::POST,
                    "/api/messages",
                    Some(&buyer_token),
                    Some(json!({ "roomId": room_id, "content": format!("message {index}") })),
                )
                .await?;
            ids.push(message["id"].as_i64().expect("message id"));
        }

        let (status, latest) = ctx
            .request(
                Method::GET,
                &format!("/api/rooms/{room_id}/messages?limit=2"),
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        let latest: Vec<i64> = latest
            .as_array()
            .expect("page")
            .iter()
            .filter_map(|message| message["id"].as_i64())
            .collect();
        assert_eq!(latest, ids[2..].to_vec());

        let (_, earlier) = ctx
            .request(
                Method::GET,
                &format!("/api/rooms/{room_id}/messages?before={}", ids[2]),
                Some(&buyer_token),
                None,
            )
            .await?;
        let earlier: Vec<i64> = earlier
            .as_array()
            .expect("page")
            .iter()
            .filter_map(|message| message["id"].as_i64())
            .collect();
        assert_eq!(earlier, ids[..2].to_vec());

        let (status, _) = ctx
            .request(
                Method::GET,
                &format!("/api/rooms/{room_id}/messages?limit=lots"),
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }
}

mod notification_tests {
    use super::*;

    #[tokio::test]
    async fn offline_notification_is_listed_and_marked_read() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, admin_token) = ctx.user("Admin", UserRole::Admin).await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;

        let (status, created) = ctx
            .request(
                Method::POST,
                "/api/admin/notifications",
                Some(&admin_token),
                Some(json!({
                    "userId": buyer.public_id,
                    "title": "Order shipped",
                    "content": "Your parcel is on its way",
                })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["isRead"], false);
        let id = created["id"].as_i64().expect("notification id");

        let (_, unread) = ctx
            .request(
                Method::GET,
                "/api/notifications?unreadOnly=true",
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(unread.as_array().map(Vec::len), Some(1));
        assert_eq!(unread[0]["title"], "Order shipped");

        let (_, count) = ctx
            .request(Method::GET, "/api/notifications/unread-count", Some(&buyer_token), None)
            .await?;
        assert_eq!(count["count"], 1);

        let (status, read) = ctx
            .request(
                Method::PUT,
                &format!("/api/notifications/{id}/read"),
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["isRead"], true);
        assert!(read["readAt"].is_string());

        let (_, count) = ctx
            .request(Method::GET, "/api/notifications/unread-count", Some(&buyer_token), None)
            .await?;
        assert_eq!(count["count"], 0);

        let (_, all) = ctx
            .request(Method::GET, "/api/notifications", Some(&buyer_token), None)
            .await?;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
        Ok(())
    }

    #[tokio::test]
    async fn live_recipient_gets_admin_notification() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, admin_token) = ctx.user("Admin", UserRole::Admin).await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (_conn, mut rx) = ctx.live(&buyer_token).await?;

        let (status, _) = ctx
            .request(
                Method::POST,
                "/api/admin/notifications",
                Some(&admin_token),
                Some(json!({ "userId": buyer.public_id, "title": "Hi", "content": "Welcome" })),
            )
            .await?;
        assert_eq!(status, StatusCode::CREATED);

        match rx.try_recv()? {
            ServerEvent::AdminNotification { notification } => {
                assert_eq!(notification.title, "Hi");
                assert!(!notification.is_read);
            }
            other => panic!("expected admin_notification, got {other:?}"),
        }
        Ok(())
    }

    #[tokio::test]
    async fn only_admins_send_and_only_owners_mark_read() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, admin_token) = ctx.user("Admin", UserRole::Admin).await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (_, other_token) = ctx.user("Other", UserRole::Buyer).await?;
        let (_, support_token) = ctx.user("Support", UserRole::Support).await?;

        let payload = json!({ "userId": buyer.public_id, "title": "t", "content": "c" });
        for token in [&buyer_token, &support_token] {
            let (status, body) = ctx
                .request(
                    Method::POST,
                    "/api/admin/notifications",
                    Some(token),
                    Some(payload.clone()),
                )
                .await?;
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(body["error"], "authorization_error");
        }

        let (_, created) = ctx
            .request(
                Method::POST,
                "/api/admin/notifications",
                Some(&admin_token),
                Some(payload),
            )
            .await?;
        let id = created["id"].as_i64().expect("notification id");

        let (status, body) = ctx
            .request(
                Method::PUT,
                &format!("/api/notifications/{id}/read"),
                Some(&other_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "authorization_error");

        let (_, count) = ctx
            .request(Method::GET, "/api/notifications/unread-count", Some(&buyer_token), None)
            .await?;
        assert_eq!(count["count"], 1, "foreign mark-read must not mutate");

        let (status, body) = ctx
            .request(
                Method::PUT,
                "/api/notifications/999999/read",
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "notification_not_found");

        let (status, _) = ctx
            .request(
                Method::PUT,
                "/api/notifications/abc/read",
                Some(&buyer_token),
                None,
            )
            .await?;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        Ok(())
    }

    #[tokio::test]
    async fn read_all_clears_unread_count() -> TestResult {
        let ctx = TestContext::new().await?;
        let (buyer, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        for title in ["one", "two", "three"] {
            ctx.hub
                .notifications()
                .notify(buyer.id, title, "body")
                .await?;
        }

        let (status, body) = ctx
            .request(Method::PUT, "/api/notifications/read-all", Some(&buyer_token), None)
            .await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["updated"], 3);

        let (_, count) = ctx
            .request(Method::GET, "/api/notifications/unread-count", Some(&buyer_token), None)
            .await?;
        assert_eq!(count["count"], 0);
        Ok(())
    }
}

mod presence_tests {
    use super::*;

    #[tokio::test]
    async fn presence_follows_live_connections() -> TestResult {
        let ctx = TestContext::new().await?;
        let (_, buyer_token) = ctx.user("Buyer", UserRole::Buyer).await?;
        let (seller, seller_token) = ctx.user("Seller", UserRole::Seller).await?;
        let uri = format!("/api/users/{}/presence", seller.public_id);

        let (status, body) = ctx.request(Method::GET, &uri, Some(&buyer_token), None).await?;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["online"], false);

        let (connection, _rx) = ctx.live(&seller_token).await?;
        let (_, body) = ctx.request(Method::GET, &uri, Some(&buyer_token), None).await?;
        assert_eq!(body["online"], true);
        assert_eq!(body["userId"], seller.public_id.as_str());

        ctx.hub.disconnect(connection.id()).await;
        let (_, body) = ctx.request(Method::GET, &uri, Some(&buyer_token), None).await?;
        assert_eq!(body["online"], false);

        let (status, body) = ctx
            .request(Method::GET, "/api/users/ghost/presence", Some(&buyer_token), None)
            .await?;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
        Ok(())
    }
}
