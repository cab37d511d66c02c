//! Shared application state for the gateway

use std::sync::Arc;

use storefront_chats::ChatHub;
use storefront_config::AuthConfig;

/// Everything a handler needs. REST and WebSocket handlers share one
/// [`ChatHub`], so both transports hit the same services.
#[derive(Clone)]
pub struct GatewayState {
    hub: Arc<ChatHub>,
    allow_dev_tokens: bool,
}

impl GatewayState {
    pub fn new(hub: Arc<ChatHub>, auth: &AuthConfig) -> Self {
        Self {
            hub,
            allow_dev_tokens: auth.allow_dev_tokens,
        }
    }

    pub fn hub(&self) -> &Arc<ChatHub> {
        &self.hub
    }

    pub fn allow_dev_tokens(&self) -> bool {
        self.allow_dev_tokens
    }
}
