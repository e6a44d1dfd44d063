//! Message routing over the registry
//!
//! Targets are snapshotted under the registry lock and written outside it.
//! Each delivery is independent: a failing session is marked for teardown
//! and the fan-out carries on.

use std::sync::Arc;

use tracing::info;

use crate::message::ServerMessage;
use crate::registry::Registry;

/// Tracing target for every line fanned out to all users
pub const CHAT_LOG_TARGET: &str = "chat_relay::chat";

/// Broadcast and directed delivery
#[derive(Debug, Clone)]
pub struct Router {
    registry: Arc<Registry>,
}

impl Router {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Send `[from]: text` to every registered session
    pub fn broadcast(&self, from: &str, text: &str) {
        self.fan_out(ServerMessage::Chat {
            from: from.to_string(),
            text: text.to_string(),
        });
    }

    /// Send `[SERVER]: text` to every registered session
    pub fn system_announce(&self, text: &str) {
        self.fan_out(ServerMessage::System(text.to_string()));
    }

    /// Send `[PM from from]: text` to `to`
    ///
    /// Returns false, delivering nothing, if `to` is not registered right now.
    pub fn direct_message(&self, from: &str, to: &str, text: &str) -> bool {
        let Some(target) = self.registry.lookup(to) else {
            return false;
        };
        target.deliver(ServerMessage::PrivateFrom {
            from: from.to_string(),
            text: text.to_string(),
        });
        true
    }

    fn fan_out(&self, msg: ServerMessage) {
        let targets = self.registry.snapshot();
        info!(target: CHAT_LOG_TARGET, "{}", msg);
        for session in targets {
            session.deliver(msg.clone());
        }
    }
}
