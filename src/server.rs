//! ChatServer state and accept loop
//!
//! The process-wide state lives here: the registry, the router, the table of
//! live sessions and the accepting flag. Line handling is in
//! [`interpreter`](crate::interpreter), connect/close/shutdown in
//! [`lifecycle`](crate::lifecycle).

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::AppError;
use crate::handler::handle_connection;
use crate::registry::Registry;
use crate::router::Router;
use crate::session::Session;
use crate::types::SessionId;

/// Sessions owned by the server for their whole connection lifetime
///
/// Includes sessions that have not registered a handle yet. The accepting
/// flag lives under the same lock so a connect cannot slip past a shutdown.
#[derive(Debug)]
pub(crate) struct LiveSessions {
    pub(crate) accepting: bool,
    pub(crate) sessions: HashMap<SessionId, Arc<Session>>,
}

/// The chat relay
pub struct ChatServer {
    pub(crate) config: Config,
    pub(crate) registry: Arc<Registry>,
    pub(crate) router: Router,
    pub(crate) live: Mutex<LiveSessions>,
    /// Cancelled once shutdown has closed every session
    pub(crate) shutdown: CancellationToken,
}

impl ChatServer {
    /// Create a new ChatServer with the given configuration
    pub fn new(config: Config) -> Self {
        let registry = Arc::new(Registry::new());
        Self {
            router: Router::new(Arc::clone(&registry)),
            registry,
            config,
            live: Mutex::new(LiveSessions {
                accepting: true,
                sessions: HashMap::new(),
            }),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Whether new sessions are still admitted
    pub fn is_accepting(&self) -> bool {
        self.live.lock().accepting
    }

    /// Number of connected sessions, registered or not
    pub fn session_count(&self) -> usize {
        self.live.lock().sessions.len()
    }

    /// Token cancelled when the server has shut down
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Configured `max_clients`, clamped to what a semaphore can hold
    pub fn client_limit(&self) -> usize {
        self.config
            .server
            .max_clients
            .clamp(1, Semaphore::MAX_PERMITS)
    }

    /// Accept connections until shutdown
    ///
    /// Each connection gets its own task once a client slot is free. An accept
    /// failure shuts every session down and is returned to the caller.
    pub async fn serve(self: Arc<Self>, listener: TcpListener) -> Result<(), AppError> {
        let limit = self.client_limit();
        let limiter = Arc::new(Semaphore::new(limit));
        info!(
            "ChatServer listening on {} (max clients={})",
            listener.local_addr()?,
            limit
        );

        loop {
            let accepted = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };

            match accepted {
                Ok((stream, addr)) => {
                    debug!("New TCP connection from {}", addr);
                    let server = Arc::clone(&self);
                    let limiter = Arc::clone(&limiter);

                    // Spawn handler task for each connection
                    tokio::spawn(async move {
                        let _permit = tokio::select! {
                            permit = limiter.acquire_owned() => match permit {
                                Ok(permit) => permit,
                                Err(_) => return,
                            },
                            _ = server.shutdown.cancelled() => return,
                        };
                        if let Err(e) = handle_connection(stream, addr.port(), server).await {
                            debug!("Connection handler for {} ended: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                    self.shutdown_all();
                    return Err(e.into());
                }
            }
        }

        info!("ChatServer stopped accepting");
        Ok(())
    }
}
