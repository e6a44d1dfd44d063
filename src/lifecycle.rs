//! Session lifecycle: connect, close, shutdown
//!
//! `close_session` is the single teardown path. Quit, transport failure,
//! a delivery failure and server shutdown all end up here, and only the
//! first caller for a given session does any work.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::info;

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::server::ChatServer;
use crate::session::{Session, SessionState};
use crate::types::{Handle, SessionId};

impl ChatServer {
    /// Admit a new connection
    ///
    /// Registers the session under its default handle (probing `base`,
    /// `base_1`, `base_2`, ... until one is free), greets it and announces
    /// the join to everyone.
    pub fn on_connect(
        &self,
        peer_port: u16,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Arc<Session>, AppError> {
        let session = self.admit(peer_port, sender)?;
        self.activate(&session)?;
        Ok(session)
    }

    /// `Connecting -> Registering`: take a slot in the live-session table
    fn admit(
        &self,
        peer_port: u16,
        sender: mpsc::Sender<ServerMessage>,
    ) -> Result<Arc<Session>, AppError> {
        let base = Handle::derived(&self.config.session.default_handle_prefix, peer_port);
        let session = Arc::new(Session::new(SessionId::new(), base, sender));

        {
            let mut live = self.live.lock();
            if !live.accepting {
                return Err(AppError::ShuttingDown);
            }
            live.sessions.insert(session.id(), Arc::clone(&session));
        }

        session.transition(SessionState::Registering);
        Ok(session)
    }

    /// `Registering -> Active`: probe for a handle, greet, announce
    fn activate(&self, session: &Arc<Session>) -> Result<Handle, AppError> {
        let base = session.handle();
        let handle = self.register_default(&base, session);

        // A shutdown may have closed the session while it was probing
        if !session.transition(SessionState::Active) {
            self.registry.unregister_session(session);
            return Err(AppError::ShuttingDown);
        }

        info!("Session {} connected as {}", session.id(), handle);
        let welcome = format!("Welcome! Your nick is: {handle}");
        session.deliver(ServerMessage::notice(welcome));
        self.router.system_announce(&format!("{handle} has joined."));
        Ok(handle)
    }

    /// Transport reported end-of-stream or an error
    pub fn on_disconnect(&self, session: &Arc<Session>) {
        self.close_session(session);
    }

    /// Tear a session down exactly once
    ///
    /// Removes it from the registry, announces the leave if its join was
    /// announced and releases its transport. Later calls are no-ops.
    pub fn close_session(&self, session: &Arc<Session>) {
        let Some(previous) = session.begin_close() else {
            return;
        };

        self.live.lock().sessions.remove(&session.id());
        if let Some(handle) = self.registry.unregister_session(session) {
            info!("Session {} ({}) disconnected", session.id(), handle);
            if previous == SessionState::Active {
                self.router.system_announce(&format!("{handle} has left."));
            }
        }
        session.release();
    }

    /// Stop accepting, close every live session, then release the listener
    ///
    /// Safe to call more than once.
    pub fn shutdown_all(&self) {
        let sessions: Vec<Arc<Session>> = {
            let mut live = self.live.lock();
            if !live.accepting {
                return;
            }
            live.accepting = false;
            live.sessions.values().cloned().collect()
        };

        info!("ChatServer shutting down ({} sessions)", sessions.len());
        self.router.system_announce("Server is shutting down.");
        for session in &sessions {
            self.close_session(session);
        }
        self.shutdown.cancel();
    }

    fn register_default(&self, base: &Handle, session: &Arc<Session>) -> Handle {
        let mut candidate = base.clone();
        let mut suffix = 1;
        while !self.registry.register(&candidate, session) {
            candidate = base.with_suffix(suffix);
            suffix += 1;
        }
        candidate
    }
}
