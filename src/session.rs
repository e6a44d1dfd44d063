//! Session struct definition
//!
//! Server-side state for one connected client: its handle, its outbound
//! queue, its position in the connection state machine and the token that
//! tears the connection down.

use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::{Handle, SessionId};

/// Per-connection state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created, default handle computed, not yet in the registry
    Connecting,
    /// Probing for a free handle
    Registering,
    /// Registered and processing lines
    Active,
    /// Torn down, or being torn down
    Closing,
}

impl SessionState {
    fn can_become(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Registering)
                | (Self::Registering, Self::Active)
                | (Self::Connecting | Self::Registering | Self::Active, Self::Closing)
        )
    }
}

/// Connected client
///
/// Shared as `Arc<Session>` between the connection task, the live-session
/// table and the registry. The handle is only rewritten by the registry
/// while it holds its write lock.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    handle: RwLock<Handle>,
    state: Mutex<SessionState>,
    /// Server → Client line channel
    sender: mpsc::Sender<ServerMessage>,
    closed: CancellationToken,
}

impl Session {
    /// Create a new session with the given ID, default handle and sender channel
    pub fn new(id: SessionId, handle: Handle, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            handle: RwLock::new(handle),
            state: Mutex::new(SessionState::Connecting),
            sender,
            closed: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Current handle
    pub fn handle(&self) -> Handle {
        self.handle.read().clone()
    }

    pub(crate) fn set_handle(&self, handle: Handle) {
        *self.handle.write() = handle;
    }

    pub fn state(&self) -> SessionState {
        *self.state.lock()
    }

    /// Move to `next` if the state machine allows it
    ///
    /// Returns false, leaving the state untouched, for any other edge.
    /// In particular `Closing -> Closing` is refused, which is what makes
    /// teardown run exactly once.
    pub fn transition(&self, next: SessionState) -> bool {
        let mut state = self.state.lock();
        if state.can_become(next) {
            debug!("Session {} {:?} -> {:?}", self.id, *state, next);
            *state = next;
            true
        } else {
            false
        }
    }

    /// Enter `Closing`, returning the state it was left from
    ///
    /// None if the session was already closing.
    pub fn begin_close(&self) -> Option<SessionState> {
        let mut state = self.state.lock();
        if *state == SessionState::Closing {
            return None;
        }
        debug!("Session {} {:?} -> Closing", self.id, *state);
        Some(std::mem::replace(&mut *state, SessionState::Closing))
    }

    /// Liveness flag: false once closing has started or the transport failed
    pub fn is_alive(&self) -> bool {
        self.state() != SessionState::Closing && !self.closed.is_cancelled()
    }

    /// Queue a line for this client without waiting
    ///
    /// Returns an error if the queue is full or the writer is gone.
    pub fn send(&self, msg: ServerMessage) -> Result<(), SendError> {
        self.sender.try_send(msg).map_err(|e| match e {
            TrySendError::Full(_) => SendError::Backlogged,
            TrySendError::Closed(_) => SendError::ChannelClosed,
        })
    }

    /// Queue a line, marking the session for teardown on failure
    ///
    /// Never fails: the connection task notices the cancellation and runs
    /// the normal closing path.
    pub fn deliver(&self, msg: ServerMessage) {
        if let Err(e) = self.send(msg) {
            if !self.closed.is_cancelled() {
                warn!("Delivery to {} ({}) failed: {}", self.id, self.handle(), e);
            }
            self.closed.cancel();
        }
    }

    /// Token cancelled when the session must stop reading and writing
    pub fn close_token(&self) -> CancellationToken {
        self.closed.clone()
    }

    /// Release the transport: unblocks the pending read and stops the writer
    pub(crate) fn release(&self) {
        self.closed.cancel();
    }
}
