//! Command interpreter
//!
//! Turns one inbound line for an active session into registry or router
//! calls. Errors go back to the sender only.

use std::sync::Arc;

use tracing::debug;

use crate::command::Command;
use crate::error::CommandError;
use crate::message::ServerMessage;
use crate::server::ChatServer;
use crate::session::{Session, SessionState};
use crate::types::Handle;

/// What the connection task should do after a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading
    Continue,
    /// The session is closed; stop reading
    Close,
}

impl ChatServer {
    /// Process one decoded line from `session`
    ///
    /// Lines from a session that is not active are dropped.
    pub fn on_line(&self, session: &Arc<Session>, line: &str) -> Flow {
        match session.state() {
            SessionState::Active => {}
            SessionState::Closing => return Flow::Close,
            _ => return Flow::Continue,
        }

        let result = Command::parse(line).and_then(|cmd| match cmd {
            Some(cmd) => self.dispatch(session, cmd),
            None => Ok(Flow::Continue),
        });

        match result {
            Ok(flow) => flow,
            Err(e) => {
                debug!("Command from {} rejected ({:?}): {}", session.id(), e.code(), e);
                session.deliver(e.into());
                Flow::Continue
            }
        }
    }

    fn dispatch(&self, session: &Arc<Session>, cmd: Command) -> Result<Flow, CommandError> {
        match cmd {
            Command::Chat(text) => {
                self.router.broadcast(session.handle().as_str(), &text);
            }
            Command::Rename(raw) => self.handle_rename(session, &raw)?,
            Command::DirectMessage { target, text } => {
                self.handle_direct_message(session, target, text)?
            }
            Command::ListUsers => {
                let users: Vec<String> = self
                    .registry
                    .list()
                    .into_iter()
                    .map(|h| h.to_string())
                    .collect();
                let listing = format!("Users: {}", users.join(", "));
                session.deliver(ServerMessage::notice(listing));
            }
            Command::Quit => {
                session.deliver(ServerMessage::notice("Goodbye!"));
                self.close_session(session);
                return Ok(Flow::Close);
            }
            Command::Unknown(verb) => return Err(CommandError::UnknownCommand(verb)),
        }
        Ok(Flow::Continue)
    }

    /// Checks run in a fixed order: pattern, same-as-current, uniqueness
    fn handle_rename(&self, session: &Arc<Session>, raw: &str) -> Result<(), CommandError> {
        let new = Handle::parse(raw)?;
        let old = session.handle();
        if new == old {
            return Err(CommandError::SameHandle);
        }
        if !self.registry.rename(&old, &new, session) {
            // Closed while the command was in flight; nothing to report
            if !session.is_alive() {
                return Ok(());
            }
            return Err(CommandError::HandleTaken(new.to_string()));
        }

        debug!("Session {} renamed {} -> {}", session.id(), old, new);
        self.router.system_announce(&format!("{old} is now {new}"));
        session.deliver(ServerMessage::notice(format!("Nick changed to {new}")));
        Ok(())
    }

    fn handle_direct_message(
        &self,
        session: &Arc<Session>,
        target: String,
        text: String,
    ) -> Result<(), CommandError> {
        let from = session.handle();
        if !self.router.direct_message(from.as_str(), &target, &text) {
            return Err(CommandError::UserNotFound(target));
        }
        session.deliver(ServerMessage::PrivateTo { to: target, text });
        Ok(())
    }
}
