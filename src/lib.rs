//! Multi-user line-based chat relay
//!
//! Clients connect over TCP, get a unique handle and exchange broadcast and
//! private messages through the server, one UTF-8 line at a time.
//!
//! # Features
//! - Unique handles with a default derived from the remote port
//! - `/nick`, `/w`, `/list`, `/quit`
//! - Join, leave and rename announcements
//! - Graceful shutdown of every session
//!
//! # Architecture
//! One task per connection, all sharing a `ChatServer`:
//! - `Registry` is the handle → session map, behind a short-lived lock
//! - `Router` snapshots the registry and writes outside the lock
//! - Each `Session` has a bounded outbound queue drained by its own write task
//! - A slow or broken client is torn down without holding anyone else up
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use chat_relay::{ChatServer, Config};
//!
//! #[tokio::main]
//! async fn main() {
//!     let listener = TcpListener::bind("127.0.0.1:12345").await.unwrap();
//!     let server = Arc::new(ChatServer::new(Config::default()));
//!     server.serve(listener).await.unwrap();
//! }
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod handler;
pub mod interpreter;
pub mod lifecycle;
pub mod message;
pub mod registry;
pub mod router;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use command::Command;
pub use config::Config;
pub use error::{AppError, CommandError, ConfigError, ErrorCode, SendError};
pub use handler::handle_connection;
pub use interpreter::Flow;
pub use message::ServerMessage;
pub use registry::Registry;
pub use router::Router;
pub use server::ChatServer;
pub use session::{Session, SessionState};
pub use types::{Handle, SessionId};
