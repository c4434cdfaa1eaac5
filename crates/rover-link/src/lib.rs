//! rover-link
//!
//! Async link to the vehicle and the dispatch loop in front of the grid
//! model.
//!
//! - [`session`]    : `LinkSession`, the duplex stream and its read loop
//! - [`connector`]  : how a remote id becomes a stream
//! - [`dispatcher`] : decode → model → notifications, and outbound commands

pub mod config;
pub mod connector;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod types;

pub use config::{DriveConfig, LinkConfig};
pub use connector::{BoxedStream, Connector, LinkStream, TcpConnector};
pub use dispatcher::Dispatcher;
pub use error::{DispatchError, LinkError};
pub use session::LinkSession;
pub use types::{ConnectionState, LinkEvent, Notification, NotificationRx};
