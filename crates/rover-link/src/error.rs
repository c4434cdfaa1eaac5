use rover_core::ModelError;
use rover_protocol::DecodeError;
use thiserror::Error;

/// Failures of the link itself.
///
/// None of these is fatal: the session is always left in a state from
/// which `connect` can be tried again.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("device unreachable: {0}")]
    DeviceUnreachable(String),

    #[error("connect cancelled")]
    Cancelled,

    #[error("already connected or connecting")]
    AlreadyConnected,

    #[error("not connected")]
    NotConnected,

    #[error("stream closed: {0}")]
    StreamClosed(String),
}

/// Why the dispatcher dropped an inbound message or a local edit.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("could not decode {text:?}: {source}")]
    Decode {
        text: String,
        #[source]
        source: DecodeError,
    },

    #[error("rejected by the grid model: {0}")]
    Model(#[from] ModelError),
}
