//! Opening the duplex byte stream.
//!
//! A [`Connector`] turns an opaque remote id into a connected stream.
//! The session never looks inside the id; for [`TcpConnector`] it is a
//! `host:port`, typically a serial-to-TCP bridge in front of the vehicle's
//! RFCOMM port (service `00001101-0000-1000-8000-00805F9B34FB`).

use std::io;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Anything that can carry the text protocol in both directions.
pub trait LinkStream: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

impl<T> LinkStream for T where T: AsyncRead + AsyncWrite + Send + Unpin + 'static {}

pub type BoxedStream = Box<dyn LinkStream>;

pub trait Connector: Send + Sync + 'static {
    /// Open a stream to `remote_id`.
    ///
    /// The session applies its own timeout; implementations need not.
    fn connect(&self, remote_id: &str) -> BoxFuture<'static, io::Result<BoxedStream>>;
}

/// Connects over TCP.
#[derive(Debug, Default, Clone)]
pub struct TcpConnector;

impl TcpConnector {
    pub fn new() -> Self {
        TcpConnector
    }
}

impl Connector for TcpConnector {
    fn connect(&self, remote_id: &str) -> BoxFuture<'static, io::Result<BoxedStream>> {
        let addr = remote_id.to_string();
        async move {
            let stream = TcpStream::connect(&addr).await?;
            stream.set_nodelay(true)?;
            debug!("TCP stream open to {}", addr);
            Ok(Box::new(stream) as BoxedStream)
        }
        .boxed()
    }
}
