// crates/rover-link/tests/common/mod.rs
#![allow(dead_code)]

use std::collections::HashMap;
use std::io;
use std::sync::Mutex;
use std::time::Duration;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use rover_link::{BoxedStream, Connector};
use tokio::io::{duplex, AsyncReadExt, DuplexStream};

/// Remote id whose connect never completes.
pub const HANGING_REMOTE: &str = "hang";

pub const WAIT: Duration = Duration::from_secs(2);

/// Hands out in-memory streams registered with [`TestConnector::offer`].
#[derive(Default)]
pub struct TestConnector {
    streams: Mutex<HashMap<String, DuplexStream>>,
}

impl TestConnector {
    /// Make `remote_id` reachable once; returns the vehicle's end.
    pub fn offer(&self, remote_id: &str) -> DuplexStream {
        let (ours, theirs) = duplex(4096);
        self.streams
            .lock()
            .unwrap()
            .insert(remote_id.to_string(), theirs);
        ours
    }
}

impl Connector for TestConnector {
    fn connect(&self, remote_id: &str) -> BoxFuture<'static, io::Result<BoxedStream>> {
        if remote_id == HANGING_REMOTE {
            return future::pending().boxed();
        }

        let stream = self.streams.lock().unwrap().remove(remote_id);
        let result = match stream {
            Some(stream) => Ok(Box::new(stream) as BoxedStream),
            None => Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "no such device",
            )),
        };
        future::ready(result).boxed()
    }
}

/// Read exactly `expected.len()` bytes from the vehicle's end and compare.
pub async fn expect_text(peer: &mut DuplexStream, expected: &str) {
    let mut buf = vec![0u8; expected.len()];
    tokio::time::timeout(WAIT, peer.read_exact(&mut buf))
        .await
        .expect("timed out waiting for bytes")
        .expect("peer read failed");
    assert_eq!(String::from_utf8_lossy(&buf), expected);
}
