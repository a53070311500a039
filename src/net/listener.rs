//! Bound TCP listeners with per-instance concurrency caps.
//!
//! # Responsibilities
//! - Bind each configured address independently
//! - Acquire a client permit before accepting, so excess connections
//!   queue in the OS accept backlog instead of inside the daemon

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Error type for listener operations.
#[derive(Debug)]
pub enum ListenerError {
    /// Failed to bind to address.
    Bind(std::io::Error),
    /// Failed to accept connection.
    Accept(std::io::Error),
}

impl std::fmt::Display for ListenerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ListenerError::Bind(e) => write!(f, "failed to bind: {}", e),
            ListenerError::Accept(e) => write!(f, "failed to accept: {}", e),
        }
    }
}

impl std::error::Error for ListenerError {}

/// A listener for one bind entry of a tarpit instance.
///
/// All listeners of the same instance share one semaphore, so
/// `max_clients` bounds the instance's total concurrent connections
/// across every port it is bound to.
pub struct BoundListener {
    inner: TcpListener,
    client_limit: Arc<Semaphore>,
    local_addr: SocketAddr,
}

impl BoundListener {
    /// Bind `addr` ("host:port"), attaching the instance's shared permit pool.
    pub async fn bind(addr: &str, client_limit: Arc<Semaphore>) -> Result<Self, ListenerError> {
        let listener = TcpListener::bind(addr).await.map_err(ListenerError::Bind)?;
        let local_addr = listener.local_addr().map_err(ListenerError::Bind)?;
        Ok(Self {
            inner: listener,
            client_limit,
            local_addr,
        })
    }

    /// Accept one connection, holding a client permit for its lifetime.
    ///
    /// Waits for a permit first: while the instance is saturated, nothing
    /// is accepted here and the kernel's backlog does the queueing.
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr, ConnectionPermit), ListenerError> {
        let permit = self
            .client_limit
            .clone()
            .acquire_owned()
            .await
            .expect("client-limit semaphore closed unexpectedly");

        let (stream, peer) = self.inner.accept().await.map_err(ListenerError::Accept)?;

        tracing::debug!(
            peer = %peer,
            local = %self.local_addr,
            available_permits = self.client_limit.available_permits(),
            "connection accepted"
        );

        Ok((stream, peer, ConnectionPermit { _permit: permit }))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn available_permits(&self) -> usize {
        self.client_limit.available_permits()
    }
}

/// A held slot in the instance's client budget.
///
/// Dropping it releases the slot, even if the connection task panics.
#[derive(Debug)]
pub struct ConnectionPermit {
    _permit: tokio::sync::OwnedSemaphorePermit,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn permits_bound_concurrent_accepts() {
        let limit = Arc::new(Semaphore::new(1));
        let listener = BoundListener::bind("127.0.0.1:0", limit).await.unwrap();
        let addr = listener.local_addr();

        let _c1 = TcpStream::connect(addr).await.unwrap();
        let _c2 = TcpStream::connect(addr).await.unwrap();

        let (mut s1, _, permit1) = listener.accept().await.unwrap();
        assert_eq!(listener.available_permits(), 0);

        // Second accept starves until the first permit is released.
        let second = tokio::time::timeout(std::time::Duration::from_millis(200), listener.accept());
        assert!(second.await.is_err());

        let _ = s1.shutdown().await;
        drop(permit1);
        let (_s2, _, _permit2) = listener.accept().await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let limit = Arc::new(Semaphore::new(4));
        let first = BoundListener::bind("127.0.0.1:0", Arc::clone(&limit))
            .await
            .unwrap();
        let occupied = first.local_addr().to_string();
        let err = BoundListener::bind(&occupied, limit).await;
        assert!(matches!(err, Err(ListenerError::Bind(_))));
    }
}
