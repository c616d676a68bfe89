//! TCP listener serving one client at a time.
//!
//! The instrument has a single set of camera and stage state, so sessions
//! are strictly sequential: the next connection is accepted only after the
//! current session has ended. Pending connections wait in the listen
//! backlog.

use crate::dispatcher::Dispatcher;
use crate::session::{run_session, SessionOutcome};
use std::future::Future;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{error, info, warn};

/// Bound listener plus the dispatcher shared by every session.
pub struct DhmServer {
    listener: TcpListener,
    dispatcher: Dispatcher,
}

impl DhmServer {
    /// Bind the listening socket.
    pub async fn bind<A: ToSocketAddrs>(addr: A, dispatcher: Dispatcher) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        info!("DHM server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            dispatcher,
        })
    }

    /// Address actually bound, useful after binding port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `shutdown` resolves.
    ///
    /// Shutdown is checked between accepts and also interrupts a running
    /// session; the client then just sees the connection close.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        loop {
            let (socket, peer) = tokio::select! {
                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        error!("Accept error: {}", e);
                        continue;
                    }
                },
            };

            if let Err(e) = socket.set_nodelay(true) {
                warn!("Could not disable Nagle for {}: {}", peer, e);
            }
            info!("Client connected: {}", peer);

            let peer_label = peer.to_string();
            let outcome = tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown during session with {}", peer);
                    break;
                }
                outcome = run_session(socket, &peer_label, &self.dispatcher) => outcome,
            };

            match &outcome {
                SessionOutcome::Failed(e) => {
                    warn!("Client {} session error [{}]: {}", peer, e.code(), e)
                }
                SessionOutcome::Quit | SessionOutcome::Disconnected => {
                    info!("Client {} session closed ({})", peer, outcome)
                }
            }
        }

        info!("DHM server stopped");
        Ok(())
    }

    /// Serve forever.
    pub async fn run(self) -> io::Result<()> {
        self.run_until(std::future::pending()).await
    }
}

impl std::fmt::Debug for DhmServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DhmServer")
            .field("local_addr", &self.listener.local_addr().ok())
            .field("dispatcher", &self.dispatcher)
            .finish()
    }
}
