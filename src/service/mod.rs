//! Prediction socket service
//!
//! [`PredictionServer`] accepts TCP connections and hands each one to its
//! own [`Session`] task. Sessions share nothing but the read-only
//! [`SessionContext`]; a slow or hung client never delays the accept loop.

pub mod codec;
pub mod session;

pub use session::{Session, SessionContext, SessionId, SessionOutcome, SessionState};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use crate::config::Settings;
use crate::error::{Error, Result};
use crate::models::ModelRegistry;

/// Listener/dispatcher for prediction sessions
#[derive(Clone)]
pub struct PredictionServer {
    ctx: Arc<SessionContext>,
}

impl PredictionServer {
    pub fn new(registry: Arc<dyn ModelRegistry>, settings: &Settings) -> Self {
        Self {
            ctx: Arc::new(SessionContext::new(registry, settings)),
        }
    }

    /// Bind the configured listen address
    pub async fn bind(settings: &Settings) -> Result<TcpListener> {
        let addr = settings.server.listen_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| Error::Bind { addr, source })
    }

    /// Accept connections until accepting fails
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        self.serve_with_shutdown(listener, std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves or accepting fails.
    ///
    /// Sessions already running are left to finish on their own.
    pub async fn serve_with_shutdown<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local = listener.local_addr()?;
        info!("Prediction server listening on {}", local);
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested, no longer accepting connections on {}", local);
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, peer) = accepted.map_err(Error::Accept)?;
                    self.dispatch(stream, peer);
                }
            }
        }
    }

    /// Start a session task for an accepted connection without waiting on it
    pub fn dispatch(&self, stream: TcpStream, peer: SocketAddr) -> JoinHandle<SessionOutcome> {
        let id = SessionId::next();
        info!("New connection with client#{} at {}", id, peer);
        if let Err(e) = stream.set_nodelay(true) {
            warn!("Could not disable Nagle for client#{}: {}", id, e);
        }
        let span = info_span!("session", client = id.get(), %peer);
        let session = Session::new(id, stream, Arc::clone(&self.ctx));
        tokio::spawn(session.run().instrument(span))
    }
}
