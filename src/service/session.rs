//! Connection handler: one client session from handshake to close
//!
//! ```text
//! AwaitingModel --model loaded--> Ready --"." or EOF--> Closed
//!       |                           |
//!       +--handshake error----------+--transport error--> Closed
//! ```
//!
//! Per-request decode and classification failures are answered with one
//! error line and leave the session in `Ready`.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::io::{
    AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf,
    WriteHalf,
};
use tracing::{debug, info, warn};

use super::codec::{self, CodecError, DimensionPolicy};
use crate::config::Settings;
use crate::constants::protocol::TERMINATOR;
use crate::models::{Classifier, ModelError, ModelRegistry};

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide unique session identifier, assigned at accept time
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Allocate the next identifier; identifiers are never reused
    pub fn next() -> Self {
        SessionId(NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle state of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingModel,
    Ready,
    Closed,
}

/// How a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Client sent the terminator or closed the stream after the handshake
    Completed { requests: u64 },
    /// Handshake failed; an error line was sent
    Rejected,
    /// The transport failed
    Aborted,
}

/// Read-only settings shared by every session of one server
pub struct SessionContext {
    pub registry: Arc<dyn ModelRegistry>,
    pub service_name: String,
    pub max_line_bytes: usize,
    pub dimensions: DimensionPolicy,
}

impl SessionContext {
    pub fn new(registry: Arc<dyn ModelRegistry>, settings: &Settings) -> Self {
        Self {
            registry,
            service_name: settings.server.service_name.clone(),
            max_line_bytes: settings.protocol.max_line_bytes,
            dimensions: DimensionPolicy::from_strict(settings.protocol.strict_dimensions),
        }
    }
}

/// Failure of a single prediction request; never ends the session
#[derive(Error, Debug)]
pub enum RequestError {
    #[error("decode error: {0}")]
    Decode(#[from] CodecError),

    #[error("classification error: {0}")]
    Classification(#[from] ModelError),
}

/// Failure of the handshake; ends the session
#[derive(Error, Debug)]
pub enum HandshakeError {
    #[error("model file path not specified")]
    MissingPath,

    #[error("{0}")]
    Line(#[from] CodecError),

    #[error(transparent)]
    Load(#[from] ModelError),

    #[error("model loader failed: {0}")]
    Loader(String),
}

enum Line {
    Eof,
    Text(String),
    Invalid(CodecError),
}

/// One accepted connection, owned by its handler task
pub struct Session<S> {
    id: SessionId,
    state: SessionState,
    classifier: Option<Arc<dyn Classifier>>,
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    ctx: Arc<SessionContext>,
    requests: u64,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(id: SessionId, stream: S, ctx: Arc<SessionContext>) -> Self {
        let (reader, writer) = tokio::io::split(stream);
        Self {
            id,
            state: SessionState::AwaitingModel,
            classifier: None,
            reader: BufReader::new(reader),
            writer,
            ctx,
            requests: 0,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Drive the session to completion; the stream is dropped on return
    pub async fn run(mut self) -> SessionOutcome {
        let outcome = match self.serve().await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Error handling client#{}: {}", self.id, e);
                SessionOutcome::Aborted
            }
        };
        self.transition(SessionState::Closed);
        let _ = self.writer.shutdown().await;
        info!("Connection with client#{} closed ({:?})", self.id, outcome);
        outcome
    }

    async fn serve(&mut self) -> std::io::Result<SessionOutcome> {
        match self.handshake().await? {
            Ok(()) => {}
            Err(e) => {
                warn!("Handshake with client#{} failed: {}", self.id, e);
                self.reply(&codec::encode_error(&e.to_string())).await?;
                return Ok(SessionOutcome::Rejected);
            }
        }

        loop {
            match self.read_line().await? {
                Line::Eof => {
                    debug!("client#{} closed the stream", self.id);
                    break;
                }
                Line::Text(text) if text == TERMINATOR => {
                    debug!("client#{} sent the terminator", self.id);
                    break;
                }
                Line::Invalid(e) => {
                    let e = RequestError::from(e);
                    warn!("Request from client#{} rejected: {}", self.id, e);
                    self.reply(&codec::encode_error(&e.to_string())).await?;
                }
                Line::Text(text) => {
                    self.requests += 1;
                    let reply = match self.predict(text).await {
                        Ok(line) => line,
                        Err(e) => {
                            warn!("Request from client#{} failed: {}", self.id, e);
                            codec::encode_error(&e.to_string())
                        }
                    };
                    self.reply(&reply).await?;
                }
            }
        }
        Ok(SessionOutcome::Completed {
            requests: self.requests,
        })
    }

    /// Read the model path and load it. The outer result is transport failure.
    async fn handshake(&mut self) -> std::io::Result<Result<(), HandshakeError>> {
        let path = match self.read_line().await? {
            Line::Eof => return Ok(Err(HandshakeError::MissingPath)),
            Line::Invalid(e) => return Ok(Err(e.into())),
            Line::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() || trimmed == TERMINATOR {
                    return Ok(Err(HandshakeError::MissingPath));
                }
                PathBuf::from(trimmed)
            }
        };

        info!("client#{} requested model {:?}", self.id, path);
        let registry = Arc::clone(&self.ctx.registry);
        let loaded = tokio::task::spawn_blocking(move || registry.load(&path)).await;
        let classifier = match loaded {
            Ok(Ok(classifier)) => classifier,
            Ok(Err(e)) => return Ok(Err(e.into())),
            Err(e) => return Ok(Err(HandshakeError::Loader(e.to_string()))),
        };

        self.classifier = Some(classifier);
        let welcome = format!(
            "Connected to {} as client#{}.",
            self.ctx.service_name, self.id
        );
        self.reply(&welcome).await?;
        self.transition(SessionState::Ready);
        Ok(Ok(()))
    }

    async fn predict(&self, line: String) -> Result<String, RequestError> {
        let classifier = match &self.classifier {
            Some(classifier) => Arc::clone(classifier),
            None => return Err(ModelError::classification("no model loaded").into()),
        };
        let features = codec::decode_request(&line, classifier.num_attributes(), self.ctx.dimensions)?;
        let prediction = tokio::task::spawn_blocking(move || classifier.predict(&features))
            .await
            .map_err(|e| ModelError::classification(format!("classifier task failed: {}", e)))??;
        codec::encode_reply(&prediction).map_err(|e| ModelError::classification(e.to_string()).into())
    }

    /// Read one `\n`-terminated line, bounded by `max_line_bytes`
    async fn read_line(&mut self) -> std::io::Result<Line> {
        let limit = self.ctx.max_line_bytes;
        let mut buf = Vec::new();
        let read = (&mut self.reader)
            .take(limit as u64 + 1)
            .read_until(b'\n', &mut buf)
            .await?;
        if read == 0 {
            return Ok(Line::Eof);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
            if buf.last() == Some(&b'\r') {
                buf.pop();
            }
        } else if buf.len() > limit {
            self.discard_line().await?;
            return Ok(Line::Invalid(CodecError::LineTooLong { limit }));
        }
        Ok(match String::from_utf8(buf) {
            Ok(text) => Line::Text(text),
            Err(_) => Line::Invalid(CodecError::InvalidUtf8),
        })
    }

    /// Skip the remainder of an overlong line without buffering it
    async fn discard_line(&mut self) -> std::io::Result<()> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            if let Some(pos) = available.iter().position(|b| *b == b'\n') {
                self.reader.consume(pos + 1);
                return Ok(());
            }
            let len = available.len();
            self.reader.consume(len);
        }
    }

    /// Write one complete reply line and flush it
    async fn reply(&mut self, line: &str) -> std::io::Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.writer.write_all(&bytes).await?;
        self.writer.flush().await
    }

    fn transition(&mut self, next: SessionState) {
        debug!("client#{}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}
