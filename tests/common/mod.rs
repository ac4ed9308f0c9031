//! Common test utilities for the prediction server

#![allow(dead_code)]

use predictd_core::models::{
    DecisionTree, GaussianNaiveBayes, LogisticRegression, ModelDocument, ModelKind, TreeNode,
};
use predictd_core::{PredictionServer, Settings};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Logistic model separating the iris species on petal length alone
pub fn iris_document() -> ModelDocument {
    ModelDocument {
        attributes: vec![
            "sepallength".into(),
            "sepalwidth".into(),
            "petallength".into(),
            "petalwidth".into(),
        ],
        labels: vec!["setosa".into(), "versicolor".into(), "virginica".into()],
        model: ModelKind::Logistic(LogisticRegression::new(
            vec![
                vec![0.0, 0.0, -4.0, 0.0],
                vec![0.0, 0.0, 0.0, 0.0],
                vec![0.0, 0.0, 4.0, 0.0],
            ],
            vec![10.0, 0.0, -20.0],
        )),
    }
}

/// Tree answering `yes` at or below 20 degrees, `no` above
pub fn weather_document() -> ModelDocument {
    ModelDocument {
        attributes: vec!["temperature".into(), "humidity".into()],
        labels: vec!["yes".into(), "no".into()],
        model: ModelKind::Tree(DecisionTree::new(vec![
            TreeNode::Split {
                attribute: 0,
                threshold: 20.0,
                left: 1,
                right: 2,
            },
            TreeNode::Leaf {
                counts: vec![9.0, 1.0],
            },
            TreeNode::Leaf {
                counts: vec![1.0, 3.0],
            },
        ])),
    }
}

/// Naive Bayes model over one attribute with well separated classes
pub fn signal_document() -> ModelDocument {
    ModelDocument {
        attributes: vec!["amplitude".into()],
        labels: vec!["noise".into(), "signal".into()],
        model: ModelKind::NaiveBayes(GaussianNaiveBayes::new(
            vec![0.5, 0.5],
            vec![vec![0.0], vec![10.0]],
            vec![vec![1.0], vec![1.0]],
        )),
    }
}

/// Write a document under `dir`; the extension picks the encoding
pub fn write_model(dir: &Path, name: &str, document: &ModelDocument) -> PathBuf {
    let path = dir.join(name);
    document.write_to(&path).unwrap();
    path
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub handle: JoinHandle<predictd_core::Result<()>>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    /// Stop accepting and wait for the accept loop to return
    pub async fn stop(mut self) -> predictd_core::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.unwrap()
    }
}

/// Test settings bound to an ephemeral loopback port
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.server.host = "127.0.0.1".into();
    settings.server.port = 0;
    settings
}

pub async fn start_server(settings: Settings) -> TestServer {
    let listener = PredictionServer::bind(&settings).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = PredictionServer::new(Arc::new(settings.models.registry()), &settings);
    let (tx, rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        server
            .serve_with_shutdown(listener, async {
                let _ = rx.await;
            })
            .await
    });

    TestServer {
        addr,
        handle,
        shutdown: Some(tx),
    }
}

/// Line-oriented protocol client
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (read, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read).lines(),
            writer,
        }
    }

    /// Connect and complete the handshake, returning the welcome line
    pub async fn open(addr: SocketAddr, model: &Path) -> (Self, String) {
        let mut client = Self::connect(addr).await;
        client.send(&model.display().to_string()).await;
        let welcome = client.recv().await.expect("server closed during handshake");
        (client, welcome)
    }

    pub async fn send(&mut self, line: &str) {
        self.send_raw(format!("{}\n", line).as_bytes()).await;
    }

    pub async fn send_raw(&mut self, bytes: &[u8]) {
        self.writer.write_all(bytes).await.unwrap();
    }

    /// Next line from the server, `None` once it has closed the connection
    pub async fn recv(&mut self) -> Option<String> {
        tokio::time::timeout(READ_TIMEOUT, self.lines.next_line())
            .await
            .expect("timed out waiting for the server")
            .unwrap()
    }

    /// Half-close the client side
    pub async fn finish(&mut self) {
        self.writer.shutdown().await.unwrap();
    }
}

/// Client number announced in a welcome line
pub fn client_number(welcome: &str) -> u64 {
    welcome
        .rsplit_once("client#")
        .and_then(|(_, rest)| rest.strip_suffix('.'))
        .and_then(|n| n.parse().ok())
        .unwrap_or_else(|| panic!("not a welcome line: {:?}", welcome))
}
