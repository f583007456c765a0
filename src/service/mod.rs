//! NDJSON snapshot service
//!
//! A local TCP listener that answers newline-delimited JSON requests from the
//! latest published snapshot. Every request line gets exactly one response
//! line. Connections are independent: a reader that disconnects mid-response
//! affects only itself, and nothing here ever blocks the producer.
//!
//! ```text
//! -> {"id":1,"command":"snapshot"}
//! <- {"id":1,"result":{"seq":42,...}}
//! -> {"id":2,"command":"snapshot"}      (before the first publish)
//! <- {"id":2,"error":{"code":"not_available","message":"..."}}
//! ```

pub mod client;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::net::SocketAddr;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

use crate::PROTOCOL_VERSION;
use crate::runtime::RuntimeConfig;
use crate::runtime::error::{ServiceError, ServiceResult};
use crate::runtime::publisher::SnapshotPublisher;

/// Listener bind configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// TCP port; 0 picks a free port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::from(&RuntimeConfig::default())
    }
}

impl From<&RuntimeConfig> for ServerConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            host: config.bind_address.clone(),
            port: config.port,
        }
    }
}

impl ServerConfig {
    fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A running snapshot listener
#[derive(Debug)]
pub struct SnapshotServer {
    local_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl SnapshotServer {
    /// Bind the listener and start accepting connections
    ///
    /// Must be called from within a tokio runtime.
    pub async fn start(config: &ServerConfig, publisher: SnapshotPublisher) -> ServiceResult<Self> {
        let addr = config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServiceError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "snapshot service listening");

        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(accept_loop(listener, publisher, shutdown_rx));

        Ok(Self {
            local_addr,
            shutdown: Some(shutdown),
            task,
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, drop open connections, and release the socket
    pub async fn stop(mut self) -> ServiceResult<()> {
        if let Some(shutdown) = self.shutdown.take() {
            // The accept loop also exits when the sender is dropped
            let _ = shutdown.send(());
        }
        self.task
            .await
            .map_err(|err| ServiceError::Join(err.to_string()))?;
        info!(local_addr = %self.local_addr, "snapshot service stopped");
        Ok(())
    }
}

async fn accept_loop(
    listener: TcpListener,
    publisher: SnapshotPublisher,
    mut shutdown: oneshot::Receiver<()>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "connection accepted");
                    connections.spawn(serve_connection(stream, peer, publisher.clone()));
                }
                Err(err) => warn!(error = %err, "accept failed"),
            },
            Some(_) = connections.join_next(), if !connections.is_empty() => {}
        }
    }

    connections.abort_all();
    while connections.join_next().await.is_some() {}
}

async fn serve_connection(stream: TcpStream, peer: SocketAddr, publisher: SnapshotPublisher) {
    let (read, mut write) = stream.into_split();
    let mut lines = BufReader::new(read).lines();

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(err) => {
                debug!(%peer, error = %err, "read failed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let response = respond(&publisher, &line);
        let mut payload = match serde_json::to_vec(&response) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(%peer, error = %err, "response encoding failed");
                break;
            }
        };
        payload.push(b'\n');

        if let Err(err) = write.write_all(&payload).await {
            debug!(%peer, error = %err, "client went away");
            break;
        }
    }

    debug!(%peer, "connection closed");
}

/// Answer one request line
pub fn respond(publisher: &SnapshotPublisher, line: &str) -> ResponseEnvelope {
    let request: RequestEnvelope = match serde_json::from_str(line) {
        Ok(request) => request,
        Err(err) => {
            warn!(error = %err, "undecodable request");
            return ResponseEnvelope::from_error(Value::Null, RequestError::Parse(err.to_string()));
        }
    };

    match dispatch(publisher, &request.command, &request.params) {
        Ok(value) => ResponseEnvelope::success(request.id, value),
        Err(err) => ResponseEnvelope::from_error(request.id, err),
    }
}

fn dispatch(
    publisher: &SnapshotPublisher,
    command: &str,
    params: &Value,
) -> Result<Value, RequestError> {
    match command {
        "handshake" => cmd_handshake(params),
        "status" => Ok(cmd_status(publisher)),
        "snapshot" => cmd_snapshot(publisher),
        other => Err(RequestError::Unsupported(other.to_string())),
    }
}

fn cmd_handshake(params: &Value) -> Result<Value, RequestError> {
    let client = params
        .get("client")
        .and_then(Value::as_str)
        .ok_or_else(|| RequestError::invalid_param("client"))?;

    let requested = params
        .get("protocol_version")
        .and_then(Value::as_str)
        .ok_or_else(|| RequestError::invalid_param("protocol_version"))?;

    if requested != PROTOCOL_VERSION {
        return Err(RequestError::Protocol(format!(
            "unsupported protocol version: expected {}, got {}",
            PROTOCOL_VERSION, requested
        )));
    }

    Ok(json!({
        "protocol_version": PROTOCOL_VERSION,
        "server": {
            "version": crate::VERSION,
            "client": client,
            "features": ["status", "snapshot"]
        }
    }))
}

fn cmd_status(publisher: &SnapshotPublisher) -> Value {
    let latest = publisher.fetch_latest();
    json!({
        "published": latest.is_some(),
        "seq": latest.as_ref().map(|s| s.seq),
        "ts": latest.as_ref().map(|s| s.ts),
    })
}

fn cmd_snapshot(publisher: &SnapshotPublisher) -> Result<Value, RequestError> {
    let snapshot = publisher.fetch_latest().ok_or(RequestError::NotAvailable)?;
    serde_json::to_value(&*snapshot).map_err(|err| RequestError::Internal(err.to_string()))
}

enum RequestError {
    Parse(String),
    InvalidParams(String),
    Unsupported(String),
    Protocol(String),
    NotAvailable,
    Internal(String),
}

impl RequestError {
    fn invalid_param(name: &str) -> Self {
        RequestError::InvalidParams(format!("missing or invalid parameter: {}", name))
    }
}

/// One request line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Caller-chosen id echoed in the response
    #[serde(default)]
    pub id: Value,
    /// Command name
    pub command: String,
    /// Command parameters
    #[serde(default)]
    pub params: Value,
}

/// One response line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Id of the request this answers
    #[serde(default)]
    pub id: Value,
    /// Result on success
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on failure
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorEnvelope>,
}

impl ResponseEnvelope {
    fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    fn from_error(id: Value, error: RequestError) -> Self {
        Self {
            id,
            result: None,
            error: Some(ErrorEnvelope::from(error)),
        }
    }
}

/// Structured error payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Machine-readable code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl From<RequestError> for ErrorEnvelope {
    fn from(error: RequestError) -> Self {
        let (code, message) = match error {
            RequestError::Parse(message) => ("parse_error", message),
            RequestError::InvalidParams(message) => ("invalid_params", message),
            RequestError::Unsupported(command) => (
                "unsupported_command",
                format!("Command '{command}' is not supported"),
            ),
            RequestError::Protocol(message) => ("protocol_error", message),
            RequestError::NotAvailable => (
                "not_available",
                "no snapshot has been published yet".to_string(),
            ),
            RequestError::Internal(message) => ("internal_error", message),
        };
        ErrorEnvelope {
            code: code.to_string(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_code(response: &ResponseEnvelope) -> Option<&str> {
        response.error.as_ref().map(|e| e.code.as_str())
    }

    #[test]
    fn test_parse_error_has_null_id() {
        let response = respond(&SnapshotPublisher::new(), "not json");
        assert_eq!(response.id, Value::Null);
        assert_eq!(error_code(&response), Some("parse_error"));
    }

    #[test]
    fn test_unknown_command() {
        let response = respond(&SnapshotPublisher::new(), r#"{"id":7,"command":"fly"}"#);
        assert_eq!(response.id, json!(7));
        assert_eq!(error_code(&response), Some("unsupported_command"));
    }

    #[test]
    fn test_snapshot_before_publish() {
        let publisher = SnapshotPublisher::new();
        let response = respond(&publisher, r#"{"id":"a","command":"snapshot"}"#);
        assert_eq!(error_code(&response), Some("not_available"));

        let status = respond(&publisher, r#"{"id":"b","command":"status"}"#);
        assert_eq!(status.result.unwrap()["published"], json!(false));
    }

    #[test]
    fn test_handshake_version_check() {
        let publisher = SnapshotPublisher::new();
        let ok = respond(
            &publisher,
            &json!({
                "id": 1,
                "command": "handshake",
                "params": {"client": "test", "protocol_version": PROTOCOL_VERSION}
            })
            .to_string(),
        );
        assert!(ok.error.is_none());

        let bad = respond(
            &publisher,
            r#"{"id":2,"command":"handshake","params":{"client":"test","protocol_version":"0.0.1"}}"#,
        );
        assert_eq!(error_code(&bad), Some("protocol_error"));

        let missing = respond(&publisher, r#"{"id":3,"command":"handshake"}"#);
        assert_eq!(error_code(&missing), Some("invalid_params"));
    }
}
