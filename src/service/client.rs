//! Synchronous client for the snapshot service.
//!
//! Speaks the same newline-delimited JSON protocol as [`SnapshotServer`](super::SnapshotServer)
//! over a plain blocking `TcpStream`. Used by the `fetch` subcommand and by
//! external consumers that do not want an async runtime.

use crate::PROTOCOL_VERSION;
use crate::runtime::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Value, json};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;

use super::{ErrorEnvelope, ResponseEnvelope};

/// Errors produced by the [`SnapshotClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// I/O error while talking to the service.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// JSON (de)serialisation error for envelopes.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    /// The service reported a structured error.
    #[error("{}: {}", .0.code, .0.message)]
    Protocol(ErrorEnvelope),
    /// The service returned an unexpected or malformed payload.
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl ClientError {
    /// Service error code, if the service answered with one
    pub fn code(&self) -> Option<&str> {
        match self {
            ClientError::Protocol(error) => Some(error.code.as_str()),
            _ => None,
        }
    }
}

/// Response returned by the `handshake` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeInfo {
    /// Protocol version agreed between client and service.
    pub protocol_version: String,
    /// Server version.
    pub server_version: String,
    /// Features exposed by the service.
    pub features: Vec<String>,
}

/// Response returned by the `status` command.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceStatus {
    /// Whether any snapshot has been published
    pub published: bool,
    /// Sequence number of the latest snapshot
    pub seq: Option<u64>,
    /// Capture time of the latest snapshot
    pub ts: Option<DateTime<Utc>>,
}

/// Blocking client connection
pub struct SnapshotClient {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    next_request_id: u64,
}

impl SnapshotClient {
    /// Connect to a running service
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ClientError> {
        let mut last_err = None;
        for candidate in addr.to_socket_addrs()? {
            match TcpStream::connect(candidate) {
                Ok(stream) => {
                    stream.set_nodelay(true).ok();
                    return Ok(Self {
                        reader: BufReader::new(stream.try_clone()?),
                        writer: BufWriter::new(stream),
                        next_request_id: 1,
                    });
                }
                Err(err) => last_err = Some(err),
            }
        }

        Err(ClientError::Io(last_err.unwrap_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "no address resolved")
        })))
    }

    /// Bound how long a single response may take
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<(), ClientError> {
        self.reader.get_ref().set_read_timeout(timeout)?;
        self.writer.get_ref().set_write_timeout(timeout)?;
        Ok(())
    }

    /// Negotiate the protocol version
    pub fn handshake(&mut self, client_name: &str) -> Result<HandshakeInfo, ClientError> {
        let result = self.call(
            "handshake",
            json!({
                "client": client_name,
                "protocol_version": PROTOCOL_VERSION,
            }),
        )?;

        let field = |name: &str| {
            result
                .get(name)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| ClientError::MalformedResponse(format!("handshake missing {name}")))
        };
        let protocol_version = field("protocol_version")?;
        let server = result
            .get("server")
            .ok_or_else(|| ClientError::MalformedResponse("handshake missing server".into()))?;
        let server_version = server
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let features = server
            .get("features")
            .and_then(Value::as_array)
            .map(|list| {
                list.iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(HandshakeInfo {
            protocol_version,
            server_version,
            features,
        })
    }

    /// Publication status
    pub fn status(&mut self) -> Result<ServiceStatus, ClientError> {
        let result = self.call("status", Value::Null)?;
        serde_json::from_value(result).map_err(ClientError::from)
    }

    /// Latest snapshot; fails with code `not_available` before the first publish
    pub fn snapshot(&mut self) -> Result<Snapshot, ClientError> {
        let result = self.call("snapshot", Value::Null)?;
        serde_json::from_value(result).map_err(ClientError::from)
    }

    /// Send an arbitrary command and return its raw result
    pub fn call(&mut self, command: &str, params: Value) -> Result<Value, ClientError> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let envelope = json!({
            "id": request_id,
            "command": command,
            "params": params,
        });

        let mut payload = serde_json::to_vec(&envelope)?;
        payload.push(b'\n');
        self.writer.write_all(&payload)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(ClientError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "service closed the connection",
            )));
        }

        let response: ResponseEnvelope = serde_json::from_str(&line)?;
        if response.id.as_u64() != Some(request_id) {
            return Err(ClientError::MalformedResponse(format!(
                "response id mismatch (expected {request_id}, got {})",
                response.id
            )));
        }

        match (response.result, response.error) {
            (_, Some(error)) => Err(ClientError::Protocol(error)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(ClientError::MalformedResponse(
                "response has neither result nor error".into(),
            )),
        }
    }
}
