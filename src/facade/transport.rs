//! HTTP plumbing to the management server.
//!
//! The facade only sees the [`Connector`] trait and [`TransportError`];
//! `ureq` types never leave this module.

use std::fmt;
use std::io::{self, Read};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use log::{debug, trace};
use serde_json::{json, Value};

use crate::config::layers::RemoteConfigSource;
use crate::error::{Error, Result};

/// Path of the RPC endpoint relative to the server URL.
pub const RPC_PATH: &str = "/api/rpc";
/// Prefix of the resource API relative to the server URL.
pub const REST_PATH: &str = "/api/v1";

const USER_AGENT: &str = concat!("rbuild/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const PROBE_BODY_LIMIT: u64 = 1024;

/// Where and as whom to talk to the management server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Endpoint {
    pub server_url: String,
    pub user: String,
    pub password: String,
}

impl Endpoint {
    pub fn new(
        server_url: impl Into<String>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            server_url: server_url.into().trim_end_matches('/').to_string(),
            user: user.into(),
            password: password.into(),
        }
    }

    /// The same server with no credentials.
    pub fn anonymous(server_url: impl Into<String>) -> Self {
        Self::new(server_url, "", "")
    }
}

/// A failed round-trip, before it is given domain meaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The socket timed out.
    Timeout,
    /// The server answered with an HTTP error status.
    Status { code: u16, message: String },
    /// Anything else: DNS, refused connection, unreadable body.
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout => write!(f, "timed out"),
            TransportError::Status { code, message } => write!(f, "{} {}", code, message),
            TransportError::Other(message) => write!(f, "{}", message),
        }
    }
}

impl TransportError {
    /// Give a transport failure domain meaning for `url`.
    pub fn into_error(self, url: &str) -> Error {
        match self {
            TransportError::Timeout => Error::TransportTimeout { attempts: 1 },
            status @ TransportError::Status { .. } => status.into_remote_error(),
            TransportError::Other(message) => Error::Transport {
                url: url.to_string(),
                message,
            },
        }
    }

    /// Report any failure as a generic [`Error::Remote`]. Used by creation
    /// calls, whose callers only tell conflicts apart from everything else.
    pub fn into_remote_error(self) -> Error {
        let (class, detail) = match self {
            TransportError::Timeout => ("TimeoutError", "timed out".to_string()),
            TransportError::Status { code, message } => {
                ("HTTPError", format!("{} {}", code, message))
            }
            TransportError::Other(message) => ("TransportError", message),
        };
        Error::Remote {
            class: class.to_string(),
            detail: json!(detail),
        }
    }
}

pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// The server's procedure-call interface.
pub trait RpcTransport {
    /// Invoke `method` and return the raw response envelope.
    fn call(&self, method: &str, params: &[Value]) -> TransportResult<Value>;
}

/// The server's resource interface.
pub trait RestTransport {
    fn get(&self, path: &str) -> TransportResult<Value>;
    fn post(&self, path: &str, body: &Value) -> TransportResult<Value>;
}

/// Creates transports and checks reachability.
pub trait Connector {
    fn rpc(&self, endpoint: &Endpoint) -> Box<dyn RpcTransport>;
    fn rest(&self, endpoint: &Endpoint) -> Box<dyn RestTransport>;
    /// Fetch `url` and discard the body.
    fn reach(&self, url: &str) -> TransportResult<()>;
    /// Whether a TCP connection to `host:port` can be opened.
    fn port_open(&self, host: &str, port: u16) -> bool;
}

/// [`Connector`] backed by `ureq`.
#[derive(Clone)]
pub struct HttpConnector {
    agent: ureq::Agent,
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(USER_AGENT)
                .build(),
        }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connector for HttpConnector {
    fn rpc(&self, endpoint: &Endpoint) -> Box<dyn RpcTransport> {
        Box::new(HttpTransport {
            agent: self.agent.clone(),
            endpoint: endpoint.clone(),
        })
    }

    fn rest(&self, endpoint: &Endpoint) -> Box<dyn RestTransport> {
        Box::new(HttpTransport {
            agent: self.agent.clone(),
            endpoint: endpoint.clone(),
        })
    }

    fn reach(&self, url: &str) -> TransportResult<()> {
        debug!("Probing {}", url);
        let response = self
            .agent
            .get(url)
            .timeout(PROBE_TIMEOUT)
            .call()
            .map_err(map_ureq_error)?;
        let mut body = Vec::new();
        response
            .into_reader()
            .take(PROBE_BODY_LIMIT)
            .read_to_end(&mut body)
            .map_err(map_io_error)?;
        Ok(())
    }

    fn port_open(&self, host: &str, port: u16) -> bool {
        let Ok(addrs) = (host, port).to_socket_addrs() else {
            return false;
        };
        addrs
            .into_iter()
            .any(|addr| TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok())
    }
}

struct HttpTransport {
    agent: ureq::Agent,
    endpoint: Endpoint,
}

impl HttpTransport {
    fn request(&self, method: &str, url: &str) -> ureq::Request {
        let request = self.agent.request(method, url).set("Accept", "application/json");
        if self.endpoint.user.is_empty() {
            return request;
        }
        let token = STANDARD.encode(format!("{}:{}", self.endpoint.user, self.endpoint.password));
        request.set("Authorization", &format!("Basic {}", token))
    }

    fn read(response: ureq::Response) -> TransportResult<Value> {
        response.into_json::<Value>().map_err(map_io_error)
    }
}

impl RpcTransport for HttpTransport {
    fn call(&self, method: &str, params: &[Value]) -> TransportResult<Value> {
        let url = format!("{}{}", self.endpoint.server_url, RPC_PATH);
        trace!("rpc {} {:?}", method, params);
        let response = self
            .request("POST", &url)
            .send_json(json!({ "method": method, "params": params }))
            .map_err(map_ureq_error)?;
        Self::read(response)
    }
}

impl RestTransport for HttpTransport {
    fn get(&self, path: &str) -> TransportResult<Value> {
        let url = format!("{}{}{}", self.endpoint.server_url, REST_PATH, path);
        let response = self.request("GET", &url).call().map_err(map_ureq_error)?;
        Self::read(response)
    }

    fn post(&self, path: &str, body: &Value) -> TransportResult<Value> {
        let url = format!("{}{}{}", self.endpoint.server_url, REST_PATH, path);
        let response = self
            .request("POST", &url)
            .send_json(body)
            .map_err(map_ureq_error)?;
        Self::read(response)
    }
}

/// Fetches published client configuration over HTTP.
pub struct HttpRemoteConfig {
    agent: ureq::Agent,
}

impl HttpRemoteConfig {
    pub fn new(connector: &HttpConnector) -> Self {
        Self {
            agent: connector.agent.clone(),
        }
    }
}

impl RemoteConfigSource for HttpRemoteConfig {
    fn fetch(&self, url: &str) -> Result<Option<String>> {
        match self.agent.get(url).timeout(PROBE_TIMEOUT).call() {
            Ok(response) => Ok(Some(response.into_string()?)),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(err) => Err(map_ureq_error(err).into_error(url)),
        }
    }
}

fn map_ureq_error(err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(code, response) => TransportError::Status {
            code,
            message: response.status_text().to_string(),
        },
        ureq::Error::Transport(transport) => {
            if is_timeout(&transport) {
                TransportError::Timeout
            } else {
                TransportError::Other(transport.to_string())
            }
        }
    }
}

fn map_io_error(err: io::Error) -> TransportError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TransportError::Timeout,
        _ => TransportError::Other(err.to_string()),
    }
}

fn is_timeout(transport: &ureq::Transport) -> bool {
    use std::error::Error as _;

    transport
        .source()
        .and_then(|source| source.downcast_ref::<io::Error>())
        .map(|err| matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock))
        .unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let endpoint = Endpoint::new("http://rb.example.com/", "u", "p");
        assert_eq!(endpoint.server_url, "http://rb.example.com");
        assert_eq!(Endpoint::anonymous("http://x").user, "");
    }

    #[test]
    fn test_transport_error_mapping() {
        let err = TransportError::Timeout.into_error("http://x");
        assert!(err.is_timeout());

        let err = TransportError::Other("refused".to_string()).into_error("http://x");
        assert_eq!(err.to_string(), "Error contacting 'http://x': refused");

        let err = TransportError::Status {
            code: 500,
            message: "Internal Server Error".to_string(),
        }
        .into_error("http://x");
        assert_eq!(
            err.to_string(),
            "rBuilder error HTTPError: '500 Internal Server Error'"
        );
    }

    #[test]
    fn test_every_failure_can_be_reported_as_remote() {
        let failures = [
            (TransportError::Timeout, "rBuilder error TimeoutError: 'timed out'"),
            (
                TransportError::Other("refused".to_string()),
                "rBuilder error TransportError: 'refused'",
            ),
            (
                TransportError::Status {
                    code: 503,
                    message: "Service Unavailable".to_string(),
                },
                "rBuilder error HTTPError: '503 Service Unavailable'",
            ),
        ];
        for (failure, expected) in failures {
            let err = failure.into_remote_error();
            assert!(matches!(err, Error::Remote { .. }));
            assert!(!err.is_timeout());
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_io_timeout_maps_to_timeout() {
        let err = io::Error::new(io::ErrorKind::TimedOut, "slow");
        assert_eq!(map_io_error(err), TransportError::Timeout);
    }

    #[test]
    fn test_port_open_unresolvable_host() {
        let connector = HttpConnector::new();
        assert!(!connector.port_open("host.invalid", 9999));
    }
}
