use std::fmt;

use crate::types::HvacMode;

/// What kind of entity a cache lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Aircon,
    Zone,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Aircon => write!(f, "aircon"),
            EntityKind::Zone => write!(f, "zone"),
        }
    }
}

#[derive(Debug)]
pub enum Error {
    /// The hub could not be reached (DNS, TCP, or handshake transport
    /// failure). Not retried internally; the next poll cycle retries.
    ConnectFailed(String),
    /// The hub refused the WebSocket handshake credentials.
    AuthRejected,
    /// Malformed frame or JSON, unexpected message type, or a response
    /// missing required keys.
    Protocol(String),
    /// No response within the bounded wait. Callers treat this like
    /// `ConnectFailed`.
    Timeout,
    /// A command targeted an entity that is not in the cached snapshot.
    EntityNotFound { kind: EntityKind, id: String },
    /// The requested hvac mode is not valid for the target entity.
    UnsupportedMode(HvacMode),
    /// The owning aircon of a temperature target could not be resolved,
    /// so heat-vs-cool cannot be decided.
    NoModeContext(String),
    /// Invalid client configuration.
    Config(String),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::ConnectFailed(msg) => write!(f, "connect failed: {msg}"),
            Error::AuthRejected => write!(f, "hub rejected credentials"),
            Error::Protocol(msg) => write!(f, "protocol error: {msg}"),
            Error::Timeout => write!(f, "no response within timeout"),
            Error::EntityNotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Error::UnsupportedMode(mode) => write!(f, "unsupported mode: {mode}"),
            Error::NoModeContext(id) => write!(f, "no owning aircon resolvable for: {id}"),
            Error::Config(msg) => write!(f, "invalid configuration: {msg}"),
            Error::Io(e) => write!(f, "IO error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Protocol(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
