use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tracing::{debug, trace};

use crate::protocol::{self, Command};
use crate::{Error, Result};

/// Handshake header carrying the client secret. Hub firmware revisions
/// disagree on the name, so it is a configuration variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SecretHeader {
    #[default]
    Password,
    ClientSecret,
}

impl SecretHeader {
    pub fn name(&self) -> &'static str {
        match self {
            SecretHeader::Password => "password",
            SecretHeader::ClientSecret => "client_secret",
        }
    }
}

/// One-socket-per-request WebSocket transport.
///
/// Each call opens a fresh connection, sends one envelope, awaits exactly
/// one text frame and closes. No pooling, no internal retry; the next poll
/// cycle is the retry.
pub(crate) struct Transport {
    url: String,
    client_id: String,
    client_secret: String,
    secret_header: SecretHeader,
    timeout: Duration,
}

impl Transport {
    pub fn new(
        host: &str,
        port: u16,
        client_id: String,
        client_secret: String,
        secret_header: SecretHeader,
        timeout: Duration,
    ) -> Self {
        Self {
            url: format!("ws://{host}:{port}/ws"),
            client_id,
            client_secret,
            secret_header,
            timeout,
        }
    }

    pub async fn send_commands(&self, commands: &[Command]) -> Result<Value> {
        if commands.is_empty() {
            return Err(Error::Protocol("empty command batch".into()));
        }
        let frame = protocol::encode_envelope(commands)?;
        debug!(url = %self.url, count = commands.len(), "sending command batch");

        let uri: tungstenite::http::Uri = self
            .url
            .parse()
            .map_err(|e: tungstenite::http::uri::InvalidUri| Error::ConnectFailed(e.to_string()))?;
        let request = ClientRequestBuilder::new(uri)
            .with_header("client_id", self.client_id.as_str())
            .with_header(self.secret_header.name(), self.client_secret.as_str());

        let (mut ws, _response) =
            tokio::time::timeout(self.timeout, tokio_tungstenite::connect_async(request))
                .await
                .map_err(|_| Error::Timeout)?
                .map_err(classify_handshake_error)?;
        trace!(url = %self.url, "WebSocket connected");

        ws.send(tungstenite::Message::text(frame))
            .await
            .map_err(|e| Error::ConnectFailed(e.to_string()))?;

        let response = loop {
            let next = tokio::time::timeout(self.timeout, ws.next())
                .await
                .map_err(|_| Error::Timeout)?;
            match next {
                Some(Ok(tungstenite::Message::Text(text))) => {
                    break protocol::decode_text(text.as_str())?;
                }
                Some(Ok(tungstenite::Message::Ping(_) | tungstenite::Message::Pong(_))) => {
                    trace!("keepalive frame");
                }
                Some(Ok(tungstenite::Message::Close(_))) => {
                    return Err(Error::Protocol("connection closed before response".into()));
                }
                Some(Ok(_)) => {
                    return Err(Error::Protocol("non-text response frame".into()));
                }
                Some(Err(e)) => return Err(Error::ConnectFailed(e.to_string())),
                None => {
                    return Err(Error::Protocol("stream ended before response".into()));
                }
            }
        };

        if let Err(e) = ws.close(None).await {
            trace!(error = %e, "close after response");
        }
        Ok(response)
    }
}

fn classify_handshake_error(e: tungstenite::Error) -> Error {
    match e {
        tungstenite::Error::Http(response) => {
            let status = response.status();
            if status == tungstenite::http::StatusCode::UNAUTHORIZED
                || status == tungstenite::http::StatusCode::FORBIDDEN
            {
                Error::AuthRejected
            } else {
                Error::ConnectFailed(format!("handshake rejected: {status}"))
            }
        }
        other => Error::ConnectFailed(other.to_string()),
    }
}
