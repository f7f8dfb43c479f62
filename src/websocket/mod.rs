//! Client side websocket opening handshake.
//!
//! Only the upgrade request and the validation of the server answer live
//! here. Framing is left to whoever owns the connection after the upgrade.

use http::{HeaderMap, Uri};

use crate::Error;

mod handshake;
pub use handshake::Handshaker;

/// Websocket protocol revisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WebSocketVersion {
    /// draft-ietf-hybi-00, uses a different key scheme and is not supported.
    V00,
    /// draft-ietf-hybi-07
    V07,
    /// draft-ietf-hybi-10
    V08,
    /// RFC 6455
    #[default]
    V13,
}

impl WebSocketVersion {
    /// Value of the `sec-websocket-version` header.
    pub fn header_value(&self) -> &'static str {
        match self {
            WebSocketVersion::V00 => "0",
            WebSocketVersion::V07 => "7",
            WebSocketVersion::V08 => "8",
            WebSocketVersion::V13 => "13",
        }
    }

    fn is_supported(&self) -> bool {
        !matches!(self, WebSocketVersion::V00)
    }
}

/// Parameters for building a [`Handshaker`].
#[derive(Debug, Clone, Default)]
pub struct HandshakeConfig {
    pub version: WebSocketVersion,
    /// Comma separated subprotocols to ask for.
    pub subprotocol: Option<String>,
    /// Whether frames may use extension (reserved) bits after the upgrade.
    pub allow_extensions: bool,
    /// Extra headers sent with the upgrade request.
    pub headers: HeaderMap,
}

impl HandshakeConfig {
    pub fn new(version: WebSocketVersion) -> Self {
        HandshakeConfig {
            version,
            ..Default::default()
        }
    }
}

/// Create a handshaker for `uri`.
///
/// The uri must use the `ws` or `wss` scheme and have a host.
pub fn new_handshaker(uri: Uri, config: HandshakeConfig) -> Result<Handshaker, Error> {
    if !config.version.is_supported() {
        return Err(Error::UnsupportedWebSocketVersion(config.version));
    }

    let scheme_ok = matches!(
        uri.scheme_str(),
        Some(s) if s.eq_ignore_ascii_case("ws") || s.eq_ignore_ascii_case("wss")
    );

    if !scheme_ok {
        return Err(Error::MalformedUri(format!("not a websocket uri: {}", uri)));
    }

    if uri.host().map(|h| h.is_empty()).unwrap_or(true) {
        return Err(Error::MalformedUri(format!("missing host: {}", uri)));
    }

    Ok(Handshaker::new(uri, config))
}
