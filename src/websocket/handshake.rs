use core::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use http::header::{CONNECTION, HOST, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY};
use http::header::{SEC_WEBSOCKET_PROTOCOL, SEC_WEBSOCKET_VERSION, UPGRADE};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use http::{Request, Response, StatusCode, Uri, Version};
use sha1::{Digest, Sha1};

use crate::ext::HeaderIterExt;
use crate::parser::try_parse_response;
use crate::{Error, MAX_RESPONSE_HEADERS};

use super::{HandshakeConfig, WebSocketVersion};

const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

// Set by the handshake itself, extra headers can't override them.
const RESERVED_HEADERS: [HeaderName; 5] = [
    HOST,
    UPGRADE,
    CONNECTION,
    SEC_WEBSOCKET_KEY,
    SEC_WEBSOCKET_VERSION,
];

/// The client half of a websocket opening handshake.
///
/// Holds the target uri, the random key sent to the server and the accept
/// value the server is expected to answer with.
pub struct Handshaker {
    uri: Uri,
    config: HandshakeConfig,
    key: String,
    expected_accept: String,
}

impl Handshaker {
    pub(crate) fn new(uri: Uri, config: HandshakeConfig) -> Self {
        let key = gen_ws_key();
        let expected_accept = calculate_ws_accept(&key);

        debug!("New websocket handshaker for {} ({:?})", uri, config.version);

        Handshaker {
            uri,
            config,
            key,
            expected_accept,
        }
    }

    #[cfg(test)]
    pub(crate) fn with_key(mut self, key: &str) -> Self {
        self.expected_accept = calculate_ws_accept(key);
        self.key = key.to_string();
        self
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn version(&self) -> WebSocketVersion {
        self.config.version
    }

    pub fn subprotocol(&self) -> Option<&str> {
        self.config.subprotocol.as_deref()
    }

    pub fn allows_extensions(&self) -> bool {
        self.config.allow_extensions
    }

    /// The base64 encoded nonce sent as `sec-websocket-key`.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The `sec-websocket-accept` value a conforming server answers with.
    pub fn expected_accept(&self) -> &str {
        &self.expected_accept
    }

    /// Build the upgrade request.
    pub fn request(&self) -> Result<Request<()>, Error> {
        let mut builder = Request::builder()
            .method(Method::GET)
            .uri(self.uri.clone())
            .version(Version::HTTP_11)
            .header(HOST, host_header(&self.uri)?)
            .header(UPGRADE, "websocket")
            .header(CONNECTION, "Upgrade")
            .header(SEC_WEBSOCKET_KEY, self.key.as_str())
            .header(SEC_WEBSOCKET_VERSION, self.config.version.header_value());

        if let Some(p) = &self.config.subprotocol {
            builder = builder.header(SEC_WEBSOCKET_PROTOCOL, p.as_str());
        }

        for (k, v) in &self.config.headers {
            if RESERVED_HEADERS.contains(k) {
                continue;
            }
            builder = builder.header(k, v);
        }

        Ok(builder.body(())?)
    }

    /// Check that the server accepted the upgrade.
    pub fn verify(&self, response: &Response<()>) -> Result<(), Error> {
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(Error::HandshakeStatus(response.status()));
        }

        let headers = response.headers();

        if !headers.iter().has(UPGRADE.as_str(), "websocket") {
            return Err(Error::HandshakeMissingHeader("upgrade"));
        }

        if !headers.iter().has_token(CONNECTION.as_str(), "upgrade") {
            return Err(Error::HandshakeMissingHeader("connection"));
        }

        let accept = headers
            .get(SEC_WEBSOCKET_ACCEPT)
            .ok_or(Error::HandshakeMissingHeader("sec-websocket-accept"))?;

        if accept.as_bytes() != self.expected_accept.as_bytes() {
            return Err(Error::HandshakeAcceptMismatch);
        }

        self.verify_subprotocol(headers)?;

        trace!("Websocket handshake accepted for {}", self.uri);

        Ok(())
    }

    fn verify_subprotocol(&self, headers: &HeaderMap) -> Result<(), Error> {
        let chosen = headers
            .get(SEC_WEBSOCKET_PROTOCOL)
            .and_then(|v| v.to_str().ok())
            .map(str::trim);

        match (self.subprotocol(), chosen) {
            (None, None) => Ok(()),
            (Some(requested), Some(chosen)) => {
                if requested.split(',').map(str::trim).any(|p| p == chosen) {
                    Ok(())
                } else {
                    Err(Error::HandshakeSubprotocolMismatch)
                }
            }
            _ => Err(Error::HandshakeSubprotocolMismatch),
        }
    }

    /// Try reading and verifying the server answer from `input`.
    ///
    /// `Ok(None)` means more input is needed. On success the amount of
    /// input used is returned, any bytes after that are websocket frames.
    pub fn try_read_response(
        &self,
        input: &[u8],
    ) -> Result<Option<(usize, Response<()>)>, Error> {
        let Some((input_used, response)) = try_parse_response::<MAX_RESPONSE_HEADERS>(input)?
        else {
            return Ok(None);
        };

        self.verify(&response)?;

        Ok(Some((input_used, response)))
    }
}

fn host_header(uri: &Uri) -> Result<HeaderValue, Error> {
    let host = uri
        .host()
        .ok_or_else(|| Error::MalformedUri(format!("missing host: {}", uri)))?;

    let value = match uri.port_u16() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    };

    HeaderValue::try_from(value).map_err(|e| Error::BadHeader(e.to_string()))
}

fn gen_ws_key() -> String {
    let mut nonce = [0_u8; 16];
    for b in nonce.iter_mut() {
        *b = fastrand::u8(..);
    }
    STANDARD.encode(nonce)
}

fn calculate_ws_accept(key: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key.as_bytes());
    hasher.update(WS_GUID.as_bytes());
    let digest = hasher.finalize();
    STANDARD.encode(digest)
}

impl fmt::Debug for Handshaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handshaker")
            .field("uri", &self.uri)
            .field("version", &self.config.version)
            .field("subprotocol", &self.config.subprotocol)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rfc6455_accept() {
        // Example from RFC 6455 section 1.3
        let accept = calculate_ws_accept("dGhlIHNhbXBsZSBub25jZQ==");
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn keys_are_random() {
        let a = gen_ws_key();
        let b = gen_ws_key();
        assert_eq!(a.len(), 24);
        assert_ne!(a, b);
    }
}
