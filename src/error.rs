use http::StatusCode;
use thiserror::Error;

use crate::url::UrlError;
use crate::websocket::WebSocketVersion;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("url: {0}")]
    Url(#[from] UrlError),

    #[error("malformed uri: {0}")]
    MalformedUri(String),

    #[error("websocket version not supported: {0:?}")]
    UnsupportedWebSocketVersion(WebSocketVersion),

    #[error("bad header: {0}")]
    BadHeader(String),

    #[error("output too small to write output")]
    OutputOverflow,

    #[error("http parse fail: {0}")]
    HttpParseFail(String),

    #[error("http parse resulted in too many headers")]
    HttpParseTooManyHeaders,

    #[error("http response missing version")]
    MissingResponseVersion,

    #[error("http response invalid status")]
    ResponseInvalidStatus,

    #[error("websocket handshake got status {0}, expected 101")]
    HandshakeStatus(StatusCode),

    #[error("websocket handshake missing header: {0}")]
    HandshakeMissingHeader(&'static str),

    #[error("websocket handshake accept key mismatch")]
    HandshakeAcceptMismatch,

    #[error("websocket handshake subprotocol mismatch")]
    HandshakeSubprotocolMismatch,
}

impl From<httparse::Error> for Error {
    fn from(value: httparse::Error) -> Self {
        match value {
            httparse::Error::TooManyHeaders => Error::HttpParseTooManyHeaders,
            _ => Error::HttpParseFail(value.to_string()),
        }
    }
}

impl From<http::Error> for Error {
    fn from(value: http::Error) -> Self {
        Error::BadHeader(value.to_string())
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(value: http::uri::InvalidUri) -> Self {
        Error::MalformedUri(value.to_string())
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(value: http::uri::InvalidUriParts) -> Self {
        Error::MalformedUri(value.to_string())
    }
}
