//! Owned url value with scheme inspection and substitution.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;

use http::Uri;

use crate::Error;

/// Reasons a url fails to parse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum UrlError {
    TooShort,
    MissingScheme,
    BadScheme,
    TooShortUserPass,
    BadPassword,
    TooShortHost,
    PortNotANumber,
    UnclosedIpv6,
}

/// Well known schemes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Https,
    Ws,
    Wss,
    Other,
}

impl Protocol {
    fn from_scheme(scheme: &str) -> Self {
        if scheme.eq_ignore_ascii_case("http") {
            Protocol::Http
        } else if scheme.eq_ignore_ascii_case("https") {
            Protocol::Https
        } else if scheme.eq_ignore_ascii_case("ws") {
            Protocol::Ws
        } else if scheme.eq_ignore_ascii_case("wss") {
            Protocol::Wss
        } else {
            Protocol::Other
        }
    }

    /// Whether the protocol runs over TLS.
    pub fn is_secure(&self) -> bool {
        matches!(self, Protocol::Https | Protocol::Wss)
    }

    /// The websocket protocol matching the security of this one.
    pub fn websocket(&self) -> Protocol {
        if self.is_secure() {
            Protocol::Wss
        } else {
            Protocol::Ws
        }
    }

    /// Scheme string, `None` for `Other`.
    pub fn as_str(&self) -> Option<&'static str> {
        match self {
            Protocol::Http => Some("http"),
            Protocol::Https => Some("https"),
            Protocol::Ws => Some("ws"),
            Protocol::Wss => Some("wss"),
            Protocol::Other => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    buffer: String,

    // Components
    scheme_end: usize,           // Before ':'
    username_end: Option<usize>, // Before ':' (if a password is given) or '@' (if not)
    host_start: usize,
    host_end: usize,
    port: Option<u16>,
    path_start: usize,             // Before initial '/', if any
    query_start: Option<usize>,    // Before '?'
    fragment_start: Option<usize>, // Before '#'
}

impl Url {
    pub fn parse(s: &str) -> Result<Self, UrlError> {
        // x://a
        if s.len() < 5 {
            return Err(UrlError::TooShort);
        }

        let scheme_end = s.find("://").ok_or(UrlError::MissingScheme)?;
        if !is_valid_scheme(&s[..scheme_end]) {
            return Err(UrlError::BadScheme);
        }
        let scheme_end_and_delimiter = scheme_end + 3;
        // All indexes will be relative to _after_ :// and we adjust at the end.
        let x = &s[scheme_end_and_delimiter..];

        // The fragment runs to the end, so '?' and '/' only count before it,
        // and '/' only counts before the query.
        let fragment_start = x.find('#');
        let before_fragment = &x[..fragment_start.unwrap_or(x.len())];
        let query_start = before_fragment.find('?');
        let query_or_fragment = query_start.or(fragment_start);

        // Either where the path starts, or the end. All the following have the same path_start:
        // https://foo.com
        // https://foo.com?a=b
        // https://foo.com#a=b
        // https://foo.com/
        // https://foo.com/path
        let authority_end = query_or_fragment.unwrap_or(x.len());
        let path_start = x[..authority_end].find('/').unwrap_or(authority_end);

        // Limit buffer to be between '://' and the start of the path '/'
        let x = &x[..path_start];

        fn split_username(x: &str) -> Result<usize, UrlError> {
            // Need at least one char: http://a@foo.bar
            if x.is_empty() {
                return Err(UrlError::TooShortUserPass);
            }

            let n = if let Some((username, password)) = x.split_once(':') {
                if username.is_empty() || password.is_empty() {
                    return Err(UrlError::TooShortUserPass);
                }
                if password.contains(':') {
                    return Err(UrlError::BadPassword);
                }
                username.len()
            } else {
                x.len()
            };

            Ok(n)
        }

        let maybe_upass = x.find('@');
        let username_end = maybe_upass.map(|n| split_username(&x[..n])).transpose()?;

        let host_start = maybe_upass.map(|n| n + 1).unwrap_or(0);

        // An ipv6 literal, [::1], has colons of its own.
        let port_search = if x[host_start..].starts_with('[') {
            let close = x[host_start..].find(']').ok_or(UrlError::UnclosedIpv6)?;
            host_start + close + 1
        } else {
            host_start
        };
        let port_start = x[port_search..path_start].find(':').map(|n| n + port_search);
        let host_end = port_start.unwrap_or(path_start);

        if host_start == host_end {
            return Err(UrlError::TooShortHost);
        }

        let mut port = None;

        if let Some(port_start) = port_start {
            let port_str = &x[(port_start + 1)..path_start];
            let p: u16 = port_str.parse().map_err(|_| UrlError::PortNotANumber)?;
            port = Some(p);
        }

        let d = scheme_end_and_delimiter;

        Ok(Url {
            buffer: s.to_string(),
            scheme_end,
            username_end: username_end.map(|n| n + d),
            host_start: host_start + d,
            host_end: host_end + d,
            port,
            path_start: path_start + d,
            query_start: query_start.map(|n| n + d),
            fragment_start: fragment_start.map(|n| n + d),
        })
    }

    pub fn scheme(&self) -> &str {
        &self.buffer[..self.scheme_end]
    }

    pub fn protocol(&self) -> Protocol {
        Protocol::from_scheme(self.scheme())
    }

    pub fn is_secure(&self) -> bool {
        self.protocol().is_secure()
    }

    pub fn username(&self) -> &str {
        self.username_end
            .map(|u| &self.buffer[(self.scheme_end + 3)..u])
            .unwrap_or("")
    }

    pub fn password(&self) -> &str {
        self.username_end
            .filter(|u| *u + 1 < self.host_start)
            .map(|u| &self.buffer[(u + 1)..self.host_start - 1])
            .unwrap_or("")
    }

    /// Hostname including port, if any.
    pub fn host(&self) -> &str {
        &self.buffer[self.host_start..self.path_start]
    }

    pub fn hostname(&self) -> &str {
        &self.buffer[self.host_start..self.host_end]
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn pathname(&self) -> &str {
        let end = self
            .query_start
            .or(self.fragment_start)
            .unwrap_or(self.buffer.len());

        &self.buffer[self.path_start..end]
    }

    pub fn query(&self) -> Option<&str> {
        let start = self.query_start?;
        let end = self.fragment_start.unwrap_or(self.buffer.len());
        Some(&self.buffer[start..end])
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment_start.map(|s| &self.buffer[s..])
    }

    /// A copy of this url where only the scheme is replaced.
    pub fn with_scheme(&self, scheme: &str) -> Result<Url, UrlError> {
        if !is_valid_scheme(scheme) {
            return Err(UrlError::BadScheme);
        }

        let mut buffer = String::with_capacity(scheme.len() + self.buffer.len() - self.scheme_end);
        buffer.push_str(scheme);
        buffer.push_str(&self.buffer[self.scheme_end..]);

        // Every index after the scheme shifts by the same amount.
        let shift = |n: usize| n + scheme.len() - self.scheme_end;

        Ok(Url {
            buffer,
            scheme_end: scheme.len(),
            username_end: self.username_end.map(shift),
            host_start: shift(self.host_start),
            host_end: shift(self.host_end),
            port: self.port,
            path_start: shift(self.path_start),
            query_start: self.query_start.map(shift),
            fragment_start: self.fragment_start.map(shift),
        })
    }

    /// A copy of this url with the scheme set to a well known protocol.
    ///
    /// `Protocol::Other` keeps the current scheme.
    pub fn with_protocol(&self, protocol: Protocol) -> Url {
        match protocol.as_str() {
            // Known schemes are always valid.
            Some(s) => self.with_scheme(s).unwrap_or_else(|_| self.clone()),
            None => self.clone(),
        }
    }

    /// Convert to an `http::Uri`.
    ///
    /// The fragment, if any, is not part of the resulting uri.
    pub fn to_uri(&self) -> Result<Uri, Error> {
        let end = self.fragment_start.unwrap_or(self.buffer.len());
        let uri: Uri = self.buffer[..end].parse()?;
        Ok(uri)
    }

    pub fn as_str(&self) -> &str {
        &self.buffer
    }
}

fn is_valid_scheme(s: &str) -> bool {
    let mut chars = s.chars();

    let Some(first) = chars.next() else {
        return false;
    };

    first.is_ascii_alphabetic()
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '-' || c == '.')
}

impl<'a> TryFrom<&'a str> for Url {
    type Error = UrlError;

    fn try_from(value: &'a str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.buffer)
    }
}

impl Deref for Url {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl fmt::Display for UrlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use UrlError::*;
        let s = match self {
            TooShort => "too short",
            MissingScheme => "missing scheme",
            BadScheme => "bad scheme",
            TooShortUserPass => "too short user/password",
            BadPassword => "bad password",
            TooShortHost => "too short hostname",
            PortNotANumber => "port is not a number",
            UnclosedIpv6 => "ipv6 host missing ']'",
        };
        write!(f, "{}", s)
    }
}

impl std::error::Error for UrlError {}
