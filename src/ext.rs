use http::{HeaderName, HeaderValue};

pub(crate) trait HeaderIterExt {
    /// Some header `key` has exactly `value`, ignoring ascii case.
    fn has(self, key: &str, value: &str) -> bool;

    /// Some header `key` has `token` in its comma separated list.
    fn has_token(self, key: &str, token: &str) -> bool;
}

impl<'a, I: Iterator<Item = (&'a HeaderName, &'a HeaderValue)>> HeaderIterExt for I {
    fn has(self, key: &str, value: &str) -> bool {
        self.filter(|i| i.0 == key)
            .filter_map(|i| i.1.to_str().ok())
            .any(|v| v.trim().eq_ignore_ascii_case(value))
    }

    fn has_token(self, key: &str, token: &str) -> bool {
        self.filter(|i| i.0 == key)
            .filter_map(|i| i.1.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|t| t.trim().eq_ignore_ascii_case(token))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use http::HeaderMap;

    #[test]
    fn header_tokens() {
        let mut map = HeaderMap::new();
        map.insert("connection", HeaderValue::from_static("keep-alive, Upgrade"));
        map.insert("upgrade", HeaderValue::from_static("WebSocket"));

        assert!(map.iter().has("upgrade", "websocket"));
        assert!(!map.iter().has("connection", "upgrade"));
        assert!(map.iter().has_token("connection", "upgrade"));
        assert!(!map.iter().has_token("connection", "close"));
    }
}
