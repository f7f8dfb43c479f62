#![no_main]

use inflight::Url;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(u) = Url::parse(s) else {
        return;
    };
    let _ = u.scheme();
    let _ = u.username();
    let _ = u.password();
    let _ = u.host();
    let _ = u.hostname();
    let _ = u.port();
    let _ = u.pathname();
    let _ = u.query();
    let _ = u.fragment();

    let ws = u.with_protocol(u.protocol().websocket());
    assert_eq!(ws.is_secure(), u.is_secure());
    assert_eq!(ws.host(), u.host());
    assert_eq!(ws.pathname(), u.pathname());
    assert_eq!(ws.query(), u.query());

    let _ = ws.to_uri();
});
