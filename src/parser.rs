use http::{HeaderName, HeaderValue, Response, StatusCode, Version};

use crate::Error;

/// Try parsing a response head (status line and headers) from `input`.
///
/// `Ok(None)` means there is not enough input yet. On success the amount
/// of input consumed is returned alongside the response.
pub(crate) fn try_parse_response<const N: usize>(
    input: &[u8],
) -> Result<Option<(usize, Response<()>)>, Error> {
    let mut headers = [httparse::EMPTY_HEADER; N];
    let mut res = httparse::Response::new(&mut headers);

    let input_used = match res.parse(input)? {
        httparse::Status::Complete(v) => v,
        httparse::Status::Partial => return Ok(None),
    };

    let version = match res.version {
        Some(0) => Version::HTTP_10,
        Some(1) => Version::HTTP_11,
        _ => return Err(Error::MissingResponseVersion),
    };

    let status = res
        .code
        .and_then(|c| StatusCode::from_u16(c).ok())
        .ok_or(Error::ResponseInvalidStatus)?;

    let mut builder = Response::builder().version(version).status(status);

    for h in res.headers.iter() {
        let name = HeaderName::from_bytes(h.name.as_bytes())
            .map_err(|_| Error::BadHeader(h.name.to_string()))?;
        let value = HeaderValue::from_bytes(h.value)
            .map_err(|_| Error::BadHeader(h.name.to_string()))?;
        builder = builder.header(name, value);
    }

    let response = builder.body(())?;

    Ok(Some((input_used, response)))
}
