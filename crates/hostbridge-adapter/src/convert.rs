//! Conversions between raw host invocation data and the http types the
//! canonical model is built from.

use http::header::HOST;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};

use hostbridge_core::{AdapterError, AdapterOptions, AdapterResult};

/// Parse a raw method token, uppercasing it first.
///
/// Hosts are inconsistent about method casing; the canonical form is
/// always the uppercased token. An empty or non-token string is a
/// malformed request, not a server fault.
pub fn parse_method(raw: &str) -> AdapterResult<Method> {
    let upper = raw.to_ascii_uppercase();
    Method::from_bytes(upper.as_bytes())
        .map_err(|_| AdapterError::MalformedRequest(format!("invalid method token: {raw:?}")))
}

/// Convert headers from a list of (name, value) tuples.
///
/// Duplicate names are appended in order, so multi-value headers keep
/// their relative order. Value bytes are stored verbatim; only the name
/// is normalized for case-insensitive lookup. Pairs that are not valid
/// header material are skipped.
pub fn headers_from_tuples(tuples: Vec<(String, Vec<u8>)>) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in tuples {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_bytes(&value),
        ) {
            map.append(name, value);
        }
    }
    map
}

/// Convert headers to a list of (name, value) tuples, one entry per
/// value so duplicates become repeated header lines.
pub fn headers_to_tuples(headers: &HeaderMap) -> Vec<(String, Vec<u8>)> {
    headers
        .iter()
        .map(|(name, value)| (name.as_str().to_string(), value.as_bytes().to_vec()))
        .collect()
}

/// Build the canonical absolute URL for a request.
///
/// An already-absolute target is parsed as-is. Otherwise the URL is
/// synthesized: scheme from the host's hint or the configured default,
/// authority from the hint, the `host` header, or the configured
/// default (`http://localhost` out of the box).
pub fn synthesize_uri(
    target: &str,
    scheme: Option<&str>,
    authority: Option<&str>,
    headers: &HeaderMap,
    options: &AdapterOptions,
) -> AdapterResult<Uri> {
    if target.contains("://") {
        return target
            .parse()
            .map_err(|e| AdapterError::MalformedRequest(format!("invalid url {target:?}: {e}")));
    }

    let scheme = scheme.unwrap_or(&options.default_scheme);
    let authority = authority
        .map(str::to_string)
        .or_else(|| {
            headers
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        })
        .unwrap_or_else(|| options.default_authority.clone());

    let path = match target {
        "" => "/".to_string(),
        "*" => "*".to_string(),
        t if t.starts_with('/') => t.to_string(),
        t => format!("/{t}"),
    };

    Uri::builder()
        .scheme(scheme)
        .authority(authority.as_str())
        .path_and_query(path.as_str())
        .build()
        .map_err(|e| AdapterError::MalformedRequest(format!("cannot synthesize url: {e}")))
}
