//! Request adapting — raw host parts in, canonical request out.

use tracing::debug;

use hostbridge_core::{AbortSignal, AdapterOptions, AdapterResult, CanonicalRequest};

use crate::convert;
use crate::shape::RawRequest;

/// Build the canonical request for one invocation.
///
/// The URL is made absolute (synthesizing `http://localhost` when the
/// host supplies neither hints nor a `host` header), duplicate headers
/// are preserved in order with their value bytes untouched, and the
/// body is wrapped without pulling a single chunk from the host source
/// — bodies that handlers never inspect are never buffered.
pub fn adapt(
    raw: RawRequest,
    signal: AbortSignal,
    options: &AdapterOptions,
) -> AdapterResult<CanonicalRequest> {
    let method = convert::parse_method(&raw.method)?;
    let headers = convert::headers_from_tuples(raw.headers);
    let uri = convert::synthesize_uri(
        &raw.target,
        raw.scheme.as_deref(),
        raw.authority.as_deref(),
        &headers,
        options,
    )?;

    debug!(method = %method, url = %uri, "request adapted");
    Ok(CanonicalRequest::new(method, uri, headers, raw.body, signal))
}
