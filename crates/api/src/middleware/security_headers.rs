//! Hardening headers for JSON responses.

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderName, HeaderValue, header},
    middleware::Next,
    response::Response,
};

/// Headers always overwritten. The API serves JSON only, so nothing may be
/// loaded, framed or sniffed from it.
const FIXED: [(&str, &str); 5] = [
    ("x-frame-options", "DENY"),
    ("x-content-type-options", "nosniff"),
    ("referrer-policy", "no-referrer"),
    (
        "content-security-policy",
        "default-src 'none'; frame-ancestors 'none'",
    ),
    ("cross-origin-opener-policy", "same-origin"),
];

/// Responses carry bearer-token data; handlers may still opt into caching.
const DEFAULT_CACHE_CONTROL: &str = "no-store, max-age=0";

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    harden(response.headers_mut());
    response
}

fn harden(headers: &mut HeaderMap) {
    for (name, value) in FIXED {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }
    headers
        .entry(header::CACHE_CONTROL)
        .or_insert(HeaderValue::from_static(DEFAULT_CACHE_CONTROL));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harden_keeps_handler_cache_control() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("public, max-age=60"));
        headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
        harden(&mut headers);

        assert_eq!(headers[header::CACHE_CONTROL], "public, max-age=60");
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers["cross-origin-opener-policy"], "same-origin");
    }

    #[test]
    fn test_harden_defaults_to_no_store() {
        let mut headers = HeaderMap::new();
        harden(&mut headers);
        assert_eq!(headers[header::CACHE_CONTROL], DEFAULT_CACHE_CONTROL);
        assert_eq!(headers.len(), FIXED.len() + 1);
    }
}
