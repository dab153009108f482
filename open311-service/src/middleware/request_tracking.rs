//! Request id generation, propagation, and sensitive header masking

use http::HeaderName;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    sensitive_headers::SetSensitiveRequestHeadersLayer,
};

use crate::config::RequestTrackingConfig;
use crate::ids::MakeTypedRequestId;

/// Header used when none is configured or the configured one is invalid
pub const DEFAULT_REQUEST_ID_HEADER: &str = "x-request-id";

/// Sensitive headers that should be masked in logs
pub const SENSITIVE_HEADERS: &[&str] = &[
    "authorization",
    "cookie",
    "set-cookie",
    "x-api-key",
    "x-auth-token",
];

/// Resolve the configured request id header name
pub fn request_id_header(config: &RequestTrackingConfig) -> HeaderName {
    HeaderName::try_from(config.request_id_header.as_str()).unwrap_or_else(|_| {
        tracing::warn!(
            header = %config.request_id_header,
            "Invalid request id header name, using {}",
            DEFAULT_REQUEST_ID_HEADER
        );
        HeaderName::from_static(DEFAULT_REQUEST_ID_HEADER)
    })
}

/// Create a request ID layer that generates type-safe request IDs.
///
/// Ids use the TypeID format with a "req" prefix and UUIDv7, e.g.
/// `req_01h455vb4pex5vsknk084sn02q`. Requests that already carry the header
/// keep their id.
pub fn request_id_layer(config: &RequestTrackingConfig) -> SetRequestIdLayer<MakeTypedRequestId> {
    SetRequestIdLayer::new(request_id_header(config), MakeTypedRequestId)
}

/// Copy the request id onto the response
pub fn request_id_propagation_layer(config: &RequestTrackingConfig) -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(request_id_header(config))
}

/// Create a sensitive headers layer
pub fn sensitive_headers_layer() -> SetSensitiveRequestHeadersLayer {
    let headers = SENSITIVE_HEADERS
        .iter()
        .map(|h| HeaderName::from_static(h))
        .collect::<Vec<_>>();

    SetSensitiveRequestHeadersLayer::new(headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configured_header_used() {
        let config = RequestTrackingConfig {
            request_id_header: "x-correlation-id".to_string(),
            ..RequestTrackingConfig::default()
        };
        assert_eq!(request_id_header(&config).as_str(), "x-correlation-id");
    }

    #[test]
    fn test_invalid_header_falls_back() {
        let config = RequestTrackingConfig {
            request_id_header: "bad header\n".to_string(),
            ..RequestTrackingConfig::default()
        };
        assert_eq!(request_id_header(&config).as_str(), DEFAULT_REQUEST_ID_HEADER);
    }

    #[test]
    fn test_sensitive_headers_constant() {
        assert!(SENSITIVE_HEADERS.contains(&"authorization"));
        assert!(SENSITIVE_HEADERS.contains(&"x-api-key"));
    }
}
