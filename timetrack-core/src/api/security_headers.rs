//! # Embedding Security Headers
//!
//! Every response carries the header set a browser needs to safely host
//! this service inside a third-party iframe: a `frame-ancestors` allow-list
//! instead of a blanket `X-Frame-Options: DENY`, plus the usual hardening
//! headers. `X-Frame-Options` itself is omitted when the request's `Origin`
//! is on the configured allow-list, since that header only understands a
//! single value and would otherwise contradict the CSP directive.

use actix_web::{
    body::MessageBody,
    dev::{ServiceRequest, ServiceResponse},
    http::header::{HeaderName, HeaderValue, ORIGIN},
    middleware::Next,
    web, Error,
};

use crate::AppState;

pub async fn security_headers(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let allowed_hosts = req
        .app_data::<web::Data<AppState>>()
        .map(|state| state.config.embedding.allowed_hosts.clone())
        .unwrap_or_default();

    let origin_is_allowed = req
        .headers()
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|origin| allowed_hosts.iter().any(|host| host == origin))
        .unwrap_or(false);

    let mut response = next.call(req).await?;
    let headers = response.headers_mut();

    if !origin_is_allowed {
        headers.insert(
            HeaderName::from_static("x-frame-options"),
            HeaderValue::from_static("SAMEORIGIN"),
        );
    }

    let csp = if allowed_hosts.is_empty() {
        "frame-ancestors 'self'".to_string()
    } else {
        format!("frame-ancestors 'self' {}", allowed_hosts.join(" "))
    };
    if let Ok(value) = HeaderValue::from_str(&csp) {
        headers.insert(HeaderName::from_static("content-security-policy"), value);
    }

    headers.insert(HeaderName::from_static("x-content-type-options"), HeaderValue::from_static("nosniff"));
    headers.insert(HeaderName::from_static("referrer-policy"), HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(HeaderName::from_static("x-xss-protection"), HeaderValue::from_static("1; mode=block"));

    Ok(response)
}
