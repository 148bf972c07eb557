use crate::config::parse_bool_env;
use axum::{
    extract::Request,
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::{env, sync::OnceLock};

const DEFAULT_CSP_POLICY: &str = "default-src 'self'; base-uri 'self'; frame-ancestors 'none'; object-src 'none'; img-src 'self' data:; style-src 'self' 'unsafe-inline'";
const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Headers added to every response, resolved once from the environment.
struct SecurityHeaders(Vec<(HeaderName, HeaderValue)>);

impl SecurityHeaders {
    fn from_env() -> Self {
        let raw_csp = env::var("CSP_POLICY").unwrap_or_else(|_| DEFAULT_CSP_POLICY.to_string());
        let csp = HeaderValue::from_str(&raw_csp).unwrap_or_else(|err| {
            tracing::warn!("Invalid CSP_POLICY value ({}), using default policy", err);
            HeaderValue::from_static(DEFAULT_CSP_POLICY)
        });
        Self::build(csp, parse_bool_env("ENABLE_HSTS", true))
    }

    fn build(csp: HeaderValue, enable_hsts: bool) -> Self {
        let mut headers = vec![
            (header::CONTENT_SECURITY_POLICY, csp),
            (
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            ),
            (header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY")),
            (
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            ),
        ];
        if enable_hsts {
            headers.push((
                header::STRICT_TRANSPORT_SECURITY,
                HeaderValue::from_static(HSTS_VALUE),
            ));
        }
        Self(headers)
    }
}

fn security_headers() -> &'static SecurityHeaders {
    static HEADERS: OnceLock<SecurityHeaders> = OnceLock::new();
    HEADERS.get_or_init(SecurityHeaders::from_env)
}

pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in &security_headers().0 {
        headers.insert(name.clone(), value.clone());
    }
    response
}
