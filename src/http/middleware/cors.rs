//! CORS middleware.
//! Answers preflight requests and echoes access-control headers.

use axum::{
    body::Body,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Methods advertised when the requested method is not readable text.
pub const DEFAULT_ALLOWED_METHODS: &str = "GET,DELETE,HEAD,PATCH,POST,PUT,OPTIONS";

const ACCESS_CONTROL_EXPOSE_HEADERS_REQUEST: &str = "access-control-expose-headers";

/// Access-control headers derived from one request.
#[derive(Debug, Clone)]
struct CorsHeaders {
    common: Vec<(HeaderName, HeaderValue)>,
    preflight_method: Option<HeaderValue>,
}

impl CorsHeaders {
    fn from_request(headers: &HeaderMap) -> Self {
        let present = |name: &str| {
            headers
                .get(name)
                .filter(|value| !value.as_bytes().trim_ascii().is_empty())
        };
        let echo = |name: &str| {
            present(name)
                .cloned()
                .unwrap_or_else(|| HeaderValue::from_static("*"))
        };

        let common = vec![
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                echo(header::ORIGIN.as_str()),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                echo(header::ACCESS_CONTROL_REQUEST_HEADERS.as_str()),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            ),
            (
                header::ACCESS_CONTROL_EXPOSE_HEADERS,
                echo(ACCESS_CONTROL_EXPOSE_HEADERS_REQUEST),
            ),
        ];

        // Blank Origin or Access-Control-Request-Method means no preflight.
        let preflight_method = present(header::ORIGIN.as_str())
            .and(present(header::ACCESS_CONTROL_REQUEST_METHOD.as_str()))
            .map(|method| match method.to_str() {
                Ok(_) => method.clone(),
                Err(_) => HeaderValue::from_static(DEFAULT_ALLOWED_METHODS),
            });

        Self {
            common,
            preflight_method,
        }
    }
}

/// Short-circuits preflight `OPTIONS` requests with a 204 and decorates every
/// other response with the common access-control headers.
pub async fn cors_middleware(request: Request<Body>, next: Next) -> Response {
    let cors = CorsHeaders::from_request(request.headers());

    if request.method() == Method::OPTIONS {
        if let Some(allow_methods) = cors.preflight_method {
            tracing::debug!(allow_methods = ?allow_methods, "Answering CORS preflight");
            let mut response = StatusCode::NO_CONTENT.into_response();
            let headers = response.headers_mut();
            for (name, value) in cors.common {
                headers.insert(name, value);
            }
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, allow_methods);
            headers.insert(header::VARY, HeaderValue::from_static("origin"));
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            return response;
        }
    }

    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    for (name, value) in cors.common {
        // Headers chosen by the handler take precedence.
        headers.entry(name).or_insert(value);
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{middleware::from_fn, routing::any, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/{*path}",
                any(|| async { ([("access-control-allow-origin", "https://handler.example")], "handled") }),
            )
            .route("/", any(|| async { "handled" }))
            .layer(from_fn(cors_middleware))
    }

    #[tokio::test]
    async fn test_preflight_short_circuits() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/widgets")
            .header("Origin", "http://a.com")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        let h = res.headers();
        assert_eq!(h["access-control-allow-methods"], "POST");
        assert_eq!(h["content-length"], "0");
        assert_eq!(h["vary"], "origin");
        assert_eq!(h["access-control-allow-origin"], "http://a.com");
        assert_eq!(h["access-control-allow-headers"], "*");
        assert_eq!(h["access-control-allow-credentials"], "true");
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_empty_requested_method_is_not_a_preflight() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header("Origin", "http://a.com")
            .header("Access-Control-Request-Method", "")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "http://a.com");
        assert!(res.headers().get("access-control-allow-methods").is_none());
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(body.as_ref(), b"handled");
    }

    #[tokio::test]
    async fn test_unreadable_requested_method_uses_default_list() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header("Origin", "http://a.com")
            .header(
                "Access-Control-Request-Method",
                HeaderValue::from_bytes(b"P\xffST").unwrap(),
            )
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);
        assert_eq!(res.headers()["access-control-allow-methods"], DEFAULT_ALLOWED_METHODS);
    }

    #[tokio::test]
    async fn test_empty_origin_is_answered_with_wildcard() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header("Origin", "")
            .header("Access-Control-Request-Method", "POST")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn test_options_without_preflight_headers_falls_through() {
        let req = Request::builder()
            .method(Method::OPTIONS)
            .uri("/")
            .header("Access-Control-Request-Headers", "x-token")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();

        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()["access-control-allow-origin"], "*");
        assert_eq!(res.headers()["access-control-allow-headers"], "x-token");
        assert!(res.headers().get("access-control-allow-methods").is_none());
        let body = axum::body::to_bytes(res.into_body(), 1024).await.unwrap();
        assert_eq!(body.as_ref(), b"handled");
    }

    #[tokio::test]
    async fn test_handler_headers_are_not_overwritten() {
        let req = Request::builder()
            .uri("/pets")
            .header("Origin", "http://a.com")
            .body(Body::empty())
            .unwrap();
        let res = app().oneshot(req).await.unwrap();
        assert_eq!(res.headers()["access-control-allow-origin"], "https://handler.example");
        assert_eq!(res.headers()["access-control-expose-headers"], "*");
    }
}
