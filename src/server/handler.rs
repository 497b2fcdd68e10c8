// src/server/handler.rs
use crate::health::{HealthEndpoint, HealthStatus};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::Serialize;
use serde_json::json;
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use tracing::{debug, error, info_span, Instrument};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Serves `GET /health` and `GET /health/{name}`.
#[derive(Clone)]
pub struct RequestHandler {
    endpoint: Arc<HealthEndpoint>,
}

impl RequestHandler {
    pub fn new(endpoint: Arc<HealthEndpoint>) -> Self {
        Self { endpoint }
    }

    pub async fn handle(&self, req: Request<Body>) -> Response<Body> {
        let request_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        let mut response = self.route(req).instrument(span).await;
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, value);
        }
        response
    }

    async fn route(&self, req: Request<Body>) -> Response<Body> {
        if req.method() != Method::GET {
            return json_response(
                StatusCode::METHOD_NOT_ALLOWED,
                &json!({"message": "Method not allowed"}),
            );
        }

        let path = req.uri().path().trim_end_matches('/');
        let response = match path {
            "/health" => {
                let report = self.endpoint.report().await;
                json_response(status_code(report.status), &report)
            }
            _ => match path.strip_prefix("/health/") {
                Some(raw) => {
                    let name = decode_segment(raw);
                    match self.endpoint.check(&name).await {
                        Some(result) => json_response(status_code(result.status()), &result),
                        None => json_response(
                            StatusCode::NOT_FOUND,
                            &json!({"message": format!("Unknown health indicator '{}'", name)}),
                        ),
                    }
                }
                None => json_response(StatusCode::NOT_FOUND, &json!({"message": "Not Found"})),
            },
        };

        debug!("responded {}", response.status());
        response
    }
}

fn status_code(status: HealthStatus) -> StatusCode {
    match status {
        HealthStatus::Up => StatusCode::OK,
        HealthStatus::Down => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Percent-decodes a single path segment, e.g. `arangodb%20(cluster)`.
/// `+` is literal in a path.
fn decode_segment(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Body> {
    let bytes = match serde_json::to_vec(body) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(%e, "failed to serialize response");
            return internal_error();
        }
    };

    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(bytes))
        .unwrap_or_else(|e| {
            error!(%e, "failed to build response");
            internal_error()
        })
}

fn internal_error() -> Response<Body> {
    let mut response = Response::new(Body::from("Internal Server Error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

impl Service<Request<Body>> for RequestHandler {
    type Response = Response<Body>;
    type Error = Infallible;
    type Future = futures::future::BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &mut self,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let handler = self.clone();
        Box::pin(async move { Ok(handler.handle(req).await) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_segment() {
        assert_eq!(decode_segment("arangodb"), "arangodb");
        assert_eq!(decode_segment("arangodb%20(cluster)"), "arangodb (cluster)");
        assert_eq!(decode_segment("a+b"), "a+b");
        assert_eq!(decode_segment("a%26b%3Dc"), "a&b=c");
    }

    #[tokio::test]
    async fn test_plus_in_indicator_name_is_not_a_space() {
        let handler = RequestHandler::new(Arc::new(HealthEndpoint::default()));
        let req = Request::get("/health/arangodb+(cluster)").body(Body::empty()).unwrap();

        let response = handler.handle(req).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["message"], "Unknown health indicator 'arangodb+(cluster)'");
    }

    #[test]
    fn test_status_code_mapping() {
        assert_eq!(status_code(HealthStatus::Up), StatusCode::OK);
        assert_eq!(status_code(HealthStatus::Down), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let handler = RequestHandler::new(Arc::new(HealthEndpoint::default()));
        let req = Request::get("/status").body(Body::empty()).unwrap();

        let response = handler.handle(req).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key(REQUEST_ID_HEADER));
    }

    #[tokio::test]
    async fn test_post_is_rejected() {
        let handler = RequestHandler::new(Arc::new(HealthEndpoint::default()));
        let req = Request::post("/health").body(Body::empty()).unwrap();

        let response = handler.handle(req).await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_empty_health_is_ok() {
        let handler = RequestHandler::new(Arc::new(HealthEndpoint::default()));
        let req = Request::get("/health").body(Body::empty()).unwrap();

        let response = handler.handle(req).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = hyper::body::to_bytes(response.into_body()).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "UP");
    }
}
