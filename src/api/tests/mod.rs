use super::*;
use crate::config::{Protocol, ServiceConfig};
use crate::error::DeliveryError;
use crate::ping::PingTransport;
use crate::types::{PingAck, PingMethod, PingTarget};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tower::ServiceExt;


/// Transport that always answers the same way and counts calls
struct StubTransport {
    method: PingMethod,
    accept: bool,
    calls: AtomicUsize,
}

impl StubTransport {
    fn accepting(method: PingMethod) -> Arc<Self> {
        Arc::new(Self {
            method,
            accept: true,
            calls: AtomicUsize::new(0),
        })
    }

    fn refusing(method: PingMethod) -> Arc<Self> {
        Arc::new(Self {
            method,
            accept: false,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PingTransport for StubTransport {
    async fn ping(
        &self,
        _: &PingTarget,
        _: Duration,
    ) -> std::result::Result<PingAck, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.accept {
            Ok(PingAck {
                message: "Thanks for the ping!".into(),
                status: Some(200),
            })
        } else {
            Err(DeliveryError::Rejected {
                status: 403,
                message: "Forbidden".into(),
            })
        }
    }

    fn method(&self) -> PingMethod {
        self.method
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.feed.public_base_url = "https://ping.example.com".into();
    config.api.swagger_ui = false;
    config
}

/// Router wired to a hub and an XML-RPC stub
fn test_app(
    config: Config,
    hub: Arc<StubTransport>,
    rpc: Arc<StubTransport>,
) -> Router {
    let dispatcher = PingDispatcher::with_services(
        &config,
        vec![
            (
                ServiceConfig::new("hub", "https://hub.example.com/", Protocol::WebSub),
                hub as Arc<dyn PingTransport>,
            ),
            (
                ServiceConfig::new("rpc", "https://rpc.example.com/", Protocol::XmlRpc),
                rpc as Arc<dyn PingTransport>,
            ),
        ],
    );
    create_router(Arc::new(dispatcher), Arc::new(config))
}

fn default_app() -> Router {
    test_app(
        test_config(),
        StubTransport::accepting(PingMethod::WebSub),
        StubTransport::accepting(PingMethod::XmlRpc),
    )
}

fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let mut config = test_config();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap(); // Port 0 = OS assigns a free port
    let config = Arc::new(config);
    let dispatcher = Arc::new(PingDispatcher::with_services(&config, Vec::new()));

    let api_handle = tokio::spawn(start_api_server(dispatcher, config));

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let app = default_app();

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let mut config = test_config();
    config.api.cors_enabled = false;
    let app = test_app(
        config,
        StubTransport::accepting(PingMethod::WebSub),
        StubTransport::accepting(PingMethod::XmlRpc),
    );

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_swagger_ui_mounted_when_enabled() {
    let mut config = test_config();
    config.api.swagger_ui = true;
    let app = test_app(
        config,
        StubTransport::accepting(PingMethod::WebSub),
        StubTransport::accepting(PingMethod::XmlRpc),
    );

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
