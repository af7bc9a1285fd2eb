use bytes::Bytes;
use http::header::{CONTENT_TYPE, HOST};
use http::{Method, StatusCode};
use serde_json::json;
use snare::prelude::*;
use std::sync::Arc;

fn request(method: Method, uri: &str) -> HttpRequest {
    http::Request::builder()
        .method(method)
        .uri(uri)
        .header(HOST, "proxy.local")
        .body(Bytes::new())
        .unwrap()
}

/// Upstream answering with the authority it was asked to reach.
fn upstream() -> ScriptedTransport {
    ScriptedTransport::new().on(REMOTE, |req: HttpRequest| {
        let authority = req.uri().authority().map(|a| a.to_string()).unwrap_or_default();
        Ok(text(format!("{authority}{}", req.uri().path())))
    })
}

/// Mocks under `/mock`, blocks DELETE, forwards the rest to the configured target.
fn template() -> HttpFlow {
    let root = HttpFlow::new("proxy");
    root.respond_when(path_starts_with("/mock"), text("mocked"));
    root.respond_when(has_method(Method::DELETE), status(StatusCode::FORBIDDEN));
    root.transform(Rewriting(SetResponseHeader::new(
        http::header::HeaderName::from_static("via"),
        http::header::HeaderValue::from_static("snare"),
    )))
    .transform(ForwardToTarget)
    .then_pass_through();
    root
}

#[tokio::test]
async fn test_mock_block_and_forward() {
    let binder = Arc::new(Binder::new(template()));
    let proxy = ProxyInstance::new(binder.clone(), Parameters::new("orders.internal", 8443));
    let engine = Engine::new(upstream());

    let mocked = proxy.handle(&engine, &request(Method::GET, "/mock/users")).await.unwrap();
    assert_eq!(mocked.body(), "mocked");

    let blocked = proxy.handle(&engine, &request(Method::DELETE, "/orders/1")).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::FORBIDDEN);

    let forwarded = proxy.handle(&engine, &request(Method::GET, "/orders/1")).await.unwrap();
    assert_eq!(forwarded.body(), "orders.internal:8443/orders/1");
    assert_eq!(forwarded.headers()["via"], "snare");

    assert_eq!(engine.transport().call_count(), 1);
}

#[tokio::test]
async fn test_instances_share_template_but_not_parameters() {
    let binder = Arc::new(Binder::new(template()));
    let eu = ProxyInstance::new(binder.clone(), Parameters::new("eu.internal", 80));
    let us = ProxyInstance::new(binder.clone(), Parameters::new("us.internal", 80));
    let engine = Engine::new(upstream());
    let req = request(Method::GET, "/health");

    let (a, b) = tokio::join!(eu.handle(&engine, &req), us.handle(&engine, &req));
    assert_eq!(a.unwrap().body(), "eu.internal:80/health");
    assert_eq!(b.unwrap().body(), "us.internal:80/health");
    assert_eq!(binder.len(), 2);
    assert!(binder.template().parameters().is_none());
}

#[tokio::test]
async fn test_template_without_parameters_is_unhandled() {
    let engine = Engine::new(upstream());
    let err = engine
        .run(&template(), &request(Method::GET, "/orders"))
        .await
        .unwrap_err();
    assert!(err.is_unhandled());
    assert_eq!(engine.transport().call_count(), 0);
}

#[tokio::test]
async fn test_json_mock_by_body_and_content_type() {
    let root = HttpFlow::new("api");
    root.when(content_type_contains("json"))
        .when(body_contains("\"op\":\"ping\""))
        .then_try_respond(|_| Ok(json(&json!({"op": "pong"}))?));
    let engine = Engine::new(ScriptedTransport::new());

    let req = http::Request::builder()
        .uri("/rpc")
        .header(CONTENT_TYPE, "application/json")
        .body(Bytes::from_static(br#"{"op":"ping"}"#))
        .unwrap();
    let res = engine.run(&root, &req).await.unwrap();
    assert_eq!(res.body(), r#"{"op":"pong"}"#);
}

#[test]
fn test_schematic_export() {
    let schematic = template().schematic();
    let doc = schematic.to_json();
    assert_eq!(doc["name"], "proxy");
    assert_eq!(schematic.count(snare::core::NodeKind::Transform), 2);
    assert_eq!(schematic.count(snare::core::NodeKind::Guard), 2);
    assert_eq!(schematic.count(snare::core::NodeKind::PassThrough), 1);
}
