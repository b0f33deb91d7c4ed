//! End-to-end routing tests against a running gateway.

use apigw_router::Shutdown;
use serde_json::Value;

mod common;

use common::{start_gateway, EchoBackend};

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_host_based_shapes() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;
    let host = format!("abc123.execute-api.localhost:{}", addr.port());

    let cases = [
        ("/", Value::Null, "/"),
        ("/prod/", Value::from("prod"), "/"),
        ("/prod/pets/1", Value::from("prod"), "/pets/1"),
    ];
    for (path, stage, invocation_path) in cases {
        let res = client()
            .get(format!("http://{}{}", addr, path))
            .header("Host", &host)
            .send()
            .await
            .expect("Gateway unreachable");
        assert_eq!(res.status(), 200, "{}", path);

        let body: Value = res.json().await.unwrap();
        assert_eq!(body["apiId"], "abc123");
        assert_eq!(body["stage"], stage);
        assert_eq!(body["invocationPath"], invocation_path);
        assert_eq!(body["region"], "us-east-1");
        assert_eq!(body["domainName"], "abc123.execute-api.localhost");
        assert_eq!(body["domainPrefix"], "abc123");
    }

    shutdown.trigger();
}

#[tokio::test]
async fn test_user_request_shapes() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .post(format!(
            "http://{}/restapis/abc123/dev/_user_request_/pets/1?limit=5&tag=x",
            addr
        ))
        .header("X-Forwarded-For", "203.0.113.7")
        .body("hello")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["stage"], "dev");
    assert_eq!(body["method"], "POST");
    assert_eq!(body["invocationPath"], "/pets/1");
    assert_eq!(body["pathWithQueryString"], "/pets/1?limit=5&tag=x");
    assert_eq!(body["queryParams"]["limit"], "5");
    assert_eq!(body["body"], "hello");
    assert_eq!(body["isBase64Encoded"], false);
    assert_eq!(
        body["forwardedFor"],
        format!("203.0.113.7, 127.0.0.1, {}", addr).as_str()
    );
    assert!(!body["requestId"].as_str().unwrap().is_empty());

    let res = client()
        .get(format!("http://{}/restapis/abc123/dev/_user_request_", addr))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["invocationPath"], "/");

    shutdown.trigger();
}

#[tokio::test]
async fn test_binary_body_is_base64() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .put(format!("http://{}/restapis/abc123/dev/_user_request_/upload", addr))
        .body(vec![0xffu8, 0x00, 0xfe])
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isBase64Encoded"], true);
    assert_eq!(body["body"], "/wD+");

    shutdown.trigger();
}

#[tokio::test]
async fn test_unknown_api_returns_404_without_invocation() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .get(format!("http://{}/prod/pets/1", addr))
        .header("Host", "zzz999.execute-api.us-east-1.amazonaws.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    let res = client()
        .get(format!("http://{}/restapis/zzz999/prod/_user_request_/pets", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(backend.invocation_count(), 0);

    shutdown.trigger();
}

#[tokio::test]
async fn test_unmatched_method_returns_404() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .get(format!("http://{}/restapis/abc123/prod/_user_request_/missing", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
    assert_eq!(backend.invocation_count(), 1);

    shutdown.trigger();
}

#[tokio::test]
async fn test_websocket_upgrade_detected() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .get(format!("http://{}/restapis/abc123/prod/_user_request_/chat", addr))
        .header("Upgrade", "WebSocket")
        .header("Connection", "Upgrade")
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["isWebsocket"], true);

    shutdown.trigger();
}

#[tokio::test]
async fn test_encoded_path_is_decoded_before_routing() {
    let backend = EchoBackend::new(&["abc123"]);
    let shutdown = Shutdown::new();
    let addr = start_gateway(backend.clone(), &shutdown).await;

    let res = client()
        .get(format!(
            "http://{}/restapis/abc123/dev/_user_request_/pets/a%20b?q=a%20b",
            addr
        ))
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["invocationPath"], "/pets/a b");
    assert_eq!(body["queryParams"]["q"], "a b");

    let res = client()
        .get(format!("http://{}/restapis/abc%31%323/dev/_user_request_", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["apiId"], "abc123");

    shutdown.trigger();
}
