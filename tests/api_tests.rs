mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use futures_util::StreamExt;
use std::time::Duration;
use tower::ServiceExt;

use polytrack::api::router::create_router;
use polytrack::api::ws_types::{TradeAlertData, WsMessage};
use polytrack::config::AppConfig;
use polytrack::tracking::WalletMonitor;
use polytrack::AppState;

use common::{trade, FakeTradeSource, WALLET_A, WALLET_B};

fn build_test_app(api_token: Option<&str>) -> (axum::Router, WalletMonitor) {
    let source = FakeTradeSource::new();
    source.set(WALLET_A, vec![trade("seed", 100)]);
    let monitor = WalletMonitor::new(source);
    let (ws_tx, _) = tokio::sync::broadcast::channel::<WsMessage>(16);

    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        api_token: api_token.map(Into::into),
        ..AppConfig::default()
    };

    let state = AppState {
        config,
        monitor: monitor.clone(),
        ws_tx,
        metrics_handle: polytrack::metrics::detached_handle(),
    };

    (create_router(state), monitor)
}

async fn send(app: &axum::Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let resp = app.clone().oneshot(request).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn track_request(subscriber: i64, address: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(format!("/api/subscribers/{subscriber}/wallets"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::json!({ "address": address }).to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, monitor) = build_test_app(None);
    monitor.track(1, WALLET_A).await.unwrap();

    let (status, json) = send(&app, get("/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["tracked_wallets"], 1);
    assert_eq!(json["subscribers"], 1);
}

#[tokio::test]
async fn test_track_list_untrack_flow() {
    let (app, monitor) = build_test_app(None);
    let mixed_case = "0xAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaaAAAAaaaa";

    let (status, json) = send(&app, track_request(42, mixed_case)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["data"]["wallet"], WALLET_A);
    assert_eq!(json["data"]["already_tracked"], false);

    // Seeded from the current snapshot.
    let state = monitor.state_of(WALLET_A).await.unwrap();
    assert_eq!(state.high_water_mark().timestamp(), 100);

    let (_, json) = send(&app, track_request(42, WALLET_A)).await;
    assert_eq!(json["data"]["already_tracked"], true);

    send(&app, track_request(42, WALLET_B)).await;
    let (status, json) = send(&app, get("/api/subscribers/42/wallets")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], serde_json::json!([WALLET_A, WALLET_B]));

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/subscribers/42/wallets/{mixed_case}"))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, delete).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["wallet"], WALLET_A);

    let (_, json) = send(&app, get("/api/subscribers/42/wallets")).await;
    assert_eq!(json["data"], serde_json::json!([WALLET_B]));
}

#[tokio::test]
async fn test_untrack_unknown_pair_is_not_found() {
    let (app, _monitor) = build_test_app(None);

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/subscribers/7/wallets/{WALLET_B}"))
        .body(Body::empty())
        .unwrap();
    let (status, json) = send(&app, delete).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn test_malformed_address_is_bad_request() {
    let (app, monitor) = build_test_app(None);

    let (status, json) = send(&app, track_request(1, "0x123")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().contains("invalid wallet address"));

    let delete = Request::builder()
        .method("DELETE")
        .uri("/api/subscribers/1/wallets/not-an-address")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, delete).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(monitor.wallet_count().await, 0);
}

#[tokio::test]
async fn test_list_for_unknown_subscriber_is_empty() {
    let (app, _monitor) = build_test_app(None);

    let (status, json) = send(&app, get("/api/subscribers/999/wallets")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"], serde_json::json!([]));
}

#[tokio::test]
async fn test_auth_required_when_token_configured() {
    let (app, _monitor) = build_test_app(Some("s3cret"));

    let (status, _) = send(&app, get("/api/subscribers/1/wallets")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/api/subscribers/1/wallets")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, wrong).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let authorized = Request::builder()
        .uri("/api/subscribers/1/wallets")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, authorized).await;
    assert_eq!(status, StatusCode::OK);

    // Health stays public.
    let (status, _) = send(&app, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_metrics_endpoint_is_plain_text() {
    let (app, _monitor) = build_test_app(None);

    let resp = app.oneshot(get("/metrics")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let content_type = resp.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/plain"));
}

#[tokio::test]
async fn test_ws_feed_streams_trade_alerts() {
    let (ws_tx, _) = tokio::sync::broadcast::channel::<WsMessage>(16);
    let state = AppState {
        config: AppConfig::default(),
        monitor: WalletMonitor::new(FakeTradeSource::new()),
        ws_tx: ws_tx.clone(),
        metrics_handle: polytrack::metrics::detached_handle(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws"))
        .await
        .unwrap();
    let (mut filtered, _) =
        tokio_tungstenite::connect_async(format!("ws://{addr}/ws?wallet={WALLET_B}"))
            .await
            .unwrap();

    let alert = WsMessage::TradeAlert(TradeAlertData {
        wallet: WALLET_A.into(),
        trade: trade("0xfeed", 1_718_000_000),
        notional: "92.5".into(),
        subscribers: 2,
    });

    // The server subscribes after the upgrade, so resend until one arrives.
    let mut received = None;
    for _ in 0..40 {
        let _ = ws_tx.send(alert.clone());
        if let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(50), socket.next()).await {
            received = Some(msg.unwrap());
            break;
        }
    }

    let text = received.expect("no alert received").into_text().unwrap();
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["type"], "trade_alert");
    assert_eq!(json["data"]["wallet"], WALLET_A);
    assert_eq!(json["data"]["trade"]["transaction_hash"], "0xfeed");
    assert_eq!(json["data"]["subscribers"], 2);

    // A wallet-filtered client skips other wallets' alerts.
    let other = WsMessage::TradeAlert(TradeAlertData {
        wallet: WALLET_B.into(),
        trade: trade("0xb0b", 1_718_000_001),
        notional: "1".into(),
        subscribers: 1,
    });
    let mut received = None;
    for _ in 0..40 {
        let _ = ws_tx.send(alert.clone());
        let _ = ws_tx.send(other.clone());
        if let Ok(Some(msg)) = tokio::time::timeout(Duration::from_millis(50), filtered.next()).await
        {
            received = Some(msg.unwrap());
            break;
        }
    }
    let text = received.expect("no filtered alert received").into_text().unwrap();
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["data"]["wallet"], WALLET_B);
}
