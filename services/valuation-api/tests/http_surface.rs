use propval_core::ServiceConfig;
use serde_json::{json, Value};
use std::net::SocketAddr;
use valuation_api::{cors_layer, router, AppState};

async fn serve(state: AppState) -> SocketAddr {
    let app = router(state).layer(cors_layer(&["*".into()]));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

#[tokio::test]
async fn tagged_errors_travel_with_ok_status() {
    let addr = serve(AppState::new(ServiceConfig::default(), None, None)).await;
    let client = reqwest::Client::new();

    let resp = client.post(format!("http://{addr}/predict")).json(&json!({"features": {}})).send().await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"error": "model_not_ready"}));

    let resp = client.get(format!("http://{addr}/rppi/history?region=Sydney")).send().await.unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"error": "rppi_unavailable"}));

    let resp = client.get(format!("http://{addr}/health")).send().await.unwrap();
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"status": "ok", "model_ready": false, "num_columns": 0}));
}

#[tokio::test]
async fn malformed_bodies_are_rejected_by_the_extractor() {
    let addr = serve(AppState::new(ServiceConfig::default(), None, None)).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/forecast"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn wildcard_cors_answers_any_origin() {
    let addr = serve(AppState::new(ServiceConfig::default(), None, None)).await;
    let resp = reqwest::Client::new()
        .get(format!("http://{addr}/columns"))
        .header("origin", "http://localhost:5173")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers().get("access-control-allow-origin").unwrap(), "*");
    assert_eq!(resp.json::<Value>().await.unwrap(), json!({"columns": []}));
}
