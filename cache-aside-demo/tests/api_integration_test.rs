//! Integration tests for the demo API server

use cache_aside::{InterceptorConfig, Properties};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;

use cache_aside_demo::api::{ApiServer, ApiServerConfig};

/// Test helper to start the API server in the background
async fn start_test_server(port: u16) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let config = ApiServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            store_timeout: Duration::from_millis(250),
            redis_url: None,
            interceptor: InterceptorConfig::default(),
            properties: Properties::new().with("app.cache.prefix", "test:"),
        };

        let server = ApiServer::new(config);
        let _ = server.start().await;
    })
}

async fn repository_queries(client: &Client, port: u16) -> u64 {
    let body: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/demo/stats", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    body["repository_queries"].as_u64().unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let port = 8091;

    // Start server
    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .get(format!("http://127.0.0.1:{}/health", port))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_user_lookup_served_from_cache() {
    let port = 8092;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    for _ in 0..3 {
        let response = client
            .get(format!("http://127.0.0.1:{}/demo/users/1001", port))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["name"], "dave");
    }

    assert_eq!(repository_queries(&client, port).await, 1);

    let stats: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/demo/stats", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["cache"]["hits"], 2);
    assert_eq!(stats["cache"]["misses"], 1);
}

#[tokio::test]
async fn test_uncached_route_always_queries() {
    let port = 8093;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    for _ in 0..2 {
        let response = client
            .get(format!("http://127.0.0.1:{}/demo/users/1/uncached", port))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(repository_queries(&client, port).await, 2);
}

#[tokio::test]
async fn test_missing_user() {
    let port = 8094;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    for _ in 0..2 {
        let response = client
            .get(format!("http://127.0.0.1:{}/demo/users/404", port))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    // second lookup answered by the empty marker
    assert_eq!(repository_queries(&client, port).await, 1);
}

#[tokio::test]
async fn test_search_force_refresh() {
    let port = 8095;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let url = format!("http://127.0.0.1:{}/demo/search", port);

    let response = client
        .post(&url)
        .json(&json!({ "city": "shanghai" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["total"], 2);

    client
        .post(&url)
        .json(&json!({ "city": "shanghai" }))
        .send()
        .await
        .unwrap();
    assert_eq!(repository_queries(&client, port).await, 1);

    let response = client
        .post(&url)
        .json(&json!({ "city": "shanghai", "forceRefresh": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(repository_queries(&client, port).await, 2);
}

#[tokio::test]
async fn test_search_without_filter() {
    let port = 8096;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let response = client
        .post(format!("http://127.0.0.1:{}/demo/search", port))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_evicts_cached_user() {
    let port = 8097;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let user_url = format!("http://127.0.0.1:{}/demo/users/2", port);

    client.get(&user_url).send().await.unwrap();
    client
        .get(format!("http://127.0.0.1:{}/demo/profile/2", port))
        .send()
        .await
        .unwrap();

    let response = client
        .put(&user_url)
        .json(&json!({ "name": "robert", "city": "beijing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = client
        .get(&user_url)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "robert");

    let body: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/demo/profile/2", port))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["name"], "robert");

    assert_eq!(repository_queries(&client, port).await, 4);
}

#[tokio::test]
async fn test_concurrent_requests_share_one_entry() {
    let port = 8098;

    let _server_handle = start_test_server(port).await;
    sleep(Duration::from_secs(1)).await;

    let client = Client::new();
    let url = format!("http://127.0.0.1:{}/demo/users/3", port);

    // warm the entry, then fan out
    client.get(&url).send().await.unwrap();
    let responses =
        futures::future::join_all((0..8).map(|_| client.get(&url).send())).await;
    for response in responses {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }

    assert_eq!(repository_queries(&client, port).await, 1);
}
