use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use stockwatch_bot::web::create_router;
use tower::ServiceExt;

async fn get_json(context: &AppContext, uri: &str) -> (StatusCode, serde_json::Value) {
    let response = create_router(context.clone())
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_status_after_scan() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("A", "1 €", true), ("B", "2 €", false)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(7, "Ada").await.unwrap();
    create_test_scanner(&context).run_cycle().await.unwrap();

    let (status, body) = get_json(&context, "/api/v1/status").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["products"], 2);
    assert_eq!(body["data"]["subscribers"], 1);
    assert_eq!(body["data"]["scanner"]["run_count"], 1);
    assert_eq!(body["data"]["scanner"]["success_count"], 1);
    assert_eq!(body["data"]["scanner"]["notifications_sent"], 1);
    assert!(body["data"]["scanner"]["last_run"].is_string());
    assert!(body["data"]["scanner"]["last_fetch_ms"].is_u64());
    assert!(body["data"]["scanner"]["last_cycle_ms"].is_u64());
}

#[tokio::test]
async fn test_products_after_scan() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("A", "1 €", true)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    create_test_scanner(&context).run_cycle().await.unwrap();

    let (status, body) = get_json(&context, "/api/v1/products").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["A"]["price"], "1 €");
    assert_eq!(body["data"]["A"]["page_url"], format!("{}/de/product/0", shop.uri()));
}

#[tokio::test]
async fn test_failed_scan_is_visible_in_status() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_listing(&shop, "<html><body><p>Queue active, please wait</p></body></html>".to_string()).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    assert!(create_test_scanner(&context).run_cycle().await.is_err());

    let (_, body) = get_json(&context, "/api/v1/status").await;

    assert_eq!(body["data"]["scanner"]["error_count"], 1);
    assert!(body["data"]["scanner"]["last_error"]
        .as_str()
        .unwrap()
        .contains("Extraction error"));
}
