use super::*;
use std::time::Duration;
use stockwatch_bot::scheduler::ScanPhase;
use stockwatch_bot::AppError;
use tokio::sync::watch;

#[tokio::test]
async fn test_first_scan_announces_every_product() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_listing(&shop, shop_page(&[("Ryzen 7 5800X", "449,00 €", true), ("Radeon RX 6800", "579,00 €", false)])).await;
    mount_send_message(&telegram).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(1001, "Ada").await.unwrap();
    context.subscribers.subscribe(1002, "Grace").await.unwrap();

    let report = create_test_scanner(&context).run_cycle().await.unwrap();

    assert!(report.changed());
    assert_eq!(report.products, 2);
    assert_eq!(report.dispatch.as_ref().unwrap().delivered, 2);

    let messages = sent_messages(&telegram).await;
    assert_eq!(messages.len(), 2);
    let text = &messages[0].1;
    assert!(text.starts_with("Products that were added to the store:\n - Radeon RX 6800\n - Ryzen 7 5800X\n"));
    assert!(text.contains("Products that became available for purchase:\n - Ryzen 7 5800X\n"));
    assert!(text.contains("Products that are no longer available for purchase:\n - Radeon RX 6800\n"));
    assert!(text.contains(&format!("    Product Page: {}/de/product/0\n", shop.uri())));

    let stored = context.snapshots.load().await.unwrap();
    assert!(stored.get("Ryzen 7 5800X").unwrap().available);
    assert!(!stored.get("Radeon RX 6800").unwrap().available);
}

#[tokio::test]
async fn test_second_scan_reports_only_the_delta() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(1001, "Ada").await.unwrap();
    let scanner = create_test_scanner(&context);

    mount_listing(&shop, shop_page(&[("A", "100 €", true), ("B", "50 €", false)])).await;
    scanner.run_cycle().await.unwrap();

    // A gets cheaper and sells out, B disappears, C shows up
    mount_listing(&shop, shop_page(&[("A", "90 €", false), ("C", "10 €", true)])).await;
    let report = scanner.run_cycle().await.unwrap();

    assert_eq!(report.diff.newly_listed.iter().collect::<Vec<_>>(), vec!["C"]);
    assert_eq!(report.diff.delisted.iter().collect::<Vec<_>>(), vec!["B"]);
    assert!(report.diff.became_unavailable.contains("A"));
    assert_eq!(report.diff.price_changed["A"].previous, "100 €");

    let messages = sent_messages(&telegram).await;
    let text = &messages.last().unwrap().1;
    assert!(text.contains("Products that were removed from the store:\n - B\n"));
    assert!(text.contains(" - A Was: 100 € Now: 90 €\n"));
}

#[tokio::test]
async fn test_repeat_scan_without_changes_is_silent() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("A", "100 €", true)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(1001, "Ada").await.unwrap();
    let scanner = create_test_scanner(&context);

    scanner.run_cycle().await.unwrap();
    let report = scanner.run_cycle().await.unwrap();

    assert!(!report.changed());
    assert!(report.dispatch.is_none());
    assert_eq!(sent_messages(&telegram).await.len(), 1);
}

#[tokio::test]
async fn test_unreachable_page_keeps_stored_snapshot() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(1001, "Ada").await.unwrap();
    let scanner = create_test_scanner(&context);

    mount_listing(&shop, shop_page(&[("A", "100 €", true)])).await;
    scanner.run_cycle().await.unwrap();
    let before = context.snapshots.load().await.unwrap();

    shop.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&shop)
        .await;

    let result = scanner.run_cycle().await;

    assert!(matches!(result, Err(AppError::Fetch { .. })));
    assert_eq!(context.snapshots.load().await.unwrap(), before);
    assert_eq!(sent_messages(&telegram).await.len(), 1);
}

#[tokio::test]
async fn test_blocked_subscriber_does_not_stop_others() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/sendMessage", TEST_TOKEN)))
        .and(wiremock::matchers::body_partial_json(json!({"chat_id": 1001})))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "ok": false,
            "error_code": 403,
            "description": "Forbidden: bot was blocked by the user"
        })))
        .mount(&telegram)
        .await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("A", "100 €", true)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.subscribers.subscribe(1001, "Ada").await.unwrap();
    context.subscribers.subscribe(1002, "Grace").await.unwrap();

    let report = create_test_scanner(&context).run_cycle().await.unwrap();
    let dispatch = report.dispatch.unwrap();

    assert_eq!(dispatch.delivered, 1);
    assert_eq!(dispatch.failed.len(), 1);
    assert_eq!(dispatch.failed[0].recipient, 1001);
    assert!(report.persisted);
}

#[tokio::test]
async fn test_scanner_loop_runs_until_shutdown() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("A", "100 €", true)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    let scanner = create_test_scanner(&context);
    let stats = scanner.stats();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(async move { scanner.run(shutdown_rx).await });

    // Interval is one second; wait for the second cycle
    for _ in 0..100 {
        if stats.read().await.run_count >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    let stats = stats.read().await;
    assert!(stats.run_count >= 2);
    assert_eq!(stats.error_count, 0);
    assert_eq!(stats.changes_detected, 1);
    assert_eq!(stats.phase, ScanPhase::Stopped);
}
