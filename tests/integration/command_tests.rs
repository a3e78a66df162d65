use super::*;
use std::time::Duration;
use stockwatch_bot::bot::{BotCommand, Caller, CommandHandler, UpdatePoller};
use stockwatch_bot::models::{ProductListing, Snapshot};
use tokio::sync::watch;

fn command_update(update_id: i64, user_id: i64, first_name: &str, text: &str) -> serde_json::Value {
    json!({
        "update_id": update_id,
        "message": {
            "message_id": update_id,
            "from": {"id": user_id, "is_bot": false, "first_name": first_name},
            "chat": {"id": user_id, "type": "private"},
            "date": 1700000000,
            "text": text
        }
    })
}

fn create_handler(context: &AppContext) -> CommandHandler {
    CommandHandler::new(
        context.subscribers.clone(),
        context.snapshots.clone(),
        context.config.scraper.url.clone(),
    )
}

#[tokio::test]
async fn test_subscribe_unsubscribe_round_trip() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    let handler = create_handler(&context);
    let caller = Caller {
        id: 31337,
        first_name: "Linus".to_string(),
    };

    handler.handle(BotCommand::Subscribe, &caller).await;
    assert_eq!(context.subscribers.count().await.unwrap(), 1);

    let again = handler.handle(BotCommand::Subscribe, &caller).await;
    assert!(again.starts_with("You are already subscribed!"));
    assert_eq!(context.subscribers.count().await.unwrap(), 1);

    handler.handle(BotCommand::Unsubscribe, &caller).await;
    handler.handle(BotCommand::Unsubscribe, &caller).await;
    assert_eq!(context.subscribers.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_current_reflects_last_scan() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    mount_send_message(&telegram).await;
    mount_listing(&shop, shop_page(&[("Ryzen 5 5600X", "299,00 €", true), ("Radeon RX 6700 XT", "479,00 €", false)])).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    create_test_scanner(&context).run_cycle().await.unwrap();

    let caller = Caller {
        id: 1,
        first_name: "Ada".to_string(),
    };
    let reply = create_handler(&context).handle(BotCommand::Current, &caller).await;

    let available_at = reply.find(" - Ryzen 5 5600X").unwrap();
    let unavailable_header = reply.find("Products listed but not available for purchase:").unwrap();
    let unavailable_at = reply.find(" - Radeon RX 6700 XT").unwrap();
    assert!(available_at < unavailable_header);
    assert!(unavailable_header < unavailable_at);
}

#[tokio::test]
async fn test_current_with_empty_store() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    context.snapshots.save(&Snapshot::new()).await.unwrap();

    let caller = Caller {
        id: 1,
        first_name: "Ada".to_string(),
    };
    let reply = create_handler(&context).handle(BotCommand::Current, &caller).await;

    assert!(reply.starts_with("Products currently available for purchase at"));
    assert!(!reply.contains(" - "));
}

#[tokio::test]
async fn test_poller_answers_commands_and_ignores_chatter() {
    let shop = MockServer::start().await;
    let telegram = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/getUpdates", TEST_TOKEN)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ok": true,
            "result": [
                command_update(1, 501, "Ada", "/subscribe"),
                command_update(2, 502, "Grace", "hello there"),
                command_update(3, 503, "Linus", "/help@some_other_bot"),
                command_update(4, 504, "Ken", "/help"),
            ]
        })))
        .up_to_n_times(1)
        .mount(&telegram)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/bot{}/getUpdates", TEST_TOKEN)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true, "result": []}))
                .set_delay(Duration::from_millis(50)),
        )
        .mount(&telegram)
        .await;
    mount_send_message(&telegram).await;

    let context = create_test_context(get_test_config(&shop, &telegram)).await;
    let poller = UpdatePoller::new(
        create_test_telegram(&context),
        create_handler(&context),
        Some("stockwatch_bot".to_string()),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = tokio::spawn(poller.run(shutdown_rx));

    for _ in 0..100 {
        if sent_messages(&telegram).await.len() >= 2 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown_tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    let mut recipients: Vec<i64> = sent_messages(&telegram).await.into_iter().map(|(chat, _)| chat).collect();
    recipients.sort();
    assert_eq!(recipients, vec![501, 504]);
    assert_eq!(context.subscribers.list().await.unwrap()[0].name, "Ada");

    // Later polls acknowledge the processed updates
    let requests = telegram.received_requests().await.unwrap();
    let acknowledged = requests
        .iter()
        .filter(|request| request.url.path().ends_with("/getUpdates"))
        .filter_map(|request| serde_json::from_slice::<serde_json::Value>(&request.body).ok())
        .any(|body| body["offset"] == 5);
    assert!(acknowledged);
}
