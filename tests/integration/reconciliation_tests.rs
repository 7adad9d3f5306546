use wishlist_watcher::{AlertStatus, ItemStatus, ItemStore, ProductIdentifier};

use super::{RecordingNotifier, TestApp, mount_product, mount_status, product_page};

fn id(raw: &str) -> ProductIdentifier {
    ProductIdentifier::parse(raw).unwrap()
}

#[tokio::test]
async fn test_pass_updates_price_without_alert_above_threshold() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed("B07XJ8C8F5", 4999, 3000).await?;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$44.99").await;

    let report = app.reconciler().run_pass().await?;

    assert_eq!(report.items_checked, 1);
    assert_eq!(report.prices_updated, 1);
    assert_eq!(report.alerts_sent, 0);
    assert!(app.notifier.sent().is_empty());

    let stored = app.store.get(&id("B07XJ8C8F5")).await?.unwrap();
    assert_eq!(stored.price.to_string(), "44.99");
    assert!(stored.last_checked.is_some());
    Ok(())
}

#[tokio::test]
async fn test_price_drop_alerts_owner_once() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed("B07XJ8C8F5", 4999, 3000).await?;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$1,029.50 (List Price)").await;
    // A second item stays above its threshold
    app.seed("B000000002", 9999, 1000).await?;
    mount_product(&app.server, "B000000002", "Kindle", "$89.99").await;

    // Threshold of 30.00 against 1029.50 does not alert; lower the page price
    let report = app.reconciler().run_pass().await?;
    assert_eq!(report.alerts_sent, 0);
    assert_eq!(
        app.store.get(&id("B07XJ8C8F5")).await?.unwrap().price.to_string(),
        "1029.50"
    );

    app.server.reset().await;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$29.99").await;
    mount_product(&app.server, "B000000002", "Kindle", "$89.99").await;

    let report = app.reconciler().run_pass().await?;
    assert_eq!(report.alerts_sent, 1);

    let sent = app.notifier.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "alice@example.com");
    assert_eq!(sent[0].subject, "Wishlist Price Alert: Item B07XJ8C8F5");
    assert!(sent[0].body.contains("has fallen below your alert price: 30.00"));
    assert!(sent[0].body.contains("Current price: 29.99"));
    assert!(sent[0].body.contains("/dp/B07XJ8C8F5"));
    Ok(())
}

#[tokio::test]
async fn test_partial_failure_skips_only_failing_item() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    for identifier in ["B000000001", "B000000002", "B000000003", "B000000004"] {
        app.seed(identifier, 5000, 1000).await?;
    }
    mount_product(&app.server, "B000000001", "One", "$41.00").await;
    mount_status(&app.server, "B000000002", 503).await;
    mount_product(&app.server, "B000000003", "Three", "$43.00").await;
    mount_product(&app.server, "B000000004", "Four", "$44.00").await;

    let report = app.reconciler().run_pass().await?;

    assert_eq!(report.items_checked, 4);
    assert_eq!(report.prices_updated, 3);
    assert_eq!(report.fetch_failures, 1);
    assert!(matches!(
        report.outcome_for(&id("B000000002")).unwrap().status,
        ItemStatus::FetchFailed { .. }
    ));

    let failed = app.store.get(&id("B000000002")).await?.unwrap();
    assert_eq!(failed.price.to_string(), "50.00");
    assert!(failed.last_checked.is_none());

    for (identifier, price) in [("B000000001", "41.00"), ("B000000003", "43.00"), ("B000000004", "44.00")] {
        let stored = app.store.get(&id(identifier)).await?.unwrap();
        assert_eq!(stored.price.to_string(), price);
    }
    Ok(())
}

#[tokio::test]
async fn test_markup_change_is_extraction_failure() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed("B07XJ8C8F5", 4999, 1000).await?;
    let page = product_page("Echo Dot", "$44.99").replace("priceblock_ourprice", "corePrice_feature_div");
    wiremock::Mock::given(wiremock::matchers::path("/dp/B07XJ8C8F5"))
        .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(page))
        .mount(&app.server)
        .await;

    let report = app.reconciler().run_pass().await?;

    assert_eq!(report.extraction_failures, 1);
    assert_eq!(report.fetch_failures, 0);
    assert_eq!(app.store.get(&id("B07XJ8C8F5")).await?.unwrap().price.to_string(), "49.99");
    Ok(())
}

#[tokio::test]
async fn test_repeated_passes_are_idempotent() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed("B07XJ8C8F5", 4999, 3000).await?;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$25.00").await;

    let reconciler = app.reconciler();
    let first = reconciler.run_pass().await?;
    let after_first = app.store.get(&id("B07XJ8C8F5")).await?.unwrap().price;
    let second = reconciler.run_pass().await?;
    let after_second = app.store.get(&id("B07XJ8C8F5")).await?.unwrap().price;

    assert_eq!(after_first, after_second);
    assert_eq!(first.alerts_sent, second.alerts_sent);
    // Alerts repeat on every pass while the price stays low
    assert_eq!(app.notifier.sent().len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_delivery_failure_keeps_committed_price() -> anyhow::Result<()> {
    let app = TestApp::with_notifier(RecordingNotifier::failing()).await?;
    app.seed("B07XJ8C8F5", 4999, 3000).await?;
    app.seed("B000000002", 4999, 3000).await?;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$20.00").await;
    mount_product(&app.server, "B000000002", "Kindle", "$21.00").await;

    let report = app.reconciler().run_pass().await?;

    assert_eq!(report.alert_failures, 2);
    assert_eq!(report.prices_updated, 2);
    assert!(matches!(
        &report.outcome_for(&id("B07XJ8C8F5")).unwrap().status,
        ItemStatus::Updated { alert: AlertStatus::Failed { .. }, .. }
    ));
    assert_eq!(app.store.get(&id("B07XJ8C8F5")).await?.unwrap().price.to_string(), "20.00");
    assert_eq!(app.store.get(&id("B000000002")).await?.unwrap().price.to_string(), "21.00");
    Ok(())
}

#[tokio::test]
async fn test_item_deleted_mid_pass_is_store_failure() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.seed("B07XJ8C8F5", 4999, 3000).await?;
    wiremock::Mock::given(wiremock::matchers::path("/dp/B07XJ8C8F5"))
        .respond_with(
            wiremock::ResponseTemplate::new(200)
                .set_body_string(product_page("Echo Dot", "$10.00"))
                .set_delay(std::time::Duration::from_millis(300)),
        )
        .mount(&app.server)
        .await;

    let reconciler = app.reconciler();
    let pass = tokio::spawn(async move { reconciler.run_pass().await });
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(app.store.delete(&id("B07XJ8C8F5")).await?);

    let report = pass.await??;
    assert_eq!(report.store_failures, 1);
    // No alert for an item whose price could not be written
    assert!(app.notifier.sent().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_check_one_right_after_registration() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.track("B07XJ8C8F5", "Echo Dot", "$49.99", "30").await?;
    app.seed("B000000002", 9999, 1000).await?;
    mount_product(&app.server, "B07XJ8C8F5", "Echo Dot", "$25.00").await;

    let outcome = app.reconciler().check_one(&id("B07XJ8C8F5")).await?;

    match outcome.status {
        ItemStatus::Updated { price, alert } => {
            assert_eq!(price.to_string(), "25.00");
            assert_eq!(alert, AlertStatus::Sent);
        }
        other => panic!("unexpected status {:?}", other),
    }
    assert_eq!(app.notifier.sent().len(), 1);
    // Other items are left alone
    let untouched = app.store.get(&id("B000000002")).await?.unwrap();
    assert!(untouched.last_checked.is_none());
    Ok(())
}
