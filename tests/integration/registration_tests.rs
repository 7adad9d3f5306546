use wiremock::matchers::method;
use wiremock::{Mock, ResponseTemplate};

use wishlist_watcher::utils::error::{AppError, ValidationError};
use wishlist_watcher::{ItemStore, ItemUpdate};

use super::{TestApp, item_request, mount_status};

#[tokio::test]
async fn test_registered_item_is_retrievable() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let item = app.track("B07XJ8C8F5", "Echo Dot (3rd Gen)", "$1,234.56", "999.999").await?;

    assert_eq!(item.title, "Echo Dot (3rd Gen)");
    assert_eq!(item.price.to_string(), "1234.56");
    assert_eq!(item.threshold.to_string(), "1000.00");

    let stored = app.manager().get_item("b07xj8c8f5").await?;
    assert_eq!(stored.id, item.id);
    assert_eq!(stored.title, "Echo Dot (3rd Gen)");
    assert_eq!(stored.price, item.price);
    Ok(())
}

#[tokio::test]
async fn test_wrong_length_rejected_before_any_request() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&app.server)
        .await;

    for identifier in ["B07XJ8C8F", "B07XJ8C8F55", "", "B07XJ8C8F5 ", " B07XJ8C8F5"] {
        let err = app
            .manager()
            .create_item(item_request(identifier, "10", "alice"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AppError::Validation(ValidationError::IdentifierLength { .. })
        ));
    }
    assert!(app.store.list_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_failed_initial_scrape_is_never_stored() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    mount_status(&app.server, "B07XJ8C8F5", 404).await;

    let err = app
        .manager()
        .create_item(item_request("B07XJ8C8F5", "10", "alice"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Fetch(_)));
    assert!(app.store.list_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_threshold_at_or_above_price_rejected() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    let err = app.track("B07XJ8C8F5", "Echo Dot", "$49.99", "50").await.unwrap_err();

    let err = err.downcast::<AppError>()?;
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::ThresholdNotBelowPrice { .. })
    ));
    assert!(app.store.list_all().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_duplicate_registration_rejected() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.track("B07XJ8C8F5", "Echo Dot", "$49.99", "10").await?;

    let err = app
        .manager()
        .create_item(item_request("B07XJ8C8F5", "20", "bob"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Validation(ValidationError::DuplicateIdentifier(_))
    ));
    assert_eq!(app.store.list_all().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_owner_manages_own_items_only() -> anyhow::Result<()> {
    let app = TestApp::new().await?;
    app.track("B07XJ8C8F5", "Echo Dot", "$49.99", "10").await?;
    let manager = app.manager();

    let update = ItemUpdate {
        title: None,
        threshold: Some("35".parse()?),
    };
    let err = manager.update_item("B07XJ8C8F5", "bob", update.clone()).await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));

    let updated = manager.update_item("B07XJ8C8F5", "alice", update).await?;
    assert_eq!(updated.threshold.to_string(), "35.00");
    assert_eq!(
        app.store.list_by_owner("alice").await?[0].threshold.to_string(),
        "35.00"
    );

    let err = manager.delete_item("B07XJ8C8F5", "bob").await.unwrap_err();
    assert!(matches!(err, AppError::Forbidden { .. }));
    manager.delete_item("B07XJ8C8F5", "alice").await?;
    assert!(manager.list_items().await?.is_empty());
    Ok(())
}
