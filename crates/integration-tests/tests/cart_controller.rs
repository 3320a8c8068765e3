//! Optimistic client controller against a live storefront.

#![allow(clippy::unwrap_used)]

use std::time::Instant;

use veblyss_client::{CartController, ControllerError};
use veblyss_core::{CartEntry, ProductId};
use veblyss_integration_tests::TestContext;

fn pid(s: &str) -> ProductId {
    ProductId::parse(s).unwrap()
}

#[tokio::test]
async fn test_increment_then_decrement_to_removal() {
    let ctx = TestContext::spawn().await;
    let (api, profile) = ctx.signed_up("steps@example.com").await;
    let controller = CartController::new(api);
    controller.start_session(profile);

    controller.add(CartEntry::new(pid("p1"))).await.unwrap();
    controller.increment(&pid("p1"), 1).await.unwrap();
    assert_eq!(controller.quantity_of(&pid("p1")), Some(2));

    controller.set_quantity(&pid("p1"), 1).await.unwrap();
    controller.set_quantity(&pid("p1"), 0).await.unwrap();
    assert_eq!(controller.quantity_of(&pid("p1")), None);

    let server = controller.refresh_user().await.unwrap();
    assert!(server.cart.is_empty());
}

#[tokio::test]
async fn test_remove_one_of_two() {
    let ctx = TestContext::spawn().await;
    let (api, profile) = ctx.signed_up("two@example.com").await;
    let controller = CartController::new(api);
    controller.start_session(profile);

    controller.add(CartEntry::new(pid("p1"))).await.unwrap();
    controller.add(CartEntry::new(pid("p2"))).await.unwrap();
    controller.remove(&pid("p1")).await.unwrap();

    let server = controller.refresh_user().await.unwrap();
    let ids: Vec<_> = server.cart.iter().map(|e| e.product_id.to_string()).collect();
    assert_eq!(ids, ["p2"]);
    assert_eq!(controller.cart_items().len(), 1);
}

#[tokio::test]
async fn test_decrement_floors_at_one() {
    let ctx = TestContext::spawn().await;
    let (api, profile) = ctx.signed_up("floor@example.com").await;
    let controller = CartController::new(api);
    controller.start_session(profile);

    controller
        .add(CartEntry::new(pid("p1")).with_quantity(2))
        .await
        .unwrap();
    controller.increment(&pid("p1"), -10).await.unwrap();

    let server = controller.refresh_user().await.unwrap();
    assert_eq!(server.cart.quantity_of(&pid("p1")), Some(1));
}

#[tokio::test]
async fn test_expired_session_rolls_back() {
    let ctx = TestContext::spawn().await;
    let (_, profile) = ctx.signed_up("expired@example.com").await;

    // Profile cached, but this API holds no token.
    let controller = CartController::new(ctx.api());
    controller.start_session(profile);

    let err = controller.add(CartEntry::new(pid("p1"))).await.unwrap_err();
    assert!(matches!(
        err,
        ControllerError::Api(veblyss_client::ApiError::Unauthenticated)
    ));
    assert!(controller.cart_items().is_empty());

    let store = controller.store();
    let mut store = store.lock().unwrap();
    assert_eq!(store.active_notices(Instant::now()).len(), 1);
}

#[tokio::test]
async fn test_signed_out_controller_shows_empty_cart() {
    let ctx = TestContext::spawn().await;
    let (api, profile) = ctx.signed_up("logout@example.com").await;
    let controller = CartController::new(api);
    controller.start_session(profile);
    controller.add(CartEntry::new(pid("p1"))).await.unwrap();

    controller.api().signout().await.unwrap();
    controller.reset();
    assert!(controller.cart_items().is_empty());
    assert!(controller.refresh_user().await.is_err());
}
