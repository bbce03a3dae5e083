mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use restaurant_orders_api::{
    entities::outbox_event::{self, OutboxStatus},
    events::outbox::{drain_once, prune_delivered, ORDER_PLACED, ORDER_STATUS_CHANGED},
    models::order_status::OrderStatus,
    notifications::OrderUpdateHub,
};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use std::time::Duration;
use tokio::sync::broadcast::error::TryRecvError;
use uuid::Uuid;

async fn outbox_count(app: &TestApp, status: OutboxStatus) -> u64 {
    outbox_event::Entity::find()
        .filter(outbox_event::Column::Status.eq(status))
        .count(&*app.state.db)
        .await
        .expect("count outbox rows")
}

#[tokio::test]
async fn pickup_order_walks_through_the_board() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("luigis", "LU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let order = app.place_pickup_order("luigis", menu.product_id, 2).await;
    assert_eq!(order["status"], "pending");
    assert_eq!(order["order_number"], "LU-00001");
    assert_eq!(decimal(&order["subtotal"]), dec!(20.00));
    assert_eq!(decimal(&order["delivery_fee"]), dec!(0));
    assert_eq!(decimal(&order["total"]), dec!(20.00));
    assert_eq!(order["available_actions"]["can_accept"], true);
    let id = order["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/accept", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "confirmed");
    assert_eq!(body["data"]["version"], 2);
    assert!(body["data"]["accepted_at"].is_string());

    for (action, expected) in [("start-preparing", "preparing"), ("ready", "ready"), ("complete", "completed")] {
        let (status, body) = app
            .call(
                Method::POST,
                &format!("/restaurant/orders/{}/{}", id, action),
                None,
                Some(&token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", action, body);
        assert_eq!(body["data"]["status"], expected);
    }

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/orders/{}/history", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let statuses: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|entry| entry["status"].as_str().unwrap())
        .collect();
    assert_eq!(
        statuses,
        vec!["pending", "confirmed", "preparing", "ready", "completed"]
    );
}

#[tokio::test]
async fn accept_can_jump_straight_to_preparing() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("fast", "FA").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("fast", menu.product_id, 1).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/accept", order["id"].as_str().unwrap()),
            Some(json!({ "start_preparing": true })),
            Some(&app.staff_token(restaurant.id)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "preparing");
    assert!(body["data"]["preparing_at"].is_string());
}

#[tokio::test]
async fn out_of_order_transition_is_a_conflict() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("strict", "ST").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("strict", menu.product_id, 1).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/ready", order["id"].as_str().unwrap()),
            None,
            Some(&app.staff_token(restaurant.id)),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("pending"));
}

#[tokio::test]
async fn stale_version_is_rejected() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("versioned", "VE").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("versioned", menu.product_id, 1).await;
    let id = order["id"].as_str().unwrap();
    let token = app.staff_token(restaurant.id);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/accept", id),
            Some(json!({ "expected_version": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // A second tablet still showing version 1 tries to cancel.
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/cancel", id),
            Some(json!({ "reason": "customer called", "expected_version": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn cancel_requires_a_reason_and_records_it() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("cancels", "CA").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("cancels", menu.product_id, 1).await;
    let id = order["id"].as_str().unwrap();
    let token = app.staff_token(restaurant.id);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/cancel", id),
            Some(json!({ "reason": "   " })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/cancel", id),
            Some(json!({ "reason": "Out of dough" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "cancelled");
    assert_eq!(body["data"]["cancellation_reason"], "Out of dough");
    assert_eq!(body["data"]["available_actions"]["can_cancel"], false);
}

#[tokio::test]
async fn orders_are_scoped_to_the_token_restaurant() {
    let app = TestApp::new().await;
    let mine = app.seed_restaurant("mine", "MI").await;
    let other = app.seed_restaurant("other", "OT").await;
    let menu = app.seed_menu(mine.id).await;
    let order = app.place_pickup_order("mine", menu.product_id, 1).await;

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/restaurant/orders/{}", order["id"].as_str().unwrap()),
            None,
            Some(&app.staff_token(other.id)),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::GET,
            "/restaurant/orders?status=pending",
            None,
            Some(&app.staff_token(mine.id)),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pagination"]["total"], 1);
    assert_eq!(body["data"]["items"][0]["order_number"], "MI-00001");
}

#[tokio::test]
async fn order_numbers_increase_per_restaurant() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("counter", "CO").await;
    let menu = app.seed_menu(restaurant.id).await;

    let first = app.place_pickup_order("counter", menu.product_id, 1).await;
    let second = app.place_pickup_order("counter", menu.product_id, 1).await;
    assert_eq!(first["order_number"], "CO-00001");
    assert_eq!(second["order_number"], "CO-00002");
}

#[tokio::test]
async fn payment_status_updates_and_never_returns_to_pending() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("payments", "PA").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("payments", menu.product_id, 1).await;
    let uri = format!(
        "/restaurant/orders/{}/payment-status",
        order["id"].as_str().unwrap()
    );
    let token = app.staff_token(restaurant.id);

    let (status, body) = app
        .call(Method::PUT, &uri, Some(json!({ "payment_status": "paid" })), Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["payment_status"], "paid");

    let (status, _) = app
        .call(Method::PUT, &uri, Some(json!({ "payment_status": "pending" })), Some(&token))
        .await;
    assert!(status.is_client_error());
}

#[tokio::test]
async fn print_returns_a_kitchen_ticket() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("printer", "PR").await;
    let menu = app.seed_menu(restaurant.id).await;
    let order = app.place_pickup_order("printer", menu.product_id, 3).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/print", order["id"].as_str().unwrap()),
            None,
            Some(&app.staff_token(restaurant.id)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let ticket = body["data"]["ticket"].as_str().unwrap();
    assert!(ticket.contains("PR-00001"));
    assert!(ticket.contains("Margherita"));
}

#[tokio::test]
async fn staff_endpoints_require_a_token() {
    let app = TestApp::new().await;
    let (status, _) = app.call(Method::GET, "/restaurant/orders", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/restaurant/orders", None, Some("not-a-jwt"))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn committed_changes_reach_only_their_restaurant() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("board", "BO").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let order = app.place_pickup_order("board", menu.product_id, 1).await;
    let id = order["id"].as_str().unwrap();
    assert_eq!(outbox_count(&app, OutboxStatus::Pending).await, 1);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/accept", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outbox_count(&app, OutboxStatus::Pending).await, 2);

    let hub = OrderUpdateHub::new(16);
    let mut ours = hub.subscribe_restaurant(restaurant.id);
    let mut theirs = hub.subscribe_restaurant(Uuid::new_v4());

    let delivered = drain_once(&app.state.db, &hub, 100).await.unwrap();
    assert_eq!(delivered, 2);
    assert_eq!(outbox_count(&app, OutboxStatus::Pending).await, 0);
    assert_eq!(outbox_count(&app, OutboxStatus::Delivered).await, 2);

    let placed = ours.try_recv().unwrap();
    assert_eq!(placed.event_type, ORDER_PLACED);
    assert_eq!(placed.order_number, "BO-00001");
    let accepted = ours.try_recv().unwrap();
    assert_eq!(accepted.event_type, ORDER_STATUS_CHANGED);
    assert_eq!(accepted.order_id.to_string(), id);
    assert_eq!(accepted.previous_status, Some(OrderStatus::Pending));
    assert_eq!(accepted.status, OrderStatus::Confirmed);
    assert_eq!(accepted.version, 2);
    assert!(matches!(theirs.try_recv(), Err(TryRecvError::Empty)));

    // Nothing is left to publish on the next poll.
    assert_eq!(drain_once(&app.state.db, &hub, 100).await.unwrap(), 0);

    assert_eq!(
        prune_delivered(&app.state.db, Duration::from_secs(3600))
            .await
            .unwrap(),
        0
    );
    assert_eq!(prune_delivered(&app.state.db, Duration::ZERO).await.unwrap(), 2);
    assert_eq!(outbox_count(&app, OutboxStatus::Delivered).await, 0);
}

#[tokio::test]
async fn rejected_transitions_enqueue_nothing() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("quiet", "QU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let order = app.place_pickup_order("quiet", menu.product_id, 1).await;
    let id = order["id"].as_str().unwrap();
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/accept", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let before = outbox_count(&app, OutboxStatus::Pending).await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/start-preparing", id),
            Some(json!({ "expected_version": 1 })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/complete", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    assert_eq!(outbox_count(&app, OutboxStatus::Pending).await, before);
    let (_, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/orders/{}/history", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn query_string_tokens_are_refused_outside_the_websocket() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("urls", "UR").await;
    let token = app.staff_token(restaurant.id);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/restaurant/orders?token={}", token),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::GET, "/restaurant/orders", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
}
