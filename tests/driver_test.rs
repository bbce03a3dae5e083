mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_driver(app: &TestApp, token: &str, name: &str) -> Uuid {
    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/drivers",
            Some(json!({ "name": name, "phone": "555-9876" })),
            Some(token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["is_available"], true);
    body["data"]["id"].as_str().unwrap().parse().unwrap()
}

async fn ready_delivery_order(app: &TestApp, slug: &str, product_id: Uuid, token: &str) -> Value {
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/v1/restaurants/{}/orders", slug),
            Some(json!({
                "customer_name": "Grace",
                "customer_phone": "555-4321",
                "service_type": "delivery",
                "payment_method": "card",
                "delivery_address": "42 Harbour Road",
                "items": [{ "product_id": product_id, "quantity": 1 }]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let order = body["data"]["order"].clone();
    let id = order["id"].as_str().unwrap();

    for action in ["accept", "start-preparing", "ready"] {
        let (status, body) = app
            .call(
                Method::POST,
                &format!("/restaurant/orders/{}/{}", id, action),
                None,
                Some(token),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", action, body);
    }
    order
}

#[tokio::test]
async fn delivery_order_is_handed_to_a_driver() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("deliveries", "DE").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Dana").await;

    let order = ready_delivery_order(&app, "deliveries", menu.product_id, &staff).await;
    assert_eq!(decimal(&order["delivery_fee"]), dec!(3.00));
    assert_eq!(decimal(&order["total"]), dec!(13.00));
    let id = order["id"].as_str().unwrap();

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/assign-driver", id),
            Some(json!({ "driver_id": driver_id })),
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "ready");
    assert_eq!(body["data"]["driver_id"], driver_id.to_string());
    assert_eq!(body["data"]["available_actions"]["can_pick_up"], true);

    // Assigned drivers are busy until the delivery is done.
    let (_, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/drivers/{}", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(body["data"]["is_available"], false);

    let driver = app.driver_token(restaurant.id, driver_id);
    let (status, body) = app.call(Method::GET, "/driver/orders", None, Some(&driver)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/driver/orders/{}/pick-up", id),
            None,
            Some(&driver),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "out_for_delivery");

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/driver/orders/{}/delivered", id),
            None,
            Some(&driver),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "delivered");

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/drivers/{}", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(body["data"]["is_available"], true);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/complete", id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "completed");
}

#[tokio::test]
async fn drivers_only_move_their_own_orders() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("own", "OW").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let assigned = create_driver(&app, &staff, "Assigned").await;
    let bystander = create_driver(&app, &staff, "Bystander").await;

    let order = ready_delivery_order(&app, "own", menu.product_id, &staff).await;
    let id = order["id"].as_str().unwrap();
    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/assign-driver", id),
            Some(json!({ "driver_id": assigned })),
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/driver/orders/{}/pick-up", id),
            None,
            Some(&app.driver_token(restaurant.id, bystander)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unavailable_driver_cannot_be_assigned() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("busy", "BU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Off shift").await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/drivers/{}/toggle-available", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_available"], false);

    let order = ready_delivery_order(&app, "busy", menu.product_id, &staff).await;
    let (status, body) = app
        .call(
            Method::POST,
            &format!(
                "/restaurant/orders/{}/assign-driver",
                order["id"].as_str().unwrap()
            ),
            Some(json!({ "driver_id": driver_id })),
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["driver_id"].is_array());
}

#[tokio::test]
async fn pickup_orders_cannot_be_assigned_a_driver() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("counter-only", "CN").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Idle").await;

    let order = app.place_pickup_order("counter-only", menu.product_id, 1).await;
    let id = order["id"].as_str().unwrap();
    for action in ["accept", "start-preparing", "ready"] {
        app.call(
            Method::POST,
            &format!("/restaurant/orders/{}/{}", id, action),
            None,
            Some(&staff),
        )
        .await;
    }

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/orders/{}/assign-driver", id),
            Some(json!({ "driver_id": driver_id })),
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn driver_tokens_cannot_reach_staff_endpoints() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("roles", "RO").await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Curious").await;
    let driver = app.driver_token(restaurant.id, driver_id);

    let (status, _) = app.call(Method::GET, "/restaurant/orders", None, Some(&driver)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.call(Method::GET, "/driver/orders", None, Some(&staff)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn check_in_and_location_updates() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("gps", "GP").await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Navigator").await;
    let driver = app.driver_token(restaurant.id, driver_id);

    let (status, body) = app.call(Method::POST, "/driver/check-in", None, Some(&driver)).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert!(body["data"]["last_login_at"].is_string());

    let (status, body) = app
        .call(
            Method::PUT,
            "/driver/location",
            Some(json!({ "latitude": "52.3676", "longitude": "4.9041" })),
            Some(&driver),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["current_latitude"], "52.3676");

    let (status, _) = app
        .call(
            Method::PUT,
            "/driver/location",
            Some(json!({ "latitude": "123.0", "longitude": "4.9" })),
            Some(&driver),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn inactive_driver_cannot_check_in() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("inactive", "IN").await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Retired").await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/drivers/{}/toggle-active", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);
    assert_eq!(body["data"]["is_available"], false);

    let (status, _) = app
        .call(
            Method::POST,
            "/driver/check-in",
            None,
            Some(&app.driver_token(restaurant.id, driver_id)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/restaurant/drivers/{}/toggle-available", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

async fn assign(app: &TestApp, order_id: &str, driver_id: Uuid, token: &str) -> (StatusCode, Value) {
    app.call(
        Method::POST,
        &format!("/restaurant/orders/{}/assign-driver", order_id),
        Some(json!({ "driver_id": driver_id })),
        Some(token),
    )
    .await
}

#[tokio::test]
async fn a_driver_is_never_booked_on_two_orders() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("busy", "BU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Sam").await;

    let first = ready_delivery_order(&app, "busy", menu.product_id, &staff).await;
    let second = ready_delivery_order(&app, "busy", menu.product_id, &staff).await;
    let first_id = first["id"].as_str().unwrap();
    let second_id = second["id"].as_str().unwrap();

    let (a, b) = tokio::join!(
        assign(&app, first_id, driver_id, &staff),
        assign(&app, second_id, driver_id, &staff),
    );
    let statuses = [a.0, b.0];
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "{:?} {:?}",
        a,
        b
    );
    assert!(statuses.contains(&StatusCode::UNPROCESSABLE_ENTITY));

    let driver = app.driver_token(restaurant.id, driver_id);
    let (_, body) = app.call(Method::GET, "/driver/orders", None, Some(&driver)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Staff cannot free a driver who still holds a delivery.
    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/drivers/{}/toggle-available", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let (_, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/drivers/{}", driver_id),
            None,
            Some(&staff),
        )
        .await;
    assert_eq!(body["data"]["is_available"], false);
}

#[tokio::test]
async fn drivers_with_active_orders_cannot_be_deleted() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("roster", "RO").await;
    let menu = app.seed_menu(restaurant.id).await;
    let staff = app.staff_token(restaurant.id);
    let driver_id = create_driver(&app, &staff, "Lee").await;

    let order = ready_delivery_order(&app, "roster", menu.product_id, &staff).await;
    let id = order["id"].as_str().unwrap();
    let (status, body) = assign(&app, id, driver_id, &staff).await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let driver_path = format!("/restaurant/drivers/{}", driver_id);
    let (status, body) = app
        .call(Method::DELETE, &driver_path, None, Some(&staff))
        .await;
    assert_eq!(status, StatusCode::CONFLICT, "{}", body);

    let driver = app.driver_token(restaurant.id, driver_id);
    let steps = [
        (format!("/driver/orders/{}/pick-up", id), &driver),
        (format!("/driver/orders/{}/delivered", id), &driver),
        (format!("/restaurant/orders/{}/complete", id), &staff),
    ];
    for (path, token) in &steps {
        let (status, body) = app.call(Method::POST, path, None, Some(token.as_str())).await;
        assert_eq!(status, StatusCode::OK, "{} failed: {}", path, body);
    }

    let (status, _) = app
        .call(Method::DELETE, &driver_path, None, Some(&staff))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app.call(Method::GET, &driver_path, None, Some(&staff)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
