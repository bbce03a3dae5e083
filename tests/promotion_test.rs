mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

async fn create_promotion(app: &TestApp, token: &str, body: Value) -> (StatusCode, Value) {
    app.call(Method::POST, "/restaurant/promotions", Some(body), Some(token))
        .await
}

fn percentage_off(product_id: Uuid, percent: &str) -> Value {
    json!({
        "name": "Happy pizza",
        "promotion_type": "discount",
        "discount_type": "percentage",
        "discount_value": percent,
        "validity_type": "permanent",
        "items": [{ "product_id": product_id }]
    })
}

#[tokio::test]
async fn discount_shows_on_the_public_menu_and_the_order() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("promo", "PM").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, body) =
        create_promotion(&app, &token, percentage_off(menu.product_id, "20")).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["sort_order"], 1);
    assert_eq!(body["data"]["items"].as_array().unwrap().len(), 1);

    let (status, body) = app.call(Method::GET, "/api/v1/menu/promo", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let product = &body["data"]["menu"]["categories"][0]["products"][0];
    assert_eq!(product["promotion"]["name"], "Happy pizza");
    assert_eq!(decimal(&product["promotion"]["discount"]), dec!(2.00));
    assert_eq!(decimal(&product["promotion"]["final_price"]), dec!(8.00));

    let order = app.place_pickup_order("promo", menu.product_id, 2).await;
    assert_eq!(decimal(&order["subtotal"]), dec!(20.00));
    assert_eq!(decimal(&order["discount"]), dec!(4.00));
    assert_eq!(decimal(&order["total"]), dec!(16.00));
    assert!(order["items"][0]["promotion_id"].is_string());
}

#[tokio::test]
async fn the_largest_discount_wins() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("best", "BE").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, _) = create_promotion(&app, &token, percentage_off(menu.product_id, "10")).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_promotion(
        &app,
        &token,
        json!({
            "name": "Pizza day",
            "promotion_type": "daily_special",
            "discount_type": "fixed_price",
            "discount_value": "7.00",
            "validity_type": "permanent",
            "items": [{ "category_id": menu.category_id }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let order = app.place_pickup_order("best", menu.product_id, 1).await;
    assert_eq!(decimal(&order["discount"]), dec!(3.00));
    assert_eq!(decimal(&order["total"]), dec!(7.00));
}

#[tokio::test]
async fn expired_and_inactive_promotions_are_not_public() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("expired", "EP").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, body) = create_promotion(
        &app,
        &token,
        json!({
            "name": "Millennium deal",
            "promotion_type": "discount",
            "discount_type": "fixed_amount",
            "discount_value": "5.00",
            "validity_type": "date_range",
            "valid_from": "2000-01-01",
            "valid_until": "2000-01-02",
            "items": [{ "product_id": menu.product_id }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);

    let (status, body) = create_promotion(&app, &token, percentage_off(menu.product_id, "15")).await;
    assert_eq!(status, StatusCode::CREATED);
    let live_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(Method::GET, "/api/v1/restaurants/expired/promotions", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]["promotions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Happy pizza"]);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/promotions/{}/toggle-active", live_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    let (_, body) = app
        .call(Method::GET, "/api/v1/restaurants/expired/promotions", None, None)
        .await;
    assert!(body["data"]["promotions"].as_array().unwrap().is_empty());

    // Staff still see both.
    let (_, body) = app
        .call(Method::GET, "/restaurant/promotions", None, Some(&token))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let order = app.place_pickup_order("expired", menu.product_id, 1).await;
    assert_eq!(decimal(&order["discount"]), dec!(0));
}

#[tokio::test]
async fn invalid_promotions_are_rejected() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("rules", "RU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, _) = create_promotion(&app, &token, percentage_off(menu.product_id, "150")).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = create_promotion(
        &app,
        &token,
        json!({
            "name": "Lunch",
            "promotion_type": "discount",
            "discount_type": "percentage",
            "discount_value": "10",
            "validity_type": "time_range",
            "time_from": "11:00:00",
            "items": [{ "product_id": menu.product_id }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = create_promotion(
        &app,
        &token,
        json!({
            "name": "Nothing",
            "promotion_type": "discount",
            "discount_type": "percentage",
            "discount_value": "10",
            "validity_type": "permanent",
            "items": []
        }),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn update_replaces_the_target_items() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("swap", "SW").await;
    let menu = app.seed_menu(restaurant.id).await;
    let other = app
        .seed_product(restaurant.id, menu.category_id, "Bianca", dec!(9.00))
        .await;
    let token = app.staff_token(restaurant.id);

    let (_, body) = create_promotion(&app, &token, percentage_off(menu.product_id, "10")).await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/restaurant/promotions/{}", id),
            Some(percentage_off(other, "10")),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let items = body["data"]["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["product_id"], other.to_string());

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/restaurant/promotions/{}", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/restaurant/promotions/{}", id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
