mod common;

use axum::http::{Method, StatusCode};
use common::{decimal, TestApp};
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

#[tokio::test]
async fn product_is_built_through_the_api() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("builder", "BL").await;
    let token = app.staff_token(restaurant.id);

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/categories",
            Some(json!({ "name": "Burgers" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["sort_order"], 1);
    let category_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/sections",
            Some(json!({
                "name": "Sauce",
                "min_selections": 1,
                "max_selections": 1,
                "options": [
                    { "name": "Ketchup" },
                    { "name": "Truffle mayo", "price_adjustment": "0.80" }
                ]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let section_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["options"].as_array().unwrap().len(), 2);
    assert_eq!(body["data"]["options"][1]["sort_order"], 2);

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/products",
            Some(json!({
                "category_id": category_id,
                "name": "Smash burger",
                "price": "9.50",
                "variants": [{ "name": "Double", "price": "12.00" }],
                "section_ids": [section_id]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let product_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/restaurant/menu/products/{}", product_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["price"]), dec!(9.50));
    assert_eq!(body["data"]["variants"][0]["name"], "Double");
    assert_eq!(body["data"]["sections"][0]["name"], "Sauce");
    assert_eq!(
        body["data"]["sections"][0]["options"][1]["name"],
        "Truffle mayo"
    );

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/restaurant/menu/products/{}", product_id),
            Some(json!({
                "category_id": category_id,
                "name": "Smash burger",
                "description": "Two thin patties",
                "price": "10.00"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(decimal(&body["data"]["price"]), dec!(10.00));
    assert_eq!(body["data"]["description"], "Two thin patties");
}

#[tokio::test]
async fn invalid_payloads_report_field_errors() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("invalid", "IV").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/products",
            Some(json!({
                "category_id": menu.category_id,
                "name": "Free lunch",
                "price": "-1.00"
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["price"].is_array(), "{}", body);

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/categories",
            Some(json!({ "name": "" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["name"].is_array());
}

#[tokio::test]
async fn section_in_use_cannot_be_deleted() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("sections", "SE").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);
    let uri = format!("/restaurant/menu/sections/{}", menu.section_id);

    let (status, body) = app.call(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["message"].as_str().unwrap().contains("Extras"));

    let (status, _) = app
        .call(
            Method::PUT,
            &format!("/restaurant/menu/products/{}/sections", menu.product_id),
            Some(json!({ "section_ids": [] })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.call(Method::DELETE, &uri, None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unavailable_products_cannot_be_ordered() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("soldout", "SD").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, body) = app
        .call(
            Method::POST,
            &format!(
                "/restaurant/menu/products/{}/toggle-availability",
                menu.product_id
            ),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_available"], false);
    assert_eq!(body["message"], "Product is unavailable");

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/soldout/orders",
            Some(json!({
                "customer_name": "Ada",
                "customer_phone": "555-1234",
                "service_type": "pickup",
                "payment_method": "cash",
                "items": [{ "product_id": menu.product_id, "quantity": 1 }]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["items[0].product_id"].is_array(), "{}", body);
}

#[tokio::test]
async fn options_and_variants_are_priced_into_the_order() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("extras", "EX").await;
    let menu = app.seed_menu(restaurant.id).await;

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/extras/orders",
            Some(json!({
                "customer_name": "Ada",
                "customer_phone": "555-1234",
                "service_type": "pickup",
                "payment_method": "cash",
                "items": [{
                    "product_id": menu.product_id,
                    "variant_id": menu.variant_id,
                    "option_ids": [menu.option_id],
                    "quantity": 2
                }]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let order = &body["data"]["order"];
    // (12.50 + 1.50) * 2
    assert_eq!(decimal(&order["subtotal"]), dec!(28.00));
    assert_eq!(order["items"][0]["name"], "Margherita - Large");
}

#[tokio::test]
async fn too_many_options_are_rejected() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("greedy", "GR").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/restaurant/menu/sections/{}/options", menu.section_id),
            Some(json!({ "name": "Basil", "price_adjustment": "0.30" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let basil: Uuid = body["data"]["id"].as_str().unwrap().parse().unwrap();

    let (_, section) = app
        .call(
            Method::GET,
            &format!("/restaurant/menu/sections/{}", menu.section_id),
            None,
            Some(&token),
        )
        .await;
    let all_options: Vec<String> = section["data"]["options"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["id"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(all_options.len(), 3);
    assert_eq!(all_options[2], basil.to_string());

    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/greedy/orders",
            Some(json!({
                "customer_name": "Ada",
                "customer_phone": "555-1234",
                "service_type": "pickup",
                "payment_method": "cash",
                "items": [{
                    "product_id": menu.product_id,
                    "option_ids": all_options,
                    "quantity": 1
                }]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn deleting_a_category_removes_its_products() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("cascade", "CS").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let (status, _) = app
        .call(
            Method::DELETE,
            &format!("/restaurant/menu/categories/{}", menu.category_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .call(
            Method::GET,
            &format!("/restaurant/menu/products/{}", menu.product_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn public_menu_lists_active_items_only() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("public", "PU").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);
    let hidden = app
        .seed_product(restaurant.id, menu.category_id, "Secret special", dec!(20.00))
        .await;
    app.call(
        Method::PUT,
        &format!("/restaurant/menu/products/{}", hidden),
        Some(json!({
            "category_id": menu.category_id,
            "name": "Secret special",
            "price": "20.00",
            "is_active": false
        })),
        Some(&token),
    )
    .await;

    let (status, body) = app.call(Method::GET, "/api/v1/menu/public", None, None).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    let menu_json = &body["data"]["menu"];
    assert_eq!(menu_json["restaurant"]["slug"], "public");
    let products = menu_json["categories"][0]["products"].as_array().unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0]["name"], "Margherita");
    assert_eq!(products[0]["sections"][0]["options"].as_array().unwrap().len(), 2);

    let (status, body) = app
        .call(
            Method::GET,
            &format!("/api/v1/menu/products/{}", menu.product_id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["product"]["variants"][0]["name"], "Large");
}

#[tokio::test]
async fn drivers_cannot_manage_the_menu() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("guarded", "GU").await;
    let token = app.driver_token(restaurant.id, Uuid::new_v4());

    let (status, _) = app
        .call(Method::GET, "/restaurant/menu/categories", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn inactive_restaurant_is_hidden_from_the_public() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("closed", "CL").await;
    let admin = app.admin_token(restaurant.id);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/admin/restaurants/{}", restaurant.id),
            Some(json!({
                "name": "Closed for good",
                "slug": "closed",
                "order_prefix": "CL",
                "is_active": false
            })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = app.call(Method::GET, "/api/v1/restaurants/closed", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Staff of a restaurant cannot manage the restaurant list.
    let (status, _) = app
        .call(
            Method::GET,
            "/admin/restaurants",
            None,
            Some(&app.staff_token(restaurant.id)),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

fn combo_order(combo_id: &str, option_ids: Vec<&str>) -> Value {
    json!({
        "customer_name": "Ada",
        "customer_phone": "555-1234",
        "service_type": "pickup",
        "payment_method": "cash",
        "items": [{ "combo_id": combo_id, "option_ids": option_ids, "quantity": 1 }]
    })
}

#[tokio::test]
async fn combo_choices_are_priced_and_recorded() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("meals", "ME").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);
    let cola = app
        .seed_product(restaurant.id, menu.category_id, "Cola", dec!(2.00))
        .await;
    let juice = app
        .seed_product(restaurant.id, menu.category_id, "Orange juice", dec!(3.00))
        .await;

    let (status, body) = app
        .call(
            Method::POST,
            "/restaurant/menu/combos",
            Some(json!({
                "name": "Pizza meal",
                "price": "12.00",
                "items": [
                    { "product_id": menu.product_id },
                    {
                        "is_choice_group": true,
                        "group_name": "Drink",
                        "options": [
                            { "product_id": cola },
                            { "product_id": juice, "price_adjustment": "0.75" }
                        ]
                    }
                ]
            })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let combo_id = body["data"]["id"].as_str().unwrap().to_string();
    let group = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .find(|i| i["is_choice_group"] == true)
        .unwrap()
        .clone();
    let option_id = |product: Uuid| {
        group["options"]
            .as_array()
            .unwrap()
            .iter()
            .find(|o| o["product_id"] == product.to_string())
            .unwrap()["id"]
            .as_str()
            .unwrap()
            .to_string()
    };
    let cola_option = option_id(cola);
    let juice_option = option_id(juice);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/meals/orders",
            Some(combo_order(&combo_id, vec![juice_option.as_str()])),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let item = &body["data"]["order"]["items"][0];
    assert_eq!(decimal(&item["unit_price"]), dec!(12.75));
    assert_eq!(item["selected_options"][0]["section_name"], "Drink");
    assert_eq!(item["selected_options"][0]["options"][0]["name"], "Orange juice");

    // Every group needs exactly one answer, taken from this combo.
    for option_ids in [
        vec![],
        vec![cola_option.as_str(), juice_option.as_str()],
    ] {
        let (status, body) = app
            .call(
                Method::POST,
                "/api/v1/restaurants/meals/orders",
                Some(combo_order(&combo_id, option_ids)),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "{}", body);
        assert!(body["fields"]["items[0].option_ids"].is_array(), "{}", body);
    }

    let section_option = menu.option_id.to_string();
    let (status, _) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/meals/orders",
            Some(combo_order(&combo_id, vec![cola_option.as_str(), section_option.as_str()])),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn products_of_hidden_categories_are_not_sold() {
    let app = TestApp::new().await;
    let restaurant = app.seed_restaurant("hidden", "HI").await;
    let menu = app.seed_menu(restaurant.id).await;
    let token = app.staff_token(restaurant.id);

    let product_path = format!("/api/v1/menu/products/{}", menu.product_id);
    let (status, _) = app.call(Method::GET, &product_path, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call(
            Method::PUT,
            &format!("/restaurant/menu/categories/{}", menu.category_id),
            Some(json!({ "name": "Pizza", "is_active": false })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["is_active"], false);

    let (status, _) = app.call(Method::GET, &product_path, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            Method::POST,
            "/api/v1/restaurants/hidden/orders",
            Some(json!({
                "customer_name": "Ada",
                "customer_phone": "555-1234",
                "service_type": "pickup",
                "payment_method": "cash",
                "items": [{ "product_id": menu.product_id, "quantity": 1 }]
            })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["items[0].product_id"].is_array(), "{}", body);
}
