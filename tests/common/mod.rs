#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    Router,
};
use restaurant_orders_api::{
    auth::{AuthConfig, AuthService, Role, TokenSubject},
    config::AppConfig,
    db,
    events::{self, EventSender},
    handlers::AppServices,
    notifications::{OrderUpdateHub, PrintService, TracingPrintService},
    services::{
        menu::{
            CategoryRequest, CreateProductRequest, CreateSectionRequest, ProductRequest,
            SectionOptionRequest, SectionRequest, VariantRequest,
        },
        restaurants::{RestaurantRequest, RestaurantView},
    },
    AppState,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str =
    "test_secret_key_for_integration_tests_that_is_comfortably_longer_than_64_chars";

/// Helper harness for spinning up an application backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

/// Ids of the menu created by [`TestApp::seed_menu`].
#[derive(Debug, Clone, Copy)]
pub struct SeededMenu {
    pub category_id: Uuid,
    /// "Margherita", 10.00
    pub product_id: Uuid,
    /// "Large", 12.50
    pub variant_id: Uuid,
    /// "Extras", up to two picks
    pub section_id: Uuid,
    /// "Extra cheese", +1.50
    pub option_id: Uuid,
}

impl TestApp {
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            TEST_JWT_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        // A single connection keeps every query on the same in-memory database.
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;
        cfg.db_idle_timeout_secs = 3600;

        let pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = Arc::new(EventSender::new(event_tx));
        let event_task = tokio::spawn(events::process_events(event_rx, Vec::new()));

        let printer: Arc<dyn PrintService> = Arc::new(TracingPrintService);
        let services = AppServices::new(db_arc.clone(), event_sender.clone(), printer);
        let auth = Arc::new(AuthService::new(AuthConfig::from(&cfg)));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            order_updates: OrderUpdateHub::new(64),
            auth,
        };
        let router = restaurant_orders_api::build_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn token(&self, role: Role, restaurant_id: Uuid, driver_id: Option<Uuid>) -> String {
        self.state
            .auth
            .issue_token(&TokenSubject {
                subject: format!("{}-test", role),
                role,
                restaurant_id,
                driver_id,
            })
            .expect("issue test token")
    }

    pub fn staff_token(&self, restaurant_id: Uuid) -> String {
        self.token(Role::Staff, restaurant_id, None)
    }

    pub fn admin_token(&self, restaurant_id: Uuid) -> String {
        self.token(Role::Admin, restaurant_id, None)
    }

    pub fn driver_token(&self, restaurant_id: Uuid, driver_id: Uuid) -> String {
        self.token(Role::Driver, restaurant_id, Some(driver_id))
    }

    /// Send a request against the router with an optional bearer token.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(tok) = token {
            builder = builder.header("authorization", format!("Bearer {}", tok));
        }

        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Sends the request and returns the status with the decoded JSON body
    /// (`Value::Null` for empty bodies).
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Value) {
        let response = self.request(method, uri, body, token).await;
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read response body");
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response body is JSON")
        };
        (status, json)
    }

    pub async fn seed_restaurant(&self, slug: &str, order_prefix: &str) -> RestaurantView {
        self.state
            .services
            .restaurants
            .create(RestaurantRequest {
                name: format!("Restaurant {}", slug),
                slug: slug.to_string(),
                phone: Some("555-0100".to_string()),
                address: Some("1 Main Street".to_string()),
                is_active: true,
                delivery_fee: dec!(3.00),
                utc_offset_minutes: 0,
                order_prefix: order_prefix.to_string(),
            })
            .await
            .expect("seed restaurant")
    }

    pub async fn seed_menu(&self, restaurant_id: Uuid) -> SeededMenu {
        let menu = &self.state.services.menu;
        let category = menu
            .create_category(
                restaurant_id,
                CategoryRequest {
                    name: "Pizza".to_string(),
                    description: None,
                    image_url: None,
                    is_active: true,
                },
            )
            .await
            .expect("seed category");

        let section = menu
            .create_section(
                restaurant_id,
                CreateSectionRequest {
                    section: SectionRequest {
                        name: "Extras".to_string(),
                        min_selections: 0,
                        max_selections: 2,
                        is_active: true,
                    },
                    options: vec![
                        SectionOptionRequest {
                            name: "Extra cheese".to_string(),
                            price_adjustment: dec!(1.50),
                            is_active: true,
                        },
                        SectionOptionRequest {
                            name: "Olives".to_string(),
                            price_adjustment: dec!(0.75),
                            is_active: true,
                        },
                    ],
                },
            )
            .await
            .expect("seed section");

        let product = menu
            .create_product(
                restaurant_id,
                CreateProductRequest {
                    product: product_request(category.id, "Margherita", dec!(10.00)),
                    variants: vec![VariantRequest {
                        name: "Large".to_string(),
                        price: dec!(12.50),
                        is_active: true,
                    }],
                    section_ids: vec![section.id],
                },
            )
            .await
            .expect("seed product");

        SeededMenu {
            category_id: category.id,
            product_id: product.id,
            variant_id: product.variants[0].id,
            section_id: section.id,
            option_id: section.options[0].id,
        }
    }

    pub async fn seed_product(&self, restaurant_id: Uuid, category_id: Uuid, name: &str, price: Decimal) -> Uuid {
        self.state
            .services
            .menu
            .create_product(
                restaurant_id,
                CreateProductRequest {
                    product: product_request(category_id, name, price),
                    variants: Vec::new(),
                    section_ids: Vec::new(),
                },
            )
            .await
            .expect("seed product")
            .id
    }

    /// Places a pickup order for one base product through the public API and
    /// returns the order JSON.
    pub async fn place_pickup_order(&self, slug: &str, product_id: Uuid, quantity: i32) -> Value {
        let (status, body) = self
            .call(
                Method::POST,
                &format!("/api/v1/restaurants/{}/orders", slug),
                Some(serde_json::json!({
                    "customer_name": "Ada",
                    "customer_phone": "555-1234",
                    "service_type": "pickup",
                    "payment_method": "cash",
                    "items": [{ "product_id": product_id, "quantity": quantity }]
                })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "place order failed: {}", body);
        body["data"]["order"].clone()
    }
}

pub fn product_request(category_id: Uuid, name: &str, price: Decimal) -> ProductRequest {
    ProductRequest {
        category_id,
        name: name.to_string(),
        description: None,
        price,
        image_url: None,
        is_active: true,
        is_available: true,
    }
}

/// Reads a decimal that the API serialized as a JSON string.
pub fn decimal(value: &Value) -> Decimal {
    value
        .as_str()
        .unwrap_or_else(|| panic!("expected decimal string, got {}", value))
        .parse()
        .expect("valid decimal")
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}
