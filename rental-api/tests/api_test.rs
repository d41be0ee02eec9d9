use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use rental_api::{app, auth::issue_token, AppState, AuthConfig, Repositories};
use rental_catalog::Product;
use rental_store::{InMemoryStore, LogPublisher};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    auth: AuthConfig,
}

impl TestApp {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let auth = AuthConfig { secret: "test-secret".into(), expiration: 3600 };
        let state = AppState::new(Repositories::in_memory(store.clone()), Arc::new(LogPublisher), auth.clone())
            .expect("metrics registry");

        Self { router: app(state), store, auth }
    }

    fn token_for(&self, user_id: Uuid) -> String {
        issue_token(&self.auth, user_id, "USER").unwrap()
    }

    async fn send(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap_or(Value::Null) };
        (status, value)
    }

    /// Company with one rental point in Kazan, owned by a fresh user.
    async fn operator(&self) -> Operator {
        let user_id = Uuid::new_v4();
        let token = self.token_for(user_id);

        let (status, company) = self
            .send(Method::POST, "/v1/companies", Some(&token), Some(json!({ "name": "Velo Kazan" })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        let company_id = company["id"].as_str().unwrap().to_string();

        let (status, point) = self
            .send(
                Method::POST,
                &format!("/v1/companies/{}/rental-points", company_id),
                Some(&token),
                Some(json!({
                    "phone": "+79000000000",
                    "address": { "address": "Baumana 1", "city": "Kazan", "latitude": 55.79, "longitude": 49.12 }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        Operator { token, company_id, point_id: point["id"].as_str().unwrap().to_string() }
    }

    async fn create_offer(&self, op: &Operator, count: i32, product_id: Option<Uuid>) -> String {
        let (status, offer) = self
            .send(
                Method::POST,
                "/v1/offers",
                Some(&op.token),
                Some(json!({ "count": count, "rental_point_id": op.point_id, "product_id": product_id })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        offer["id"].as_str().unwrap().to_string()
    }

    async fn reserve(&self, token: &str, offer_id: &str, count: i32) -> String {
        let (status, reservation) = self
            .send(
                Method::POST,
                &format!("/v1/offers/{}/reservations", offer_id),
                Some(token),
                Some(json!({ "count": count })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(reservation["status"], "new");
        reservation["id"].as_str().unwrap().to_string()
    }

    async fn set_status(&self, token: &str, reservation_id: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PATCH, &format!("/v1/reservations/{}", reservation_id), Some(token), Some(body))
            .await
    }

    async fn offer_count(&self, offer_id: &str) -> i64 {
        let (status, offer) = self.send(Method::GET, &format!("/v1/offers/{}", offer_id), None, None).await;
        assert_eq!(status, StatusCode::OK);
        offer["count"].as_i64().unwrap()
    }
}

struct Operator {
    token: String,
    company_id: String,
    point_id: String,
}

#[tokio::test]
async fn test_guest_token_grants_access() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::POST, "/v1/auth/guest", None, None).await;
    assert_eq!(status, StatusCode::CREATED);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, _) = app.send(Method::GET, "/v1/companies/me", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.send(Method::GET, "/v1/companies/me", Some("not-a-jwt"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app.send(Method::GET, "/v1/companies/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_reserve_accept_done_restores_stock() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 5, None).await;

    let customer = app.token_for(Uuid::new_v4());
    let reservation_id = app.reserve(&customer, &offer_id, 3).await;
    assert_eq!(app.offer_count(&offer_id).await, 5);

    let (status, body) = app.set_status(&op.token, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "accepted");
    assert_eq!(app.offer_count(&offer_id).await, 2);

    let (status, body) = app.set_status(&op.token, &reservation_id, json!({ "status": "done" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "done");
    assert_eq!(app.offer_count(&offer_id).await, 5);
}

#[tokio::test]
async fn test_accept_without_stock_is_rejected() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 2, None).await;
    let reservation_id = app.reserve(&op.token, &offer_id, 3).await;

    let (status, body) = app.set_status(&op.token, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("Insufficient inventory"));

    assert_eq!(app.offer_count(&offer_id).await, 2);
    let (_, reservation) = app
        .send(Method::GET, &format!("/v1/reservations/{}", reservation_id), Some(&op.token), None)
        .await;
    assert_eq!(reservation["status"], "new");
}

#[tokio::test]
async fn test_cancel_new_reservation_keeps_stock() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 3, None).await;
    let reservation_id = app.reserve(&op.token, &offer_id, 2).await;

    let (status, body) = app.set_status(&op.token, &reservation_id, json!({ "status": "canceled" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "canceled");
    assert_eq!(app.offer_count(&offer_id).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_accepts_of_last_item() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 1, None).await;
    let first = app.reserve(&op.token, &offer_id, 1).await;
    let second = app.reserve(&op.token, &offer_id, 1).await;

    let accept = json!({ "status": "accepted" });
    let (a, b) = tokio::join!(
        app.set_status(&op.token, &first, accept.clone()),
        app.set_status(&op.token, &second, accept.clone()),
    );

    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(app.offer_count(&offer_id).await, 0);
}

#[tokio::test]
async fn test_count_override_on_accept() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 5, None).await;
    let reservation_id = app.reserve(&op.token, &offer_id, 1).await;

    let (status, body) = app
        .set_status(&op.token, &reservation_id, json!({ "status": "accepted", "count": 4 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 4);
    assert_eq!(app.offer_count(&offer_id).await, 1);

    // Re-accepting the same reservation takes nothing more.
    let (status, _) = app.set_status(&op.token, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.offer_count(&offer_id).await, 1);
}

#[tokio::test]
async fn test_invalid_requests_are_bad_requests() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 5, None).await;
    let uri = format!("/v1/offers/{}/reservations", offer_id);

    let (status, _) = app.send(Method::POST, &uri, Some(&op.token), Some(json!({ "count": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let window = json!({
        "count": 1,
        "datetime_from": "2024-06-02T10:00:00Z",
        "datetime_to": "2024-06-01T10:00:00Z"
    });
    let (status, _) = app.send(Method::POST, &uri, Some(&op.token), Some(window)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let reservation_id = app.reserve(&op.token, &offer_id, 1).await;
    let (status, body) = app.set_status(&op.token, &reservation_id, json!({ "status": "pending" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = app
        .set_status(&op.token, &reservation_id, json!({ "status": "accepted", "count": -1 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.offer_count(&offer_id).await, 5);

    let (status, _) = app
        .send(Method::POST, "/v1/offers", Some(&op.token), Some(json!({ "count": -1, "rental_point_id": op.point_id })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_resources_are_not_found() {
    let app = TestApp::new();
    let token = app.token_for(Uuid::new_v4());
    let missing = Uuid::new_v4();

    let (status, _) = app
        .send(Method::POST, &format!("/v1/offers/{}/reservations", missing), Some(&token), Some(json!({ "count": 1 })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .set_status(&token, &missing.to_string(), json!({ "status": "accepted" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.send(Method::GET, &format!("/v1/offers/{}", missing), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_company_rules() {
    let app = TestApp::new();
    let op = app.operator().await;

    let (status, _) = app
        .send(Method::POST, "/v1/companies", Some(&op.token), Some(json!({ "name": "Second" })))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let stranger = app.token_for(Uuid::new_v4());
    let (status, _) = app
        .send(
            Method::POST,
            &format!("/v1/companies/{}/rental-points", op.company_id),
            Some(&stranger),
            Some(json!({ "phone": "+79000000001" })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, me) = app.send(Method::GET, "/v1/companies/me", Some(&op.token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["rental_points"].as_array().unwrap().len(), 1);

    let (status, board) = app.send(Method::GET, "/v1/companies/board", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(board.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_offer_filters_ratings_and_board() {
    let app = TestApp::new();
    let op = app.operator().await;
    let bike = app.store.seed_product(Product::new("City bike", Some("Bicycles".into()))).await;
    let skis = app.store.seed_product(Product::new("Skis", Some("Winter sports".into()))).await;

    let bike_offer = app.create_offer(&op, 4, Some(bike.id)).await;
    let ski_offer = app.create_offer(&op, 2, Some(skis.id)).await;

    let (status, _) = app
        .send(Method::PATCH, &format!("/v1/offers/{}", ski_offer), Some(&op.token), Some(json!({ "is_active": false })))
        .await;
    assert_eq!(status, StatusCode::OK);

    for mark in [5, 4] {
        let (status, _) = app
            .send(
                Method::POST,
                &format!("/v1/offers/{}/ratings", bike_offer),
                Some(&app.token_for(Uuid::new_v4())),
                Some(json!({ "mark": mark, "comment": "fine" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, _) = app
        .send(Method::POST, &format!("/v1/offers/{}/ratings", bike_offer), Some(&op.token), Some(json!({ "mark": 6 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, found) = app.send(Method::GET, "/v1/offers?category=BICY&city=kazan", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["id"], bike_offer.as_str());
    assert_eq!(found[0]["general_rating"], 4.5);
    assert_eq!(found[0]["product"], "City bike");

    let (_, found) = app.send(Method::GET, "/v1/offers?company=velo", None, None).await;
    assert_eq!(found.as_array().unwrap().len(), 2);

    let (_, found) = app.send(Method::GET, "/v1/offers?city=moscow", None, None).await;
    assert!(found.as_array().unwrap().is_empty());

    let (_, board) = app.send(Method::GET, "/v1/offers/board", None, None).await;
    let board = board.as_array().unwrap();
    assert_eq!(board.len(), 1);
    assert_eq!(board[0]["rental_point"], "Baumana 1");

    let (_, point) = app.send(Method::GET, &format!("/v1/rental-points/{}", op.point_id), None, None).await;
    assert_eq!(point["general_rating"], 4.5);
}

#[tokio::test]
async fn test_prices_sorted_by_threshold() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 1, None).await;
    let uri = format!("/v1/offers/{}/prices", offer_id);

    for body in [
        json!({ "time_from": 1, "time_from_unit": "day", "price_per_time": 900.0, "price_per_time_unit": "day" }),
        json!({ "time_from": 30, "time_from_unit": "minute", "price_per_time": 150.0 }),
    ] {
        let (status, _) = app.send(Method::POST, &uri, Some(&op.token), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, prices) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    let units: Vec<&str> = prices
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["time_from_unit"].as_str().unwrap())
        .collect();
    assert_eq!(units, vec!["minute", "day"]);
}

#[tokio::test]
async fn test_delete_offer_removes_reservations() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 2, None).await;
    let reservation_id = app.reserve(&op.token, &offer_id, 1).await;

    let (status, _) = app.send(Method::DELETE, &format!("/v1/offers/{}", offer_id), Some(&op.token), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .send(Method::GET, &format!("/v1/reservations/{}", reservation_id), Some(&op.token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_rental_point_reservations_view() {
    let app = TestApp::new();
    let op = app.operator().await;
    let first = app.create_offer(&op, 2, None).await;
    let second = app.create_offer(&op, 2, None).await;
    app.reserve(&op.token, &first, 1).await;
    app.reserve(&op.token, &second, 2).await;

    let (status, list) = app
        .send(Method::GET, &format!("/v1/rental-points/{}/reservations", op.point_id), Some(&op.token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 2);

    let (status, offers) = app
        .send(Method::GET, &format!("/v1/rental-points/{}/offers", op.point_id), None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(offers.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_metrics_count_transitions() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 1, None).await;
    let reservation_id = app.reserve(&op.token, &offer_id, 2).await;

    let (status, _) = app.set_status(&op.token, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.set_status(&op.token, &reservation_id, json!({ "status": "declined" })).await;
    assert_eq!(status, StatusCode::OK);

    let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("rental_reservations_created_total 1"));
    assert!(text.contains("rental_inventory_rejections_total 1"));
    assert!(text.contains(r#"rental_reservation_transitions_total{from="new",to="declined"} 1"#));
}

#[tokio::test]
async fn test_only_operator_moves_reservations() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 5, None).await;

    let customer = app.token_for(Uuid::new_v4());
    let reservation_id = app.reserve(&customer, &offer_id, 3).await;

    let (status, _) = app.set_status(&customer, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(app.offer_count(&offer_id).await, 5);

    let (status, reservation) = app
        .send(Method::GET, &format!("/v1/reservations/{}", reservation_id), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reservation["status"], "new");

    let stranger = app.token_for(Uuid::new_v4());
    let (status, _) = app
        .send(Method::GET, &format!("/v1/reservations/{}", reservation_id), Some(&stranger), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, &format!("/v1/offers/{}/reservations", offer_id), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::GET, &format!("/v1/rental-points/{}/reservations", op.point_id), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.set_status(&op.token, &reservation_id, json!({ "status": "accepted" })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.offer_count(&offer_id).await, 2);
}

#[tokio::test]
async fn test_strangers_cannot_touch_offers() {
    let app = TestApp::new();
    let op = app.operator().await;
    let offer_id = app.create_offer(&op, 4, None).await;
    let stranger = app.token_for(Uuid::new_v4());
    let uri = format!("/v1/offers/{}", offer_id);

    let (status, _) = app.send(Method::PATCH, &uri, Some(&stranger), Some(json!({ "count": 0 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.send(Method::DELETE, &uri, Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(
            Method::POST,
            &format!("{}/prices", uri),
            Some(&stranger),
            Some(json!({ "time_from": 1, "price_per_time": 100.0 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .send(Method::POST, "/v1/offers", Some(&stranger), Some(json!({ "count": 1, "rental_point_id": op.point_id })))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    assert_eq!(app.offer_count(&offer_id).await, 4);
}

#[tokio::test]
async fn test_offer_cannot_move_to_foreign_point() {
    let app = TestApp::new();
    let op = app.operator().await;
    let other = app.operator().await;
    let offer_id = app.create_offer(&op, 2, None).await;

    let (status, _) = app
        .send(
            Method::PATCH,
            &format!("/v1/offers/{}", offer_id),
            Some(&op.token),
            Some(json!({ "rental_point_id": other.point_id })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, offer) = app.send(Method::GET, &format!("/v1/offers/{}", offer_id), None, None).await;
    assert_eq!(offer["rental_point_id"], op.point_id.as_str());
}
