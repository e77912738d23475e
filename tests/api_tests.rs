use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use sea_orm::ConnectionTrait;
use sea_orm_migration::MigratorTrait;
use seasonpass::api::AppState;
use seasonpass::config::Config;
use seasonpass::db::migrator::Migrator;
use seasonpass::domain::OrderStatus;
use seasonpass::services::{InvoiceError, InvoiceGenerator, InvoiceRequest, IssuedInvoice};

const ADMIN_EMAIL: &str = "ops@drama.example";
const ADMIN_PASSWORD: &str = "integration-admin-password";

const FRONTEND_URL: &str = "https://drama.example";

#[derive(Default)]
struct RecordingInvoices {
    issued: Mutex<Vec<String>>,
}

#[async_trait]
impl InvoiceGenerator for RecordingInvoices {
    async fn generate(&self, request: &InvoiceRequest) -> Result<IssuedInvoice, InvoiceError> {
        let mut issued = self.issued.lock().unwrap();
        issued.push(request.order_id.clone());
        Ok(IssuedInvoice {
            document_id: format!("doc-{}", issued.len()),
            number: format!("{}", 1000 + issued.len()),
            url: Some(format!("https://invoices.example/{}", request.order_id)),
        })
    }
}

struct TestApp {
    router: Router,
    state: Arc<AppState>,
    invoices: Arc<RecordingInvoices>,
    admin_key: String,
}

impl TestApp {
    async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str, api_key: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("X-Api-Key", key);
        }
        self.request(builder.body(Body::empty()).unwrap()).await
    }

    async fn post_json(&self, uri: &str, api_key: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(key) = api_key {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        self.request(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Posts a provider callback and returns the redirect location.
    async fn callback(&self, path: &str, fields: &[(&str, &str)]) -> String {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();

        let response = self
            .router
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/season-pass/tranzila/{path}"))
                    .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        response.headers()[header::LOCATION]
            .to_str()
            .unwrap()
            .to_string()
    }

    async fn signed_callback(&self, path: &str, order: &Value, response_code: &str) -> String {
        let order_id = order["orderId"].as_str().unwrap();
        let user_id = order["userId"].to_string();
        let series_id = order["seriesId"].to_string();
        let sig = self
            .state
            .shared
            .tranzila
            .sign(order_id, &user_id, &series_id)
            .unwrap();

        self.callback(
            path,
            &[
                ("Response", response_code),
                ("orderId", order_id),
                ("userId", user_id.as_str()),
                ("seriesId", series_id.as_str()),
                ("sig", sig.as_str()),
                ("index", "90210"),
                ("ConfirmationCode", "0001234"),
            ],
        )
        .await
    }

    async fn order_status(&self, order_id: &str) -> OrderStatus {
        self.state
            .store()
            .get_order(order_id)
            .await
            .unwrap()
            .expect("order exists")
            .status
    }

    async fn register(&self, email: &str) -> (i64, String) {
        let (status, body) = self
            .post_json(
                "/api/auth/register",
                None,
                json!({ "email": email, "password": "correct-horse-battery" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        (
            body["data"]["userId"].as_i64().unwrap(),
            body["data"]["apiKey"].as_str().unwrap().to_string(),
        )
    }

    async fn create_series(&self, price: f64) -> i64 {
        let (status, body) = self
            .post_json(
                "/api/admin/series",
                Some(&self.admin_key),
                json!({
                    "title": "The Heiress",
                    "totalEpisodes": 10,
                    "freeEpisodesCount": 2,
                    "seasonPassPrice": price,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_i64().unwrap()
    }

    async fn create_coupon(&self, coupon: Value) {
        let (status, body) = self
            .post_json("/api/admin/coupons", Some(&self.admin_key), coupon)
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    /// Creates an order and returns it with the ids the callback must echo.
    async fn create_order(
        &self,
        api_key: &str,
        user_id: i64,
        series_id: i64,
        coupon: Option<&str>,
    ) -> Value {
        let (status, body) = self
            .post_json(
                "/api/season-pass/create-order",
                Some(api_key),
                json!({
                    "seriesId": series_id,
                    "customerEmail": "dana@example.com",
                    "customerName": "Dana Levi",
                    "customerPhone": "0501234567",
                    "couponCode": coupon,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");

        let mut order = body["data"].clone();
        order["userId"] = json!(user_id);
        order["seriesId"] = json!(series_id);
        order
    }
}

fn test_config() -> Config {
    let db_path = std::env::temp_dir().join(format!("seasonpass-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}?mode=rwc", db_path.display());
    config.server.frontend_url = FRONTEND_URL.to_string();
    config.server.public_api_url = "https://api.drama.example".to_string();
    config.tranzila.terminal_name = "dramatest".to_string();
    config.tranzila.callback_secret = "integration-secret".to_string();
    config.security.admin_email = ADMIN_EMAIL.to_string();
    config.security.admin_password = ADMIN_PASSWORD.to_string();
    config
}

async fn spawn_app() -> TestApp {
    let invoices = Arc::new(RecordingInvoices::default());
    let state = seasonpass::api::create_app_state_with_invoices(test_config(), invoices.clone())
        .await
        .expect("Failed to create app state");
    let router = seasonpass::api::router(state.clone()).await;

    let admin_key = state
        .store()
        .get_user_by_email(ADMIN_EMAIL)
        .await
        .unwrap()
        .expect("admin is bootstrapped from config")
        .api_key;

    TestApp {
        router,
        state,
        invoices,
        admin_key,
    }
}

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let (status, body) = app.get("/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "ok");
}

#[tokio::test]
async fn test_pricing_with_percentage_coupon() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;

    let (status, body) = app
        .get(&format!("/api/season-pass/pricing/{series_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["basePrice"], 99.9);
    assert_eq!(body["data"]["finalPrice"], 99.9);
    assert_eq!(body["data"]["discountAmount"], 0.0);
    assert_eq!(body["data"]["currency"], "ILS");
    assert_eq!(body["data"]["freeEpisodesCount"], 2);
    assert_eq!(body["data"]["totalEpisodesCount"], 10);

    app.create_coupon(json!({
        "code": "launch20",
        "discountType": "percentage",
        "discountValue": 20,
    }))
    .await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": " Launch20 ", "seriesId": series_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["couponCode"], "LAUNCH20");
    assert_eq!(body["data"]["discountAmount"], 19.98);
    assert_eq!(body["data"]["finalPrice"], 79.92);

    let (status, body) = app
        .get(
            &format!("/api/season-pass/pricing/{series_id}?couponCode=launch20"),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["finalPrice"], 79.92);
}

#[tokio::test]
async fn test_fixed_coupon_never_goes_below_zero() {
    let app = spawn_app().await;
    let series_id = app.create_series(49.0).await;

    app.create_coupon(json!({
        "code": "FREEBIE",
        "discountType": "fixed",
        "discountValue": 500,
    }))
    .await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": "FREEBIE", "seriesId": series_id }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["discountAmount"], 49.0);
    assert_eq!(body["data"]["finalPrice"], 0.0);
}

#[tokio::test]
async fn test_coupon_rejections() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let other_series = app.create_series(59.90).await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": "NOPE", "seriesId": series_id }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "קופון לא נמצא");

    app.create_coupon(json!({
        "code": "OLDIE",
        "discountType": "percentage",
        "discountValue": 10,
        "validUntil": (Utc::now() - Duration::days(1)).to_rfc3339(),
    }))
    .await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": "OLDIE", "seriesId": series_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "הקופון פג תוקף");

    app.create_coupon(json!({
        "code": "HEIRESS10",
        "discountType": "percentage",
        "discountValue": 10,
        "seriesId": series_id,
    }))
    .await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": "HEIRESS10", "seriesId": other_series }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "הקופון אינו תקף לסדרה זו");

    app.create_coupon(json!({
        "code": "PAUSED",
        "discountType": "fixed",
        "discountValue": 5,
        "isActive": false,
    }))
    .await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/validate-coupon",
            None,
            json!({ "code": "PAUSED", "seriesId": series_id }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "הקופון אינו פעיל");
}

#[tokio::test]
async fn test_unknown_series_pricing_is_not_found() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/season-pass/pricing/9999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.get("/api/season-pass/pricing/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_create_order_requires_auth() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;

    let (status, _) = app
        .post_json(
            "/api/season-pass/create-order",
            None,
            json!({
                "seriesId": series_id,
                "customerEmail": "dana@example.com",
                "customerName": "Dana Levi",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/api/season-pass/create-order",
            Some("wrong-key"),
            json!({
                "seriesId": series_id,
                "customerEmail": "dana@example.com",
                "customerName": "Dana Levi",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_create_order_validates_customer() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (_, api_key) = app.register("dana@example.com").await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/create-order",
            Some(&api_key),
            json!({
                "seriesId": series_id,
                "customerEmail": "not-an-email",
                "customerName": "Dana Levi",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "כתובת אימייל לא תקינה");
}

#[tokio::test]
async fn test_purchase_flow_activates_pass() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;

    let (_, body) = app
        .get(
            &format!("/api/season-pass/check-access/{series_id}"),
            Some(&api_key),
        )
        .await;
    assert_eq!(body["data"]["hasAccess"], false);

    let order = app.create_order(&api_key, user_id, series_id, None).await;
    let order_id = order["orderId"].as_str().unwrap().to_string();

    assert!(order_id.starts_with("ORD-"));
    assert!(seasonpass::domain::OrderId::parse(&order_id).is_some());
    assert_eq!(order["amount"], 99.9);
    assert_eq!(order["currency"], "ILS");

    let payment_url = url::Url::parse(order["paymentUrl"].as_str().unwrap()).unwrap();
    assert_eq!(payment_url.path(), "/dramatest/iframenew.php");
    let params: std::collections::HashMap<_, _> = payment_url.query_pairs().into_owned().collect();
    assert_eq!(params["sum"], "99.90");
    assert_eq!(params["orderId"], order_id);
    assert_eq!(
        params["success_url_address"],
        "https://api.drama.example/api/season-pass/tranzila/success"
    );

    assert_eq!(app.order_status(&order_id).await, OrderStatus::Pending);

    let location = app.signed_callback("success", &order, "000").await;
    assert_eq!(
        location,
        format!("{FRONTEND_URL}/payment/success?orderId={order_id}")
    );
    assert_eq!(app.order_status(&order_id).await, OrderStatus::Active);
    assert_eq!(app.invoices.issued.lock().unwrap().as_slice(), [order_id.clone()]);

    // Replayed callback is a no-op.
    let location = app.signed_callback("success", &order, "000").await;
    assert!(location.starts_with(&format!("{FRONTEND_URL}/payment/success")));
    assert_eq!(app.invoices.issued.lock().unwrap().len(), 1);

    let (_, body) = app
        .get(
            &format!("/api/season-pass/check-access/{series_id}"),
            Some(&api_key),
        )
        .await;
    assert_eq!(body["data"]["hasAccess"], true);
    assert!(body["data"]["purchaseDate"].is_string());

    let (status, body) = app.get("/api/season-pass/my-passes", Some(&api_key)).await;
    assert_eq!(status, StatusCode::OK);
    let passes = body["data"].as_array().unwrap();
    assert_eq!(passes.len(), 1);
    assert_eq!(passes[0]["orderId"], order_id.as_str());
    assert_eq!(passes[0]["status"], "active");
    assert_eq!(passes[0]["series"]["title"], "The Heiress");

    let (status, body) = app
        .get(&format!("/api/season-pass/invoice/{order_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"]["invoiceUrl"],
        format!("https://invoices.example/{order_id}")
    );
    assert_eq!(body["data"]["invoiceNumber"], "1001");

    let order = app.state.store().get_order(&order_id).await.unwrap().unwrap();
    assert_eq!(order.transaction_id.as_deref(), Some("90210"));
}

#[tokio::test]
async fn test_check_access_anonymous_is_false() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;

    let (status, body) = app
        .get(&format!("/api/season-pass/check-access/{series_id}"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["hasAccess"], false);
    assert!(body["data"]["purchaseDate"].is_null());
}

#[tokio::test]
async fn test_declined_payment_leaves_order_pending() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;
    let order_id = order["orderId"].as_str().unwrap();

    let location = app.signed_callback("success", &order, "004").await;
    assert_eq!(
        location,
        format!("{FRONTEND_URL}/payment/fail?orderId={order_id}&reason=declined")
    );
    assert_eq!(app.order_status(order_id).await, OrderStatus::Pending);
    assert!(app.invoices.issued.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_tampered_callback_is_rejected() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;
    let order_id = order["orderId"].as_str().unwrap();
    let user = user_id.to_string();
    let series = series_id.to_string();

    let location = app
        .callback(
            "success",
            &[
                ("Response", "000"),
                ("orderId", order_id),
                ("userId", user.as_str()),
                ("seriesId", series.as_str()),
                ("sig", "deadbeef"),
            ],
        )
        .await;
    assert!(location.ends_with("reason=invalid_signature"), "{location}");
    assert_eq!(app.order_status(order_id).await, OrderStatus::Pending);

    // Signed for another user of the same order id.
    let forged_user = (user_id + 1).to_string();
    let sig = app
        .state
        .shared
        .tranzila
        .sign(order_id, &forged_user, &series)
        .unwrap();
    let location = app
        .callback(
            "success",
            &[
                ("Response", "000"),
                ("orderId", order_id),
                ("userId", forged_user.as_str()),
                ("seriesId", series.as_str()),
                ("sig", sig.as_str()),
            ],
        )
        .await;
    assert!(location.ends_with("reason=invalid_request"), "{location}");
    assert_eq!(app.order_status(order_id).await, OrderStatus::Pending);

    let location = app.callback("success", &[("garbage", "1")]).await;
    assert!(location.starts_with(&format!("{FRONTEND_URL}/payment/fail")));
}

#[tokio::test]
async fn test_success_for_unknown_order_redirects_to_fail() {
    let app = spawn_app().await;
    let order = json!({ "orderId": "ORD-1-00000000", "userId": 1, "seriesId": 1 });

    let location = app.signed_callback("success", &order, "000").await;
    assert!(location.ends_with("reason=order_not_found"), "{location}");
}

#[tokio::test]
async fn test_fail_callback_marks_order_failed() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;
    let order_id = order["orderId"].as_str().unwrap();

    let location = app.signed_callback("fail", &order, "033").await;
    assert!(location.starts_with(&format!("{FRONTEND_URL}/payment/fail?orderId={order_id}")));
    assert_eq!(app.order_status(order_id).await, OrderStatus::Failed);

    // A late success cannot revive a failed order.
    let location = app.signed_callback("success", &order, "000").await;
    assert!(location.ends_with("reason=invalid_status"), "{location}");
    assert_eq!(app.order_status(order_id).await, OrderStatus::Failed);

    let (_, body) = app.get("/api/season-pass/my-passes", Some(&api_key)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_coupon_usage_cap_is_enforced() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;

    app.create_coupon(json!({
        "code": "ONCE",
        "discountType": "percentage",
        "discountValue": 50,
        "maxUses": 1,
    }))
    .await;

    let first = app
        .create_order(&api_key, user_id, series_id, Some("once"))
        .await;
    assert_eq!(first["amount"], 49.95);

    let (status, body) = app
        .post_json(
            "/api/season-pass/create-order",
            Some(&api_key),
            json!({
                "seriesId": series_id,
                "customerEmail": "dana@example.com",
                "customerName": "Dana Levi",
                "couponCode": "ONCE",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "הקופון הגיע למכסת השימושים");

    // Failing the first order gives the use back.
    app.signed_callback("fail", &first, "005").await;
    let coupon = app.state.store().get_coupon("ONCE").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 0);

    app.create_order(&api_key, user_id, series_id, Some("ONCE"))
        .await;
    let coupon = app.state.store().get_coupon("ONCE").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[tokio::test]
async fn test_stale_orders_expire_and_late_payment_still_activates() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;

    app.create_coupon(json!({
        "code": "LATE10",
        "discountType": "percentage",
        "discountValue": 10,
    }))
    .await;

    let order = app
        .create_order(&api_key, user_id, series_id, Some("LATE10"))
        .await;
    let order_id = order["orderId"].as_str().unwrap();

    let expired = app
        .state
        .season_pass_service()
        .expire_stale_orders(Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(expired, 1);
    assert_eq!(app.order_status(order_id).await, OrderStatus::Expired);

    let coupon = app.state.store().get_coupon("LATE10").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 0);

    // Nothing left to sweep.
    let expired = app
        .state
        .season_pass_service()
        .expire_stale_orders(Utc::now() + Duration::minutes(1))
        .await
        .unwrap();
    assert_eq!(expired, 0);

    let location = app.signed_callback("success", &order, "000").await;
    assert!(location.starts_with(&format!("{FRONTEND_URL}/payment/success")));
    assert_eq!(app.order_status(order_id).await, OrderStatus::Active);

    let coupon = app.state.store().get_coupon("LATE10").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[tokio::test]
async fn test_fresh_orders_survive_sweep() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;

    let expired = seasonpass::scheduler::sweep_once(app.state.season_pass_service().as_ref(), 30)
        .await
        .unwrap();
    assert_eq!(expired, 0);
    assert_eq!(
        app.order_status(order["orderId"].as_str().unwrap()).await,
        OrderStatus::Pending
    );
}

#[tokio::test]
async fn test_locked_episodes() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;

    for number in [1, 3] {
        let (status, body) = app
            .post_json(
                &format!("/api/admin/series/{series_id}/episodes"),
                Some(&app.admin_key),
                json!({
                    "episodeNumber": number,
                    "title": format!("Episode {number}"),
                    "videoUrl": format!("https://cdn.example/{number}.m3u8"),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    let (status, body) = app
        .get(&format!("/api/series/{series_id}/episodes"), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    let episodes = body["data"].as_array().unwrap();
    assert_eq!(episodes.len(), 2);
    assert_eq!(episodes[0]["isLocked"], false);
    assert_eq!(episodes[0]["videoUrl"], "https://cdn.example/1.m3u8");
    assert_eq!(episodes[1]["isLocked"], true);
    assert!(episodes[1].get("videoUrl").is_none());

    let (status, _) = app
        .get(&format!("/api/series/{series_id}/episodes/3"), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;
    app.signed_callback("success", &order, "000").await;

    let (status, body) = app
        .get(&format!("/api/series/{series_id}/episodes/3"), Some(&api_key))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["videoUrl"], "https://cdn.example/3.m3u8");

    let (_, body) = app
        .get(&format!("/api/series/{series_id}/episodes"), Some(&api_key))
        .await;
    assert!(
        body["data"]
            .as_array()
            .unwrap()
            .iter()
            .all(|ep| ep["isLocked"] == false)
    );
}

#[tokio::test]
async fn test_admin_routes_require_admin() {
    let app = spawn_app().await;
    let (_, api_key) = app.register("dana@example.com").await;

    let (status, _) = app.get("/api/admin/coupons", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.get("/api/admin/coupons", Some(&api_key)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.get("/api/admin/coupons", Some(&app.admin_key)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_login_and_key_rotation() {
    let app = spawn_app().await;
    let (_, first_key) = app.register("dana@example.com").await;

    let (status, _) = app
        .post_json(
            "/api/auth/register",
            None,
            json!({ "email": "dana@example.com", "password": "correct-horse-battery" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "dana@example.com", "password": "wrong-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "dana@example.com", "password": "correct-horse-battery" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["apiKey"], first_key.as_str());

    let (status, body) = app.get("/api/auth/me", Some(&first_key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "dana@example.com");
    assert_eq!(body["data"]["isAdmin"], false);

    let (status, body) = app
        .post_json("/api/auth/api-key/regenerate", Some(&first_key), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let new_key = body["data"]["apiKey"].as_str().unwrap().to_string();
    assert_ne!(new_key, first_key);

    let (status, _) = app.get("/api/auth/me", Some(&first_key)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = app.get("/api/auth/me", Some(&new_key)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invoice_lookup_validates_order_id() {
    let app = spawn_app().await;

    let (status, _) = app.get("/api/season-pass/invoice/not-an-order", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .get("/api/season-pass/invoice/ORD-1700000000000-abcdef12", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_second_order_for_owned_series_is_conflict() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;

    app.create_coupon(json!({
        "code": "AGAIN",
        "discountType": "fixed",
        "discountValue": 10,
    }))
    .await;

    let order = app.create_order(&api_key, user_id, series_id, None).await;
    app.signed_callback("success", &order, "000").await;

    let (status, body) = app
        .post_json(
            "/api/season-pass/create-order",
            Some(&api_key),
            json!({
                "seriesId": series_id,
                "customerEmail": "dana@example.com",
                "customerName": "Dana Levi",
                "couponCode": "AGAIN",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "כבר רכשת מנוי עונתי לסדרה זו");

    let coupon = app.state.store().get_coupon("AGAIN").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 0);

    // Another customer can still buy the same series.
    let (other_id, other_key) = app.register("noa@example.com").await;
    app.create_order(&other_key, other_id, series_id, None).await;
}

#[tokio::test]
async fn test_activation_only_matches_the_current_status() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;
    let (user_id, api_key) = app.register("dana@example.com").await;
    let order = app.create_order(&api_key, user_id, series_id, None).await;
    let order_id = order["orderId"].as_str().unwrap();
    let store = app.state.store();

    assert!(
        store
            .transition_order(order_id, OrderStatus::Pending, OrderStatus::Expired)
            .await
            .unwrap()
    );

    // Swept after the callback read it as pending.
    assert!(
        !store
            .activate_order(order_id, OrderStatus::Pending, Some("tx-1"), Utc::now())
            .await
            .unwrap()
    );
    assert!(
        store
            .activate_order(order_id, OrderStatus::Expired, Some("tx-1"), Utc::now())
            .await
            .unwrap()
    );
    assert_eq!(app.order_status(order_id).await, OrderStatus::Active);

    assert!(
        store
            .activate_order(order_id, OrderStatus::Active, Some("tx-1"), Utc::now())
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_orders_respect_coupon_cap() {
    let app = spawn_app().await;
    let series_id = app.create_series(99.90).await;

    app.create_coupon(json!({
        "code": "FIRSTONE",
        "discountType": "percentage",
        "discountValue": 25,
        "maxUses": 1,
    }))
    .await;

    let mut buyers = Vec::new();
    for n in 0..8 {
        let (_, api_key) = app.register(&format!("buyer{n}@example.com")).await;
        buyers.push(api_key);
    }

    let mut requests = tokio::task::JoinSet::new();
    for api_key in buyers {
        let router = app.router.clone();
        let body = json!({
            "seriesId": series_id,
            "customerEmail": "buyer@example.com",
            "customerName": "Buyer",
            "couponCode": "FIRSTONE",
        })
        .to_string();

        requests.spawn(async move {
            let request = Request::builder()
                .method("POST")
                .uri("/api/season-pass/create-order")
                .header(header::CONTENT_TYPE, "application/json")
                .header(header::AUTHORIZATION, format!("Bearer {api_key}"))
                .body(Body::from(body))
                .unwrap();
            router.oneshot(request).await.unwrap().status()
        });
    }

    let statuses = requests.join_all().await;
    let created = statuses
        .iter()
        .filter(|status| **status == StatusCode::CREATED)
        .count();
    assert_eq!(created, 1, "{statuses:?}");
    assert!(
        statuses
            .iter()
            .all(|status| *status == StatusCode::CREATED || *status == StatusCode::BAD_REQUEST),
        "{statuses:?}"
    );

    let coupon = app.state.store().get_coupon("FIRSTONE").await.unwrap().unwrap();
    assert_eq!(coupon.used_count, 1);
}

#[tokio::test]
async fn test_catalog_errors_are_in_hebrew() {
    let app = spawn_app().await;

    let (status, body) = app
        .post_json(
            "/api/admin/coupons",
            Some(&app.admin_key),
            json!({
                "code": "TOOMUCH",
                "discountType": "percentage",
                "discountValue": 120,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "הנחה באחוזים חייבת להיות גדולה מ-0 ועד 100");

    app.create_coupon(json!({
        "code": "WELCOME",
        "discountType": "fixed",
        "discountValue": 5,
    }))
    .await;
    let (status, body) = app
        .post_json(
            "/api/admin/coupons",
            Some(&app.admin_key),
            json!({
                "code": "welcome",
                "discountType": "fixed",
                "discountValue": 5,
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "קופון WELCOME כבר קיים");

    let (status, body) = app
        .post_json(
            "/api/admin/series",
            Some(&app.admin_key),
            json!({ "title": "  ", "totalEpisodes": 10, "freeEpisodesCount": 2 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "שם הסדרה הוא שדה חובה");
}

#[tokio::test]
async fn test_admin_comes_from_config_only() {
    let app = spawn_app().await;

    let (status, _) = app
        .get(
            "/api/admin/coupons",
            Some("seasonpass_default_admin_key_please_regenerate"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "admin@seasonpass.local", "password": "password" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["apiKey"], app.admin_key.as_str());

    let (_, body) = app.get("/api/auth/me", Some(&app.admin_key)).await;
    assert_eq!(body["data"]["isAdmin"], true);
}

#[tokio::test]
async fn test_legacy_admin_key_is_revoked_on_upgrade() {
    let app = spawn_app().await;
    app.register("legacy@example.com").await;
    let conn = &app.state.store().conn;

    // Shape left behind by builds that seeded a fixed admin key.
    conn.execute_unprepared(
        "UPDATE users SET api_key = 'seasonpass_default_admin_key_please_regenerate', is_admin = 1 \
         WHERE email = 'legacy@example.com'",
    )
    .await
    .unwrap();
    let (status, _) = app
        .get(
            "/api/admin/coupons",
            Some("seasonpass_default_admin_key_please_regenerate"),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    Migrator::down(conn, Some(1)).await.unwrap();
    Migrator::up(conn, None).await.unwrap();

    let (status, _) = app
        .get(
            "/api/admin/coupons",
            Some("seasonpass_default_admin_key_please_regenerate"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .post_json(
            "/api/auth/login",
            None,
            json!({ "email": "legacy@example.com", "password": "correct-horse-battery" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
