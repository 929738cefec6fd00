//! End-to-end marketplace flow against a real PostgreSQL.
//!
//! Run with `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

use actix_middleware::JwtAuthMiddleware;
use actix_web::{http::StatusCode, test, App};
use api_service::config::{
    AppConfig, Config, CorsConfig, OAuthConfig, PaymentConfig, StorageConfig, UploadConfig,
};
use api_service::db;
use api_service::jobs::payment_expiry;
use api_service::routes::configure_routes;
use api_service::storage::MemoryBlobStore;
use api_service::AppState;
use crypto_core::JwtConfig;
use serde_json::{json, Value};
use serial_test::serial;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;
use wiremock::matchers::{bearer_token, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> Config {
    Config {
        app: AppConfig {
            env: "test".into(),
            host: "127.0.0.1".into(),
            port: 0,
            json_logs: false,
        },
        cors: CorsConfig {
            allowed_origins: "http://localhost:5173".into(),
        },
        jwt: JwtConfig {
            access_secret: "flow-test-access-secret-0123456789abcdef".into(),
            refresh_secret: "flow-test-refresh-secret-fedcba9876543210".into(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 3600,
        },
        storage: StorageConfig {
            account: "bazaritest".into(),
            account_key: "a2V5".into(),
            container: "listings".into(),
            endpoint: "http://127.0.0.1:10000/bazaritest".into(),
            sas_ttl_secs: 3600,
        },
        upload: UploadConfig {
            max_bytes: 1024 * 1024,
            max_retries: 0,
            max_files: 10,
        },
        oauth: OAuthConfig::default(),
        payments: PaymentConfig::default(),
    }
}

struct Harness {
    state: AppState,
    payments: PaymentConfig,
    pool: PgPool,
    store: Arc<MemoryBlobStore>,
}

async fn build_with(config: Config) -> Harness {
    let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&url)
        .await
        .expect("connect postgres");
    db::MIGRATOR.run(&pool).await.expect("run migrations");

    let store = Arc::new(MemoryBlobStore::new());
    let state = AppState::new(&config, pool.clone(), store.clone(), reqwest::Client::new())
        .expect("state");
    Harness {
        state,
        payments: config.payments,
        pool,
        store,
    }
}

async fn build_state() -> (AppState, PaymentConfig) {
    let harness = build_with(test_config()).await;
    (harness.state, harness.payments)
}

macro_rules! app {
    ($state:expr) => {{
        let state = $state.clone();
        test::init_service(
            App::new()
                .configure(|cfg| state.configure(cfg))
                .wrap(JwtAuthMiddleware::new(state.jwt.clone()))
                .configure(configure_routes),
        )
        .await
    }};
}

fn unique_email(prefix: &str) -> String {
    format!("{prefix}-{}@example.com", Uuid::new_v4().simple())
}

/// Register a fresh account; evaluates to `(bearer header, user id)`
macro_rules! signup {
    ($app:expr, $name:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({
                "email": unique_email($name),
                "password": "market2024",
                "name": $name
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let token = body["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
        let id = body["data"]["user"]["id"].as_str().unwrap().to_string();
        (("Authorization", format!("Bearer {token}")), id)
    }};
}

/// Create a listing; evaluates to its id
macro_rules! list_item {
    ($app:expr, $auth:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/posts")
            .insert_header($auth.clone())
            .set_json($body)
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        body["data"]["id"].as_str().unwrap().to_string()
    }};
}

/// Start a purchase; evaluates to `(payment id, reference)`
macro_rules! start_purchase {
    ($app:expr, $auth:expr, $post_id:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/payments")
            .insert_header($auth.clone())
            .set_json(json!({
                "post_id": $post_id,
                "purpose": "purchase",
                "phone_number": "+237690000000",
                "provider": "orange"
            }))
            .to_request();
        let resp = test::call_service(&$app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        (
            body["data"]["payment"]["id"].as_str().unwrap().to_string(),
            body["data"]["payment"]["reference"].as_str().unwrap().to_string(),
        )
    }};
}

/// Companion-app confirmation; evaluates to the response
macro_rules! confirm {
    ($app:expr, $key:expr, $reference:expr, $amount:expr) => {{
        let req = test::TestRequest::post()
            .uri("/api/v1/payments/confirm")
            .insert_header(("X-Companion-Key", $key.clone()))
            .set_json(json!({
                "reference": $reference,
                "transaction_id": format!("OM{}", Uuid::new_v4().simple()),
                "amount": $amount
            }))
            .to_request();
        test::call_service(&$app, req).await
    }};
}

async fn payment_status(pool: &PgPool, payment_id: &str) -> String {
    let id = Uuid::parse_str(payment_id).unwrap();
    sqlx::query_scalar("SELECT status FROM payments WHERE id = $1")
        .bind(id)
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn backdate_payment(pool: &PgPool, payment_id: &str, minutes: i32) {
    let id = Uuid::parse_str(payment_id).unwrap();
    sqlx::query("UPDATE payments SET created_at = NOW() - make_interval(mins => $2) WHERE id = $1")
        .bind(id)
        .bind(minutes)
        .execute(pool)
        .await
        .unwrap();
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_register_list_like_promote_and_message() {
    let (state, payments) = build_state().await;
    let app = app!(state);

    // seller and buyer accounts
    let register = |email: String, name: &'static str| {
        test::TestRequest::post()
            .uri("/api/v1/auth/register")
            .set_json(json!({ "email": email, "password": "market2024", "name": name }))
            .to_request()
    };
    let seller_email = unique_email("seller");
    let resp = test::call_service(&app, register(seller_email.clone(), "Amina")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let seller: Value = test::read_body_json(resp).await;
    let seller_token = seller["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let seller_id = seller["data"]["user"]["id"].as_str().unwrap().to_string();

    let resp = test::call_service(&app, register(seller_email.to_uppercase(), "Amina")).await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = test::call_service(&app, register(unique_email("buyer"), "Paul")).await;
    let buyer: Value = test::read_body_json(resp).await;
    let buyer_token = buyer["data"]["tokens"]["access_token"].as_str().unwrap().to_string();
    let seller_auth = ("Authorization", format!("Bearer {seller_token}"));
    let buyer_auth = ("Authorization", format!("Bearer {buyer_token}"));

    // listing
    let req = test::TestRequest::post()
        .uri("/api/v1/posts")
        .insert_header(seller_auth.clone())
        .set_json(json!({
            "title": "Toyota Corolla 2012",
            "description": "Clean, low mileage",
            "price": 4_500_000,
            "location": "Douala"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let post: Value = test::read_body_json(resp).await;
    let post_id = post["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(post["data"]["currency"], "XAF");
    assert_eq!(post["data"]["tier"], "free");

    // likes are idempotent
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri(&format!("/api/v1/posts/{post_id}/like"))
            .insert_header(buyer_auth.clone())
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"], json!({ "liked": true, "like_count": 1 }));
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .insert_header(buyer_auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["liked_by_me"], true);
    assert_eq!(body["data"]["view_count"], 1);

    // buyers cannot promote someone else's listing
    let promotion = json!({
        "post_id": post_id,
        "purpose": "promotion",
        "tier": "premium",
        "phone_number": "+237670000000",
        "provider": "mtn"
    });
    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .insert_header(buyer_auth.clone())
        .set_json(&promotion)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let req = test::TestRequest::post()
        .uri("/api/v1/payments")
        .insert_header(seller_auth.clone())
        .set_json(&promotion)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let initiated: Value = test::read_body_json(resp).await;
    let reference = initiated["data"]["payment"]["reference"].as_str().unwrap().to_string();
    assert_eq!(initiated["data"]["payment"]["amount"], payments.premium_price);

    // companion app confirms; a replay with the same transaction id is accepted
    let receipt = json!({
        "reference": reference,
        "transaction_id": format!("MP{}", Uuid::new_v4().simple()),
        "amount": payments.premium_price
    });
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/payments/confirm")
            .insert_header(("X-Companion-Key", payments.companion_key.clone()))
            .set_json(&receipt)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "confirmed");
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["tier"], "premium");
    assert!(body["data"]["tier_expires_at"].is_string());
    assert!(body["data"].get("liked_by_me").is_none());

    // messaging
    let req = test::TestRequest::post()
        .uri("/api/v1/messages")
        .insert_header(buyer_auth.clone())
        .set_json(json!({ "receiver_id": seller_id, "content": "Still available?", "post_id": post_id }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::get()
        .uri("/api/v1/messages/unread-count")
        .insert_header(seller_auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/messages/conversations")
        .insert_header(seller_auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let conversations = body["data"].as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["unread_count"], 1);
    assert_eq!(conversations[0]["user"]["name"], "Paul");

    let buyer_id = buyer["data"]["user"]["id"].as_str().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/messages/conversations/{buyer_id}"))
        .insert_header(seller_auth.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["total"], 1);

    let req = test::TestRequest::get()
        .uri("/api/v1/messages/unread-count")
        .insert_header(seller_auth)
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["count"], 0);
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_login_and_refresh_rotation() {
    let (state, _) = build_state().await;
    let app = app!(state);
    let email = unique_email("login");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({ "email": email, "password": "market2024", "name": "Kofi" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": "wrong-pass1" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], "INVALID_CREDENTIALS");

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": "market2024" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let refresh_token = body["data"]["tokens"]["refresh_token"].as_str().unwrap();

    let req = test::TestRequest::post()
        .uri("/api/v1/auth/refresh")
        .set_json(json!({ "refresh_token": refresh_token }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["email"], email.as_str());
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_purchase_marks_post_sold_and_refuses_second_buyer() {
    let harness = build_with(test_config()).await;
    let key = harness.payments.companion_key.clone();
    let app = app!(harness.state);

    let (seller, _) = signup!(app, "Amina");
    let (first_buyer, _) = signup!(app, "Paul");
    let (second_buyer, _) = signup!(app, "Kofi");
    let post_id = list_item!(
        app,
        seller,
        json!({ "title": "Tecno Spark 10", "description": "Boxed", "price": 1000 })
    );

    let (first_id, first_ref) = start_purchase!(app, first_buyer, post_id);
    let (second_id, second_ref) = start_purchase!(app, second_buyer, post_id);

    let resp = confirm!(app, key, first_ref, 1000);
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["status"], "confirmed");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .insert_header(seller.clone())
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "sold");

    // the listing is gone; the late receipt fails instead of selling it twice
    let resp = confirm!(app, key, second_ref, 1000);
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["success"], false);

    assert_eq!(payment_status(&harness.pool, &first_id).await, "confirmed");
    assert_eq!(payment_status(&harness.pool, &second_id).await, "failed");
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_underpayment_fails_and_keeps_post_active() {
    let harness = build_with(test_config()).await;
    let key = harness.payments.companion_key.clone();
    let app = app!(harness.state);

    let (seller, _) = signup!(app, "Amina");
    let (buyer, _) = signup!(app, "Paul");
    let post_id = list_item!(
        app,
        seller,
        json!({ "title": "Itel A70", "description": "Used", "price": 45000 })
    );
    let (payment_id, reference) = start_purchase!(app, buyer, post_id);

    let resp = confirm!(app, key, reference, 44999);
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(payment_status(&harness.pool, &payment_id).await, "failed");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "active");

    // a failed payment cannot be confirmed later
    let resp = confirm!(app, key, reference, 45000);
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_confirm_after_ttl_marks_payment_expired() {
    let harness = build_with(test_config()).await;
    let key = harness.payments.companion_key.clone();
    let ttl_minutes = (harness.payments.pending_ttl_secs / 60) as i32;
    let app = app!(harness.state);

    let (seller, _) = signup!(app, "Amina");
    let (buyer, _) = signup!(app, "Paul");
    let post_id = list_item!(
        app,
        seller,
        json!({ "title": "Gas cooker", "description": "Four burners", "price": 60000 })
    );
    let (payment_id, reference) = start_purchase!(app, buyer, post_id);
    backdate_payment(&harness.pool, &payment_id, ttl_minutes + 1).await;

    let resp = confirm!(app, key, reference, 60000);
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    assert_eq!(payment_status(&harness.pool, &payment_id).await, "expired");

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(body["data"]["status"], "active");
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_expiry_job_only_expires_stale_pending_payments() {
    let harness = build_with(test_config()).await;
    let key = harness.payments.companion_key.clone();
    let ttl_minutes = (harness.payments.pending_ttl_secs / 60) as i32;
    let app = app!(harness.state);

    let (seller, _) = signup!(app, "Amina");
    let (buyer, _) = signup!(app, "Paul");
    let mut post_ids = Vec::new();
    for title in ["Desk lamp", "Office chair", "Bookshelf"] {
        post_ids.push(list_item!(
            app,
            seller,
            json!({ "title": title, "description": "Good condition", "price": 5000 })
        ));
    }

    let (stale_id, _) = start_purchase!(app, buyer, post_ids[0]);
    let (fresh_id, _) = start_purchase!(app, buyer, post_ids[1]);
    let (confirmed_id, confirmed_ref) = start_purchase!(app, buyer, post_ids[2]);
    let resp = confirm!(app, key, confirmed_ref, 5000);
    assert_eq!(resp.status(), StatusCode::OK);

    backdate_payment(&harness.pool, &stale_id, ttl_minutes + 5).await;
    backdate_payment(&harness.pool, &confirmed_id, ttl_minutes + 5).await;

    payment_expiry::run_once(&harness.state.payments).await;

    assert_eq!(payment_status(&harness.pool, &stale_id).await, "expired");
    assert_eq!(payment_status(&harness.pool, &fresh_id).await, "pending");
    assert_eq!(payment_status(&harness.pool, &confirmed_id).await, "confirmed");
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_list_orders_active_tiers_before_recency() {
    let harness = build_with(test_config()).await;
    let app = app!(harness.state);

    let (seller, seller_id) = signup!(app, "Amina");
    // (title, tier, tier expiry offset in days, age in minutes)
    let listings = [
        ("old premium", "premium", Some(10), 40),
        ("lapsed standard", "standard", Some(-1), 30),
        ("plain free", "free", None, 20),
        ("new standard", "standard", Some(5), 10),
    ];

    for (title, tier, expires_in_days, age_minutes) in listings {
        let id = list_item!(
            app,
            seller,
            json!({ "title": title, "description": "Listing", "price": 100 })
        );
        sqlx::query(
            r#"
            UPDATE posts
            SET tier = $2,
                tier_expires_at = NOW() + make_interval(days => $3),
                created_at = NOW() - make_interval(mins => $4)
            WHERE id = $1
            "#,
        )
        .bind(Uuid::parse_str(&id).unwrap())
        .bind(tier)
        .bind(expires_in_days)
        .bind(age_minutes)
        .execute(&harness.pool)
        .await
        .unwrap();
    }

    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/posts?user_id={seller_id}"))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let titles: Vec<&str> = body["data"]["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["title"].as_str().unwrap())
        .collect();

    assert_eq!(
        titles,
        vec!["old premium", "new standard", "plain free", "lapsed standard"]
    );
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_oauth_login_links_existing_account_by_email() {
    let provider = MockServer::start().await;
    let mut config = test_config();
    config.oauth.google_userinfo_url = format!("{}/oauth2/v3/userinfo", provider.uri());
    let harness = build_with(config).await;
    let app = app!(harness.state);

    let email = unique_email("linked");
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/register")
        .set_json(json!({ "email": email, "password": "market2024", "name": "Awa" }))
        .to_request();
    let body: Value = test::call_and_read_body_json(&app, req).await;
    let local_id = body["data"]["user"]["id"].as_str().unwrap().to_string();

    let google_sub = format!("g-{}", Uuid::new_v4().simple());
    Mock::given(method("GET"))
        .and(path("/oauth2/v3/userinfo"))
        .and(bearer_token("google-access"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sub": google_sub,
            "email": email.to_uppercase(),
            "name": "Awa N.",
            "picture": "https://lh3.googleusercontent.com/a/awa"
        })))
        .mount(&provider)
        .await;

    // first login links by email, the second finds the linked identity
    for _ in 0..2 {
        let req = test::TestRequest::post()
            .uri("/api/v1/auth/oauth/google")
            .set_json(json!({ "access_token": "google-access" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["user"]["id"], local_id.as_str());
        assert_eq!(body["data"]["user"]["auth_provider"], "local");
        assert_eq!(
            body["data"]["user"]["avatar_url"],
            "https://lh3.googleusercontent.com/a/awa"
        );
    }

    // password login still works after linking
    let req = test::TestRequest::post()
        .uri("/api/v1/auth/login")
        .set_json(json!({ "email": email, "password": "market2024" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
#[serial]
#[ignore = "Requires PostgreSQL database"]
async fn test_update_removes_dropped_images_from_storage() {
    let harness = build_with(test_config()).await;
    let app = app!(harness.state);

    let (seller, seller_id) = signup!(app, "Amina");
    let kept = format!("{seller_id}/front.jpg");
    let dropped = format!("{seller_id}/back.jpg");
    let post_id = list_item!(
        app,
        seller,
        json!({
            "title": "Wax fabric, 6 yards",
            "description": "Vlisco",
            "price": 25000,
            "images": [kept, dropped]
        })
    );

    let req = test::TestRequest::patch()
        .uri(&format!("/api/v1/posts/{post_id}"))
        .insert_header(seller.clone())
        .set_json(json!({ "images": [kept] }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["data"]["images"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"]["images"][0]["name"], kept.as_str());

    assert_eq!(harness.store.deleted(), vec![dropped]);
}
