//! End-to-end tests against the full router on an in-memory database

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;

use minbar::api::{build_router, AppState};
use minbar::app::build_state;
use minbar::cache::create_cache;
use minbar::config::{CacheConfig, Config};
use minbar::db::{create_test_pool, migrations};
use minbar::models::{
    AdminUser, ContentKind, CreateAdminUserInput, CreateContentInput, CreateProductInput,
    PublishStatus,
};

struct TestApp {
    server: TestServer,
    state: AppState,
    _uploads: TempDir,
}

async fn spawn_app() -> TestApp {
    let uploads = TempDir::new().unwrap();

    let mut config = Config::default();
    config.auth.jwt_secret = Some("integration-test-secret".to_string());
    config.upload.path = uploads.path().to_path_buf();
    config.upload.max_file_size = 1024;
    config.server.site_url = "https://minbar.test".to_string();

    let pool = create_test_pool().await.unwrap();
    migrations::run_migrations(&pool).await.unwrap();
    let cache = create_cache(&CacheConfig::default()).await.unwrap();

    let state = build_state(config, pool, cache).unwrap();
    let server = TestServer::new(build_router(state.clone(), "http://localhost:3000")).unwrap();

    TestApp {
        server,
        state,
        _uploads: uploads,
    }
}

async fn create_admin(app: &TestApp) -> AdminUser {
    app.state
        .user_service
        .setup(CreateAdminUserInput {
            username: "imam".into(),
            email: "imam@minbar.test".into(),
            password: "correct horse battery".into(),
            role: None,
        })
        .await
        .unwrap()
}

async fn publish_article(app: &TestApp, title: &str) -> i64 {
    app.state
        .content_service
        .create(
            ContentKind::Article,
            CreateContentInput {
                title: title.into(),
                body: Some("Patience is **beautiful**.".into()),
                category: Some("Ethics".into()),
                publish_status: Some(PublishStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id
}

fn error_message(body: &Value) -> &str {
    body["error"]["message"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn contact_requires_each_field() {
    let app = spawn_app().await;

    let cases = [
        (json!({"email": "a@b.com", "message": "Salaam"}), "Name is required"),
        (json!({"name": "Amina", "message": "Salaam"}), "Email is required"),
        (json!({"name": "Amina", "email": "a@b.com"}), "Message is required"),
    ];

    for (body, expected) in cases {
        let response = app.server.post("/api/v1/contact").json(&body).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(error_message(&body), expected);
    }

    app.server
        .post("/api/v1/contact")
        .json(&json!({"name": "Amina", "email": "a@b.com", "message": "Salaam"}))
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn duplicate_subscriber_is_a_conflict() {
    let app = spawn_app().await;
    let body = json!({"email": "reader@minbar.test"});

    app.server
        .post("/api/v1/subscribers")
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .post("/api/v1/subscribers")
        .json(&json!({"email": "Reader@Minbar.test"}))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    assert_eq!(error_message(&response.json()), "This email is already registered");
}

#[tokio::test]
async fn missing_content_is_404_in_json_and_html() {
    let app = spawn_app().await;

    let response = app.server.get("/api/v1/content/articles/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    let response = app.server.get("/articles/missing").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let html = response.text();
    assert!(html.contains("Page not found"));
    assert!(html.contains("© Minbar"));

    app.server.get("/no-such-kind").await.assert_status(StatusCode::NOT_FOUND);
    app.server
        .get("/api/v1/nothing/here")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn draft_content_stays_hidden() {
    let app = spawn_app().await;
    app.state
        .content_service
        .create(
            ContentKind::Lesson,
            CreateContentInput {
                title: "Unfinished".into(),
                body: Some("draft".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    app.server
        .get("/api/v1/content/lessons/unfinished")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server.get("/lessons/unfinished").await.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn published_pages_render() {
    let app = spawn_app().await;
    publish_article(&app, "On Patience").await;

    let home = app.server.get("/").await;
    home.assert_status_ok();
    assert!(home.text().contains("On Patience"));

    let list = app.server.get("/articles?category=Ethics").await;
    list.assert_status_ok();
    assert!(list.text().contains("/articles/on-patience"));

    let detail = app.server.get("/articles/on-patience").await;
    detail.assert_status_ok();
    assert!(detail.text().contains("<strong>beautiful</strong>"));

    let sitemap = app.server.get("/sitemap.xml").await;
    sitemap.assert_status_ok();
    assert!(sitemap.text().contains("https://minbar.test/articles/on-patience"));

    let robots = app.server.get("/robots.txt").await;
    robots.assert_status_ok();
    assert!(robots.text().contains("https://minbar.test/sitemap.xml"));
}

#[tokio::test]
async fn arabic_lesson_downloads_as_pdf() {
    let app = spawn_app().await;
    app.state
        .content_service
        .create(
            ContentKind::Lesson,
            CreateContentInput {
                title: "الصبر عند المصيبة".into(),
                slug: Some("patience".into()),
                body: Some("إِنَّمَا الصَّبْرُ عِنْدَ الصَّدْمَةِ الْأُولَى".into()),
                publish_status: Some(PublishStatus::Published),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let response = app.server.get("/api/v1/content/lessons/patience/pdf").await;
    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "application/pdf");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"patience.pdf\""
    );
    let pdf = response.as_bytes();
    assert!(pdf.starts_with(b"%PDF-"));
    assert!(lopdf::Document::load_mem(pdf).is_ok());
}

#[tokio::test]
async fn concurrent_views_are_all_counted() {
    let app = spawn_app().await;
    let id = publish_article(&app, "Counted").await;

    let server = &app.server;
    let responses = futures::future::join_all(
        (0..20).map(|_| async move { server.get("/api/v1/content/articles/counted").await }),
    )
    .await;
    for response in &responses {
        response.assert_status_ok();
    }

    let content = app.state.content_service.get_by_id(id).await.unwrap();
    assert_eq!(content.view_count, 20);
}

#[tokio::test]
async fn admin_token_lifecycle() {
    let app = spawn_app().await;
    let admin = create_admin(&app).await;

    app.server
        .get("/api/v1/admin/dashboard")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let login = app
        .server
        .post("/api/v1/auth/login")
        .json(&json!({"username": "imam", "password": "correct horse battery"}))
        .await;
    login.assert_status_ok();
    let token = login.json::<Value>()["token"].as_str().unwrap().to_string();

    app.server
        .get("/api/v1/admin/dashboard")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();

    let stale = app
        .state
        .jwt
        .issue_at(&admin, Utc::now() - Duration::hours(24) - Duration::minutes(1))
        .unwrap();
    let response = app
        .server
        .get("/api/v1/admin/dashboard")
        .authorization_bearer(&stale)
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(error_message(&response.json()), "Token has expired");
}

#[tokio::test]
async fn wrong_password_is_rejected() {
    let app = spawn_app().await;
    create_admin(&app).await;

    app.server
        .post("/api/v1/auth/login")
        .json(&json!({"username": "imam", "password": "nope"}))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn uploads_check_type_and_size() {
    let app = spawn_app().await;
    let admin = create_admin(&app).await;
    let token = app.state.jwt.issue(&admin).unwrap();

    let text = MultipartForm::new().add_part(
        "file",
        Part::bytes(b"hello".to_vec())
            .file_name("notes.txt")
            .mime_type("text/plain"),
    );
    let response = app
        .server
        .post("/api/v1/admin/upload")
        .authorization_bearer(&token)
        .multipart(text)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let oversized = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![0u8; 4096])
            .file_name("big.png")
            .mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/v1/admin/upload")
        .authorization_bearer(&token)
        .multipart(oversized)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert!(error_message(&response.json()).starts_with("File too large"));

    let small = MultipartForm::new().add_part(
        "file",
        Part::bytes(vec![7u8; 512])
            .file_name("ok.png")
            .mime_type("image/png"),
    );
    let response = app
        .server
        .post("/api/v1/admin/upload")
        .authorization_bearer(&token)
        .multipart(small)
        .await;
    response.assert_status(StatusCode::CREATED);
    let url = response.json::<Value>()["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/uploads/"));
    assert!(url.ends_with(".png"));

    let served = app.server.get(&url).await;
    served.assert_status_ok();
    assert_eq!(served.as_bytes().len(), 512);
}

#[tokio::test]
async fn order_total_is_computed_server_side() {
    let app = spawn_app().await;
    let product = app
        .state
        .product_service
        .create(CreateProductInput {
            name: "Rose bouquet".into(),
            price_cents: 1250,
            stock: 10,
            ..Default::default()
        })
        .await
        .unwrap();

    let response = app
        .server
        .post("/api/v1/shop/orders")
        .json(&json!({
            "customer_name": "Yusuf",
            "email": "Yusuf@Example.com",
            "phone": "+1 555 0100",
            "address": "1 Garden Road",
            "total_cents": 1,
            "items": [{"product_id": product.id, "quantity": 3}]
        }))
        .await;
    response.assert_status(StatusCode::CREATED);
    let order: Value = response.json();
    assert_eq!(order["total_cents"], 3750);
    assert_eq!(order["email"], "yusuf@example.com");
    assert_eq!(order["status"], "pending");

    let response = app
        .server
        .post("/api/v1/shop/orders")
        .json(&json!({
            "customer_name": "Yusuf",
            "email": "yusuf@example.com",
            "phone": "+1 555 0100",
            "address": "1 Garden Road",
            "items": []
        }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&response.json()), "Order must contain at least one item");
}

#[tokio::test]
async fn shop_admin_requires_session() {
    let app = spawn_app().await;

    app.server
        .get("/api/v1/shop/admin/orders")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post("/api/v1/shop/auth/setup")
        .json(&json!({"email": "florist@minbar.test", "password": "tulips-in-spring"}))
        .await
        .assert_status(StatusCode::CREATED);

    let login = app
        .server
        .post("/api/v1/shop/auth/login")
        .json(&json!({"email": "florist@minbar.test", "password": "tulips-in-spring"}))
        .await;
    login.assert_status_ok();
    let cookie = login.cookie("shop_session");

    app.server
        .get("/api/v1/shop/admin/orders")
        .add_cookie(cookie)
        .await
        .assert_status_ok();
}
