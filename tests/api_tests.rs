//! HTTP-level tests of the full router over an in-memory database

use std::sync::Arc;

use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum_test::{TestResponse, TestServer};
use serde_json::{json, Value};

use authors_heaven::api::{build_router, AppState};
use authors_heaven::cache::{Cache, MemoryCache};
use authors_heaven::config::Config;
use authors_heaven::db::{create_test_pool, migrations::run_migrations};
use authors_heaven::services::{TokenPurpose, TokenSigner};

const PASSWORD: &str = "Secret123";
const FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

struct TestApp {
    server: TestServer,
    state: AppState,
    tokens: TokenSigner,
}

async fn spawn_app() -> TestApp {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    let config = Config::default();
    let cache = Arc::new(Cache::Memory(MemoryCache::new()));
    let state = AppState::new(&config, pool, cache);
    let tokens = TokenSigner::new(
        config.auth.token_secret.clone(),
        chrono::Duration::hours(config.auth.token_hours),
    );
    let server = TestServer::new(build_router(state.clone(), &config.server.cors_origin))
        .expect("Failed to start test server");
    TestApp {
        server,
        state,
        tokens,
    }
}

fn bearer(token: &str) -> HeaderValue {
    HeaderValue::from_str(&format!("Bearer {}", token)).unwrap()
}

impl TestApp {
    async fn register(&self, username: &str) -> TestResponse {
        self.server
            .post("/api/v1/users")
            .json(&json!({"user": {
                "username": username,
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            }}))
            .await
    }

    async fn login(&self, username: &str) -> TestResponse {
        self.server
            .post("/api/v1/users/login")
            .json(&json!({"user": {
                "email": format!("{}@example.com", username),
                "password": PASSWORD,
            }}))
            .await
    }

    async fn verify_token(&self, username: &str) -> String {
        let user = self
            .state
            .user_service
            .get_by_username(username)
            .await
            .unwrap()
            .expect("user exists");
        self.tokens.sign(TokenPurpose::Verify, user.id)
    }

    /// Register, verify and log in; returns the session token
    async fn signup(&self, username: &str) -> String {
        self.register(username).await.assert_status(StatusCode::CREATED);
        let token = self.verify_token(username).await;
        self.server
            .get(&format!("/api/v1/users/activate/{}", token))
            .await
            .assert_status_ok();
        let body: Value = self.login(username).await.json();
        body["user"]["token"].as_str().unwrap().to_string()
    }

    async fn publish(&self, token: &str, title: &str, tags: &[&str]) -> Value {
        let response = self
            .server
            .post("/api/v1/articles")
            .add_header(header::AUTHORIZATION, bearer(token))
            .json(&json!({"article": {
                "title": title,
                "description": "A short description",
                "body": "Some body text for the article",
                "tagList": tags,
            }}))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["article"].clone()
    }
}

#[tokio::test]
async fn test_registration_and_sessions() {
    let app = spawn_app().await;

    let response = app.register("ada").await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["user"]["username"], "ada");
    assert_eq!(
        body["message"],
        "Account created successfully. Check your email."
    );

    app.register("ada").await.assert_status(StatusCode::BAD_REQUEST);

    // unverified accounts cannot log in
    let response = app.login("ada").await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Your account is not verified. Check your email."
    );

    let token = app.verify_token("ada").await;
    app.server
        .get(&format!("/api/v1/users/activate/{}", token))
        .await
        .assert_status_ok();
    app.server
        .get(&format!("/api/v1/users/activate/{}", token))
        .await
        .assert_status(StatusCode::NOT_ACCEPTABLE);
    app.server
        .get("/api/v1/users/activate/garbage")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app.login("ada").await;
    response.assert_status_ok();
    assert!(response.headers().get(header::SET_COOKIE).is_some());
    let session = response.json::<Value>()["user"]["token"]
        .as_str()
        .unwrap()
        .to_string();

    let me: Value = app
        .server
        .get("/api/v1/user")
        .add_header(header::AUTHORIZATION, bearer(&session))
        .await
        .json();
    assert_eq!(me["user"]["username"], "ada");
    assert_eq!(me["user"]["role"], "admin");

    app.server
        .post("/api/v1/users/logout")
        .add_header(header::AUTHORIZATION, bearer(&session))
        .await
        .assert_status_ok();
    app.server
        .get("/api/v1/user")
        .add_header(header::AUTHORIZATION, bearer(&session))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_password_is_rejected() {
    let app = spawn_app().await;
    app.signup("ada").await;

    let response = app
        .server
        .post("/api/v1/users/login")
        .json(&json!({"user": {"email": "ada@example.com", "password": "Wrong1234"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Wrong email or password."
    );
}

#[tokio::test]
async fn test_article_lifecycle() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;

    let article = app.publish(&ada, "Hello World", &["rust", "web"]).await;
    assert_eq!(article["slug"], "hello-world");
    assert_eq!(article["tagList"], json!(["rust", "web"]));
    assert_eq!(article["author"]["username"], "ada");

    let second = app.publish(&ada, "Hello World", &[]).await;
    assert_eq!(second["slug"], "hello-world-1");

    let list: Value = app.server.get("/api/v1/articles").await.json();
    assert_eq!(list["articlesCount"], 2);
    assert_eq!(list["page"], 1);
    assert_eq!(list["page_size"], 10);
    assert_eq!(list["results"]["articles"].as_array().unwrap().len(), 2);

    let filtered: Value = app
        .server
        .get("/api/v1/articles")
        .add_query_param("tags", "rust")
        .await
        .json();
    assert_eq!(filtered["articlesCount"], 1);

    let response = app
        .server
        .get("/api/v1/articles")
        .add_query_param("page", 5)
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(response.json::<Value>()["error"]["message"], "Invalid page.");

    let response = app
        .server
        .patch("/api/v1/articles/hello-world")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"article": {"body": "vandalised"}}))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Cannot edit an article that is not yours"
    );

    let updated: Value = app
        .server
        .patch("/api/v1/articles/hello-world")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"article": {"title": "Goodbye World"}}))
        .await
        .json();
    assert_eq!(updated["article"]["slug"], "goodbye-world");
    assert_eq!(updated["article"]["tagList"], json!(["rust", "web"]));

    let tags: Value = app.server.get("/api/v1/tags").await.json();
    assert_eq!(tags["tags"], json!(["rust", "web"]));

    app.server
        .delete("/api/v1/articles/goodbye-world")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .await
        .assert_status_ok();
    app.server
        .get("/api/v1/articles/goodbye-world")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_reactions_show_on_article() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    app.publish(&ada, "Rated Post", &[]).await;

    app.server
        .post("/api/v1/articles/rated-post/like/vote")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .post("/api/v1/articles/rated-post/meh/vote")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    app.server
        .post("/api/v1/articles/rated-post/favorite")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .post("/api/v1/articles/rated-post/favorite")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/articles/rated-post/rate")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"rate": {"rating": 5}}))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);

    app.server
        .post("/api/v1/articles/rated-post/rate")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"rate": {"rating": 9}}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let response = app
        .server
        .post("/api/v1/articles/rated-post/rate")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"rate": {"rating": "4"}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["rating"]["average_rating"], 4.0);

    let article: Value = app
        .server
        .get("/api/v1/articles/rated-post")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .json();
    let article = &article["article"];
    assert_eq!(article["likes"], 1);
    assert_eq!(article["liked"], true);
    assert_eq!(article["favorited"], true);
    assert_eq!(article["favorites_count"], 1);
    assert_eq!(article["average_rating"], 4.0);

    app.server
        .get("/api/v1/bookmarks")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    app.server
        .post("/api/v1/articles/rated-post/bookmark")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::CREATED);
    let bookmarks: Value = app
        .server
        .get("/api/v1/bookmarks")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(bookmarks["articles"][0]["slug"], "rated-post");
}

#[tokio::test]
async fn test_comment_threads_and_votes() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    app.publish(&ada, "Talk", &[]).await;

    let response = app
        .server
        .post("/api/v1/articles/talk/comments")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"comment": {"body": "First!"}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let root_id = response.json::<Value>()["comment"]["id"].as_i64().unwrap();

    let reply: Value = app
        .server
        .post(&format!("/api/v1/articles/talk/comments/{}", root_id))
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"reply": {"body": "Welcome"}}))
        .await
        .json();
    assert_eq!(reply["comment"]["parent"], root_id);

    let threads: Value = app.server.get("/api/v1/articles/talk/comments").await.json();
    let comments = threads["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["replies"][0]["body"], "Welcome");

    app.server
        .put(&format!("/api/v1/articles/talk/comments/{}", root_id))
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"comment": {"body": "hijacked"}}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let vote: Value = app
        .server
        .post(&format!("/api/v1/articles/talk/comments/{}/like", root_id))
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .await
        .json();
    assert_eq!(vote["message"], "Comment liked");
    assert_eq!(vote["comment"]["likes_info"]["like"], true);
    assert_eq!(vote["comment"]["likes_info"]["likes_count"], 1);

    let vote: Value = app
        .server
        .post(&format!("/api/v1/articles/talk/comments/{}/like", root_id))
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .await
        .json();
    assert_eq!(vote["message"], "Comment unliked");

    app.server
        .get("/api/v1/articles/talk/comments/9999")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_highlights() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    app.publish(&ada, "Marked", &[]).await;

    let response = app
        .server
        .post("/api/v1/articles/marked/highlight")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"highlight": {"field": "body", "start_index": 0, "end_index": 3}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: Value = response.json();
    assert_eq!(body["highlight"]["highlighted_text"], "Some");
    assert_eq!(body["message"], "You highlighted this section");

    let response = app
        .server
        .post("/api/v1/articles/marked/highlight")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"highlight": {"field": "footer", "start_index": 0, "end_index": 3}}))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    assert_eq!(
        response.json::<Value>()["error"]["message"],
        "Field must be; title, body or description"
    );

    let response = app
        .server
        .post("/api/v1/articles/marked/highlight")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"highlight": {"field": "body"}}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Start index and end index are required");

    // "Some body text for the article" has 30 characters
    let response = app
        .server
        .post("/api/v1/articles/marked/highlight")
        .add_header(header::AUTHORIZATION, bearer(&ada))
        .json(&json!({"highlight": {"field": "body", "start_index": 23, "end_index": 30}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["highlight"]["highlighted_text"], "article");
}

#[tokio::test]
async fn test_login_throttling() {
    let app = spawn_app().await;
    app.signup("ada").await;

    let attempt = |password: &'static str| {
        app.server
            .post("/api/v1/users/login")
            .json(&json!({"user": {"email": "ada@example.com", "password": password}}))
    };

    for _ in 0..5 {
        attempt("Wrong1234").await.assert_status(StatusCode::BAD_REQUEST);
    }
    let response = attempt("Wrong1234").await;
    response.assert_status(StatusCode::TOO_MANY_REQUESTS);
    let body: Value = response.json();
    assert_eq!(body["error"]["code"], "TOO_MANY_REQUESTS");
    assert_eq!(
        body["error"]["message"],
        "Too many login attempts. Please try again later."
    );

    // the right password does not lift the lock
    attempt(PASSWORD)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_login_throttling_per_forwarded_ip() {
    let app = spawn_app().await;

    for i in 0..20 {
        app.server
            .post("/api/v1/users/login")
            .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.9, 10.0.0.1"))
            .json(&json!({"user": {"email": format!("nobody{}@example.com", i), "password": "Wrong1234"}}))
            .await
            .assert_status(StatusCode::BAD_REQUEST);
    }

    app.server
        .post("/api/v1/users/login")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.9"))
        .json(&json!({"user": {"email": "fresh@example.com", "password": "Wrong1234"}}))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // another client is unaffected
    app.server
        .post("/api/v1/users/login")
        .add_header(FORWARDED_FOR, HeaderValue::from_static("198.51.100.10"))
        .json(&json!({"user": {"email": "fresh@example.com", "password": "Wrong1234"}}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_follow_and_notifications() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;

    let response = app
        .server
        .post("/api/v1/profiles/ada/follow")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["profile"]["message"],
        "You now follow ada"
    );

    let profile: Value = app
        .server
        .get("/api/v1/profiles/ada")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(profile["profile"]["following"], true);

    let inbox: Value = app
        .server
        .get("/api/v1/notifications")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(inbox["message"], "You have no new notifications");

    app.publish(&ada, "News", &[]).await;

    let unread: Value = app
        .server
        .get("/api/v1/notifications/unread")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .json();
    assert_eq!(unread["message"], "You have 1 notification(s)");
    assert_eq!(unread["notifications"][0]["verb"], "article");

    let subscription: Value = app
        .server
        .patch("/api/v1/notifications/subscription")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"email_notifications": false}))
        .await
        .json();
    assert_eq!(subscription["subscription"]["email_notifications"], false);
    assert_eq!(subscription["subscription"]["in_app_notifications"], true);
}

#[tokio::test]
async fn test_escalation_review() {
    let app = spawn_app().await;
    let admin = app.signup("root").await;
    let ada = app.signup("ada").await;
    let bob = app.signup("bob").await;
    app.publish(&ada, "Suspicious", &[]).await;

    let response = app
        .server
        .post("/api/v1/article/suspicious/escalate")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .json(&json!({"escalate": {"reason": "Spam", "description": "Ads everywhere"}}))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(
        response.json::<Value>()["message"],
        "Article reported successfully"
    );

    app.server
        .get("/api/v1/article/escalate")
        .add_header(header::AUTHORIZATION, bearer(&bob))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let reports: Value = app
        .server
        .get("/api/v1/article/escalate")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await
        .json();
    assert_eq!(reports["escalated articles"][0]["reporter"], "bob");

    app.server
        .delete("/api/v1/article/suspicious/escalate")
        .add_header(header::AUTHORIZATION, bearer(&admin))
        .await
        .assert_status_ok();
    app.server
        .get("/api/v1/articles/suspicious")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_share_links() {
    let app = spawn_app().await;
    let ada = app.signup("ada").await;
    app.publish(&ada, "Shared", &[]).await;

    let body: Value = app
        .server
        .get("/api/v1/articles/shared/share/reddit")
        .await
        .json();
    assert_eq!(body["share"]["provider"], "reddit");
    assert!(body["share"]["link"]
        .as_str()
        .unwrap()
        .starts_with("https://www.reddit.com/submit?url="));

    let response = app.server.get("/api/v1/articles/shared/share/myspace").await;
    response.assert_status_ok();
    assert_eq!(
        response.json::<Value>()["message"],
        "Please select a valid provider - twitter, facebook, email, telegram, linkedin, reddit"
    );
}
