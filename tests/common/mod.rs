#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use serde_json::{Value, json};
use tollgate::auth::AuthSettings;
use tollgate::db::Database;
use tollgate::jwt::{KeyMaterial, TokenCodec};
use tollgate::{ServerConfig, create_app};
use tower::ServiceExt;

pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub keys: KeyMaterial,
    pub settings: AuthSettings,
}

pub struct TestSetup {
    settings: AuthSettings,
    login_rate_per_minute: u32,
}

impl TestSetup {
    pub fn new() -> Self {
        Self {
            settings: AuthSettings::default(),
            login_rate_per_minute: 1000,
        }
    }

    pub fn with_settings(mut self, settings: AuthSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_login_rate(mut self, per_minute: u32) -> Self {
        self.login_rate_per_minute = per_minute;
        self
    }

    pub async fn build(self) -> TestApp {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let keys = KeyMaterial::generate().expect("Failed to generate keys");
        let codec = Arc::new(TokenCodec::new(&keys).expect("Failed to build codec"));

        let config = ServerConfig {
            db: db.clone(),
            jwt: codec.clone(),
            settings: self.settings.clone(),
            login_rate_per_minute: self.login_rate_per_minute,
        };

        TestApp {
            app: create_app(&config),
            db,
            codec,
            keys,
            settings: self.settings,
        }
    }
}

/// How a request presents its access token.
pub enum Credential<'a> {
    None,
    Bearer(&'a str),
    AccessCookie(&'a str),
    RefreshCookie(&'a str),
}

fn with_credential(
    builder: axum::http::request::Builder,
    credential: Credential<'_>,
) -> axum::http::request::Builder {
    match credential {
        Credential::None => builder,
        Credential::Bearer(token) => {
            builder.header(header::AUTHORIZATION, format!("Bearer {}", token))
        }
        Credential::AccessCookie(token) => {
            builder.header(header::COOKIE, format!("access_token={}; logged_in=true", token))
        }
        Credential::RefreshCookie(token) => {
            builder.header(header::COOKIE, format!("refresh_token={}", token))
        }
    }
}

impl TestApp {
    pub async fn post(&self, uri: &str, body: Value, credential: Credential<'_>) -> Response<Body> {
        let request = with_credential(Request::builder().method("POST").uri(uri), credential)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, credential: Credential<'_>) -> Response<Body> {
        let request = with_credential(Request::builder().method("GET").uri(uri), credential)
            .body(Body::empty())
            .unwrap();
        self.app.clone().oneshot(request).await.unwrap()
    }

    pub async fn register(&self, name: &str, email: &str) -> Response<Body> {
        self.post(
            "/api/auth/register",
            json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "password_confirm": PASSWORD,
            }),
            Credential::None,
        )
        .await
    }

    pub async fn login_response(&self, email: &str, password: &str) -> Response<Body> {
        self.post(
            "/api/auth/login",
            json!({ "email": email, "password": password }),
            Credential::None,
        )
        .await
    }

    /// Register and log in. Returns (access_token, refresh_token).
    pub async fn register_and_login(&self, name: &str, email: &str) -> (String, String) {
        self.register(name, email).await;
        self.login(email).await
    }

    /// Log in with the shared test password. Returns (access_token, refresh_token).
    pub async fn login(&self, email: &str) -> (String, String) {
        let response = self.login_response(email, PASSWORD).await;
        assert_eq!(response.status(), 200, "login failed for {}", email);
        let json = body_json(response).await;
        (
            json["access_token"].as_str().unwrap().to_string(),
            json["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    pub async fn user_id(&self, email: &str) -> String {
        self.db
            .users()
            .get_by_email(email)
            .await
            .unwrap()
            .expect("user exists")
            .id
    }
}

pub async fn body_json(response: Response<Body>) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

pub fn cookie_named<'a>(cookies: &'a [String], name: &str) -> Option<&'a String> {
    let prefix = format!("{}=", name);
    cookies.iter().find(|c| c.starts_with(&prefix))
}

pub fn is_cleared(cookies: &[String], name: &str) -> bool {
    cookie_named(cookies, name).is_some_and(|c| c.contains("Max-Age=0"))
}
