#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use shopfront_server::{create_router, db, AppState, Config};

pub const ADMIN_EMAIL: &str = "ops@shopfront.test";
pub const ADMIN_PASSWORD: &str = "s3cret-pass";

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    path: PathBuf,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// `name=value` of the session cookie the response set, if any.
    pub fn session_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("shopfront_session="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub fn test_config(sqlite_path: &str) -> Config {
    Config {
        server_port: 0,
        sqlite_path: sqlite_path.to_string(),
        session_secret: "integration-test-secret-0123456789abcdef".to_string(),
        cors_origin: "http://localhost:3000".to_string(),
        secure_cookies: false,
        rate_limit: false,
        resend_api_key: None,
        from_email: "noreply@shopfront.test".to_string(),
        app_url: "http://localhost:3000".to_string(),
    }
}

pub fn spawn_app() -> TestApp {
    spawn_app_with(|_| {})
}

pub fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let path = std::env::temp_dir().join(format!("shopfront-test-{}.db", Uuid::new_v4()));
    let path_str = path.to_string_lossy().to_string();
    let pool = db::create_pool(&path_str).expect("create test pool");
    let mut config = test_config(&path_str);
    configure(&mut config);
    let state = AppState { db: pool, config };
    TestApp {
        router: create_router(state.clone()),
        state,
        path,
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut p = self.path.clone().into_os_string();
            p.push(suffix);
            let _ = std::fs::remove_file(p);
        }
    }
}

pub enum Auth<'a> {
    None,
    Bearer(&'a str),
    Cookie(&'a str),
}

impl TestApp {
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        auth: Auth<'_>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        match auth {
            Auth::None => {}
            Auth::Bearer(token) => {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            Auth::Cookie(cookie) => {
                builder = builder.header(header::COOKIE, cookie);
            }
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .expect("build request"),
            None => builder.body(Body::empty()).expect("build request"),
        };
        self.send(request).await
    }

    /// POST as if the connection came from `peer`, the way `main` serves the
    /// router with connect info.
    pub async fn post_from(&self, peer: SocketAddr, uri: &str, body: Value) -> TestResponse {
        let mut request = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("build request");
        request.extensions_mut().insert(ConnectInfo(peer));
        self.send(request).await
    }

    async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse { status, headers, body }
    }

    pub async fn get(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request(Method::GET, uri, None, auth).await
    }

    pub async fn post(&self, uri: &str, body: Value, auth: Auth<'_>) -> TestResponse {
        self.request(Method::POST, uri, Some(body), auth).await
    }

    pub async fn put(&self, uri: &str, body: Value, auth: Auth<'_>) -> TestResponse {
        self.request(Method::PUT, uri, Some(body), auth).await
    }

    pub async fn delete(&self, uri: &str, auth: Auth<'_>) -> TestResponse {
        self.request(Method::DELETE, uri, None, auth).await
    }

    /// Registers the default admin and returns a fresh bearer token.
    pub async fn admin_token(&self) -> String {
        let res = self
            .post(
                "/admin-auth/register",
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD, "name": "Ops" }),
                Auth::None,
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "register: {}", res.body);

        let res = self
            .post(
                "/admin-auth/login",
                json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }),
                Auth::None,
            )
            .await;
        assert_eq!(res.status, StatusCode::OK, "login: {}", res.body);
        res.body["token"].as_str().expect("token").to_string()
    }

    /// Signs up a customer and returns the `Cookie` header value.
    pub async fn customer_cookie(&self, email: &str) -> String {
        let res = self
            .post(
                "/auth/sign-up",
                json!({ "email": email, "password": "customer-pass", "full_name": "Ana Souza" }),
                Auth::None,
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "sign-up: {}", res.body);
        res.session_cookie().expect("session cookie")
    }

    pub async fn create_product(&self, token: &str, name: &str, category: &str, price: f64) -> i64 {
        let res = self
            .post(
                "/admin-products",
                json!({
                    "name": name,
                    "description": "Seminovo",
                    "original_price": price + 50.0,
                    "sale_price": price,
                    "condition": "Excelente",
                    "category": category,
                    "image": format!("{name}.png"),
                    "stock": 5
                }),
                Auth::Bearer(token),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "create product: {}", res.body);
        res.body["id"].as_i64().expect("product id")
    }

    pub fn execute(&self, sql: &str, params: impl rusqlite::Params) {
        let conn = self.state.db.get().expect("db connection");
        conn.execute(sql, params).expect("execute sql");
    }
}
