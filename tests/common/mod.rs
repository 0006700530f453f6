#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::json;
use sessiongate::{
    ServerConfig,
    api::ApiError,
    auth::{CookiePolicy, RefreshError, TokenPair, TokenRefresher},
    create_app,
};

pub const SECRET: &[u8] = b"test-jwt-secret-with-at-least-32-bytes";

/// Token refresher double that records every call.
pub struct StubRefresher {
    result: Result<TokenPair, ApiError>,
    calls: Mutex<Vec<String>>,
}

impl StubRefresher {
    pub fn succeeding(access_token: &str, refresh_token: &str) -> Arc<Self> {
        Arc::new(Self {
            result: Ok(TokenPair {
                access_token: access_token.to_string(),
                refresh_token: refresh_token.to_string(),
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ApiError) -> Arc<Self> {
        Arc::new(Self {
            result: Err(error),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TokenRefresher for StubRefresher {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        self.calls.lock().unwrap().push(refresh_token.to_string());
        self.result.clone().map_err(RefreshError::Rejected)
    }
}

pub fn create_test_app(refresher: Arc<StubRefresher>) -> Router {
    create_test_app_with_secret(SECRET, refresher)
}

pub fn create_test_app_with_secret(secret: &[u8], refresher: Arc<StubRefresher>) -> Router {
    let config = ServerConfig {
        jwt_secret: secret.to_vec(),
        refresher,
        cookies: CookiePolicy::default(),
    };
    create_app(&config)
}

fn now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64
}

pub fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Sign a session token expiring `exp_offset` seconds from now.
pub fn mint_token(id: &str, login: &str, roles: &[&str], exp_offset: i64) -> String {
    mint_token_with_secret(SECRET, id, login, roles, exp_offset)
}

pub fn mint_token_with_secret(
    secret: &[u8],
    id: &str,
    login: &str,
    roles: &[&str],
    exp_offset: i64,
) -> String {
    let claims = json!({
        "jti": id,
        "aud": ["user"],
        "exp": now() + exp_offset,
        "login": login,
        "roles": roles,
        "email": format!("{}@example.com", login),
    });
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret)).unwrap()
}

pub fn get_request(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub fn set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

/// Value of the named cookie in a Set-Cookie list, if any.
pub fn set_cookie_value(cookies: &[String], name: &str) -> Option<String> {
    cookies.iter().find_map(|cookie| {
        let (pair, _) = cookie.split_once(';')?;
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

pub fn is_cleared(cookies: &[String], name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", name)) && c.contains("Max-Age=-1"))
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
